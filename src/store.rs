//! The in-memory document store: id -> document, plus the derived
//! normalized-embedding cache kept beside it.
//!
//! Invariant: presence in the document map iff presence in the normalized
//! map. This type enforces that by construction — there is no public way to
//! insert into one without the other.

use std::collections::HashMap;

use uuid::Uuid;

use crate::document::Document;
use crate::vectormath::normalize_l2;

#[derive(Default)]
pub struct DocumentStore {
    documents: HashMap<Uuid, Document>,
    normalized: HashMap<Uuid, Vec<f32>>,
    insertion_seq: HashMap<Uuid, u64>,
    next_seq: u64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.documents.contains_key(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn normalized(&self, id: &Uuid) -> Option<&[f32]> {
        self.normalized.get(id).map(|v| v.as_slice())
    }

    pub fn insertion_seq(&self, id: &Uuid) -> u64 {
        self.insertion_seq.get(id).copied().unwrap_or(u64::MAX)
    }

    /// Inserts or replaces `document`, deriving and caching its normalized
    /// embedding in the same step. Assigns a fresh insertion sequence
    /// number unless `id` is already present, in which case its existing
    /// sequence is kept (a document replaced in place — which this crate
    /// never does via the public API, only via load — does not "jump the
    /// queue").
    pub fn insert(&mut self, document: Document) {
        let id = document.id;
        let normalized = normalize_l2(&document.embedding);
        if !self.insertion_seq.contains_key(&id) {
            self.insertion_seq.insert(id, self.next_seq);
            self.next_seq += 1;
        }
        self.normalized.insert(id, normalized);
        self.documents.insert(id, document);
    }

    /// Removes `id` from every structure this store owns. No-op if absent.
    pub fn remove(&mut self, id: &Uuid) -> Option<Document> {
        self.normalized.remove(id);
        self.insertion_seq.remove(id);
        self.documents.remove(id)
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.normalized.clear();
        self.insertion_seq.clear();
        self.next_seq = 0;
    }

    pub fn ids(&self) -> impl Iterator<Item = &Uuid> {
        self.documents.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &Document)> {
        self.documents.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(id: Uuid) -> Document {
        Document::new(id, "text".into(), vec![3.0, 4.0], Utc::now())
    }

    #[test]
    fn insert_populates_both_document_and_normalized_maps() {
        let mut store = DocumentStore::new();
        let id = Uuid::new_v4();
        store.insert(doc(id));
        assert!(store.contains(&id));
        assert!(store.normalized(&id).is_some());
    }

    #[test]
    fn normalized_embedding_has_unit_length() {
        let mut store = DocumentStore::new();
        let id = Uuid::new_v4();
        store.insert(doc(id));
        let n = store.normalized(&id).unwrap();
        let len: f32 = n.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((len - 1.0).abs() < 1e-5);
    }

    #[test]
    fn remove_clears_both_document_and_normalized_maps() {
        let mut store = DocumentStore::new();
        let id = Uuid::new_v4();
        store.insert(doc(id));
        store.remove(&id);
        assert!(!store.contains(&id));
        assert!(store.normalized(&id).is_none());
    }

    #[test]
    fn insertion_sequence_is_monotonic() {
        let mut store = DocumentStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.insert(doc(a));
        store.insert(doc(b));
        assert!(store.insertion_seq(&a) < store.insertion_seq(&b));
    }

    #[test]
    fn clear_empties_the_store() {
        let mut store = DocumentStore::new();
        store.insert(doc(Uuid::new_v4()));
        store.insert(doc(Uuid::new_v4()));
        store.clear();
        assert_eq!(store.len(), 0);
    }
}
