//! BM25 lexical index: postings, doc-length table, IDF, scoring.
//!
//! Grounded on `velesdb-core::Bm25Index` (inverted index + doc-length
//! bookkeeping, Lucene-style smooth IDF, the BM25 term-score formula), with
//! the Roaring-bitmap posting-list optimization dropped — this crate's
//! document ids are 128-bit `Uuid`s rather than the `u32`s that
//! optimization requires, and nothing here calls for the extra dependency.

use std::collections::HashMap;
use uuid::Uuid;

use crate::tokenizer::tokenize;

#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    /// Term frequency saturation parameter.
    pub k1: f32,
    /// Document length normalization parameter.
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Inverted index over document text, scored with BM25.
///
/// All operations here run synchronously relative to the owning facade —
/// this type holds no lock of its own and is never shared across threads
/// directly; `facade.rs` is the single owner.
#[derive(Default)]
pub struct Bm25Index {
    params: Bm25Params,
    /// term -> (doc_id -> term frequency in that document)
    postings: HashMap<String, HashMap<Uuid, u32>>,
    doc_lengths: HashMap<Uuid, u32>,
    avg_doc_length: f32,
}

impl Bm25Index {
    pub fn new(params: Bm25Params) -> Self {
        Self {
            params,
            postings: HashMap::new(),
            doc_lengths: HashMap::new(),
            avg_doc_length: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    pub fn contains(&self, doc_id: &Uuid) -> bool {
        self.doc_lengths.contains_key(doc_id)
    }

    /// Tokenizes `text` and indexes it under `doc_id`. Re-indexing an id
    /// that is already present first removes its prior postings — callers
    /// that want update semantics should call `remove` then `index`
    /// explicitly (this mirrors the facade's delete-then-add update path),
    /// but this method is defensive against being called twice for the
    /// same id.
    pub fn index(&mut self, doc_id: Uuid, text: &str) {
        if self.doc_lengths.contains_key(&doc_id) {
            self.remove(doc_id);
        }

        let tokens = tokenize(text);
        let doc_length = tokens.len() as u32;

        let mut term_freqs: HashMap<String, u32> = HashMap::new();
        for token in tokens {
            *term_freqs.entry(token).or_insert(0) += 1;
        }

        for (term, freq) in term_freqs {
            self.postings.entry(term).or_default().insert(doc_id, freq);
        }

        self.doc_lengths.insert(doc_id, doc_length);
        self.recompute_avg_doc_length();
    }

    /// Removes all postings and length data for `doc_id`. No-op if absent.
    pub fn remove(&mut self, doc_id: Uuid) {
        if self.doc_lengths.remove(&doc_id).is_none() {
            return;
        }

        self.postings.retain(|_, docs| {
            docs.remove(&doc_id);
            !docs.is_empty()
        });

        self.recompute_avg_doc_length();
    }

    fn recompute_avg_doc_length(&mut self) {
        if self.doc_lengths.is_empty() {
            self.avg_doc_length = 0.0;
            return;
        }
        let total: u64 = self.doc_lengths.values().map(|&l| l as u64).sum();
        self.avg_doc_length = total as f32 / self.doc_lengths.len() as f32;
    }

    /// Lucene-style smooth IDF: `ln(1 + (N - n(t) + 0.5) / (n(t) + 0.5))`.
    /// Always non-negative.
    fn idf(&self, term: &str) -> f32 {
        let n = self.doc_lengths.len() as f32;
        let n_t = self.postings.get(term).map_or(0, |docs| docs.len()) as f32;
        (1.0 + (n - n_t + 0.5) / (n_t + 0.5)).ln().max(0.0)
    }

    /// BM25 score of `doc_id` against `query_tokens`. Terms not present in
    /// the document contribute zero, so this is dominated by a hash lookup
    /// per query term for the common no-overlap case.
    pub fn score(&self, query_tokens: &[String], doc_id: &Uuid) -> f32 {
        let Some(&doc_len) = self.doc_lengths.get(doc_id) else {
            return 0.0;
        };
        let avg_len = if self.avg_doc_length > 0.0 {
            self.avg_doc_length
        } else {
            1.0
        };
        let len_norm = 1.0 - self.params.b + self.params.b * (doc_len as f32) / avg_len;

        let mut seen = std::collections::HashSet::new();
        let mut score = 0.0f32;
        for term in query_tokens {
            if !seen.insert(term.as_str()) {
                continue;
            }
            let freq = self
                .postings
                .get(term)
                .and_then(|docs| docs.get(doc_id))
                .copied()
                .unwrap_or(0) as f32;
            if freq == 0.0 {
                continue;
            }
            let idf = self.idf(term);
            score += idf * (freq * (self.params.k1 + 1.0))
                / (freq + self.params.k1 * len_norm);
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn indexing_then_removing_restores_empty_state() {
        let mut idx = Bm25Index::new(Bm25Params::default());
        let id = uuid(1);
        idx.index(id, "vector search engine");
        assert_eq!(idx.len(), 1);
        idx.remove(id);
        assert_eq!(idx.len(), 0);
        assert!(idx.is_empty());
    }

    #[test]
    fn score_is_zero_when_no_terms_overlap() {
        let mut idx = Bm25Index::new(Bm25Params::default());
        let id = uuid(1);
        idx.index(id, "apples and oranges");
        let query = tokenize("vector search");
        assert_eq!(idx.score(&query, &id), 0.0);
    }

    #[test]
    fn repeating_a_matching_term_never_decreases_score() {
        let mut idx = Bm25Index::new(Bm25Params::default());
        let a = uuid(1);
        let b = uuid(2);
        idx.index(a, "vector vector vector search engine");
        idx.index(b, "vector search engine");

        let query = tokenize("vector");
        let score_a = idx.score(&query, &a);
        let score_b = idx.score(&query, &b);
        assert!(score_a >= score_b);
    }

    #[test]
    fn idf_is_non_negative_for_common_terms() {
        let mut idx = Bm25Index::new(Bm25Params::default());
        for n in 0..10u128 {
            idx.index(uuid(n), "the common word appears everywhere");
        }
        let query = tokenize("common");
        for n in 0..10u128 {
            assert!(idx.score(&query, &uuid(n)) >= 0.0);
        }
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let mut idx = Bm25Index::new(Bm25Params::default());
        idx.remove(uuid(999));
        assert!(idx.is_empty());
    }

    #[test]
    fn reindexing_same_id_replaces_previous_postings() {
        let mut idx = Bm25Index::new(Bm25Params::default());
        let id = uuid(1);
        idx.index(id, "apples");
        idx.index(id, "oranges");
        assert_eq!(idx.len(), 1);
        let apple_query = tokenize("apples");
        assert_eq!(idx.score(&apple_query, &id), 0.0);
        let orange_query = tokenize("oranges");
        assert!(idx.score(&orange_query, &id) > 0.0);
    }
}
