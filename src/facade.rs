//! The public `VecturaKit` facade: the single owner of in-memory state,
//! wiring the document store, BM25 index, memory-strategy resolution, and
//! the embedder/storage collaborators into the public add/search/update/
//! delete/reset operations.
//!
//! Grounded on `Abkve`/`AbkveInner`'s outer-handle split — an outer handle
//! cheaply `Clone`-able via `Arc`, wrapping a lock-guarded inner struct that
//! owns every mutable field. Generalized from a `parking_lot::RwLock`
//! guarding a flat float buffer to a `tokio::sync::Mutex` guarding the
//! document store and BM25 index together, because a public operation here
//! holds exclusive access for its *entire* duration, including any I/O
//! suspension — not just the synchronous parts. That is exactly what an
//! async mutex held across `.await` gives us; a sync lock (`vector_kb`'s
//! choice too) would force dropping the guard before I/O and re-deriving
//! consistency afterward, which is a different, weaker guarantee than the
//! one this crate promises.

use std::sync::Arc;

use chrono::Utc;
use rayon::prelude::*;
use tokio::sync::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::bm25::Bm25Index;
use crate::config::VecturaConfig;
use crate::document::{Document, SearchResult};
use crate::embedder::Embedder;
use crate::error::{Result, VecturaError};
use crate::memory_strategy::{self, EffectiveMode};
use crate::search::{self, FusionParams, Scored};
use crate::storage::{IndexedStorageProvider, StorageProvider};
use crate::store::DocumentStore;
use crate::tokenizer::tokenize;
use crate::vectormath::{cosine, normalize_l2};

/// Default bound on concurrent persistence writes when the active memory
/// strategy is `FullMemory` and so carries no `max_concurrent_batches` of
/// its own. Indexed mode always uses its own configured value instead.
const DEFAULT_WRITE_CONCURRENCY: usize = 4;

/// Upper bound on a single document's text, in bytes, to guard against
/// pathological memory use from an unbounded caller-supplied string.
const MAX_DOCUMENT_TEXT_BYTES: usize = 1024 * 1024;

/// A document's text must contain something other than whitespace or
/// control characters once trimmed — a string of only `\n`/`\t`/`\0`-style
/// bytes carries no content to embed or tokenize.
fn is_blank(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || c.is_control())
}

struct Inner {
    store: DocumentStore,
    bm25: Bm25Index,
}

/// An embedded hybrid vector + BM25 document database.
///
/// Cloning a `VecturaKit` is cheap and shares the same underlying state —
/// every clone serializes through the same lock, so two handles behave as
/// one logical instance, not two independent copies.
#[derive(Clone)]
pub struct VecturaKit {
    inner: Arc<Mutex<Inner>>,
    embedder: Arc<dyn Embedder>,
    storage: Arc<dyn StorageProvider>,
    indexed_storage: Option<Arc<dyn IndexedStorageProvider>>,
    config: VecturaConfig,
    dimension: usize,
}

impl VecturaKit {
    /// Opens or creates an instance backed by `storage`, which does not
    /// support indexed candidate generation. `MemoryStrategy::Indexed` (or
    /// `Automatic` above its threshold) silently degrades to full-memory
    /// behavior for this instance — see `memory_strategy::resolve`.
    pub async fn new<S>(config: VecturaConfig, embedder: Arc<dyn Embedder>, storage: Arc<S>) -> Result<Self>
    where
        S: StorageProvider + 'static,
    {
        Self::construct(config, embedder, storage, None).await
    }

    /// Opens or creates an instance backed by a storage provider that also
    /// implements `IndexedStorageProvider`, enabling the indexed path.
    pub async fn with_indexed_storage<S>(
        config: VecturaConfig,
        embedder: Arc<dyn Embedder>,
        storage: Arc<S>,
    ) -> Result<Self>
    where
        S: IndexedStorageProvider + 'static,
    {
        let indexed: Arc<dyn IndexedStorageProvider> = Arc::clone(&storage);
        let basic: Arc<dyn StorageProvider> = storage;
        Self::construct(config, embedder, basic, Some(indexed)).await
    }

    async fn construct(
        config: VecturaConfig,
        embedder: Arc<dyn Embedder>,
        storage: Arc<dyn StorageProvider>,
        indexed_storage: Option<Arc<dyn IndexedStorageProvider>>,
    ) -> Result<Self> {
        config.validate()?;

        let dimension = config.dimension.unwrap_or_else(|| embedder.dimension());

        let mut store = DocumentStore::new();
        let mut bm25 = Bm25Index::new(config.search.bm25_params());

        let ids = storage.list_ids().await?;
        let mode = memory_strategy::resolve(&config.memory_strategy, ids.len(), indexed_storage.is_some());

        info!(name = %config.name, documents = ids.len(), mode = ?mode, "opening database");

        let mut failures = Vec::new();
        for id in &ids {
            match storage.load(*id).await {
                Ok(doc) => {
                    bm25.index(doc.id, &doc.text);
                    // Full-memory mode keeps the document (and its
                    // normalized embedding) resident from the start.
                    // Indexed mode materializes the BM25 statistics
                    // eagerly (so IDF and avgdl reflect the whole
                    // corpus, not whatever happens to be hydrated at
                    // query time) but defers the embedding itself —
                    // the thing that actually dominates memory — to
                    // first use.
                    if matches!(mode, EffectiveMode::FullMemory) {
                        store.insert(doc);
                    }
                }
                Err(e) => failures.push((id.to_string(), e.to_string())),
            }
        }

        if !failures.is_empty() {
            return Err(VecturaError::LoadFailed { failures });
        }

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { store, bm25 })),
            embedder,
            storage,
            indexed_storage,
            config,
            dimension,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of live documents, counting every document known to storage —
    /// including ones the indexed path hasn't hydrated into memory yet.
    pub async fn document_count(&self) -> usize {
        self.inner.lock().await.bm25.len()
    }

    /// Embeds and persists a single document, returning its id (a fresh
    /// `Uuid` if `id` is `None`).
    pub async fn add_document(&self, text: impl Into<String>, id: Option<Uuid>) -> Result<Uuid> {
        let ids = self.add_documents(vec![text.into()], id.map(|i| vec![i])).await?;
        Ok(ids[0])
    }

    /// Embeds and persists `texts` as new documents. `ids`, if provided,
    /// must have the same length as `texts`; omitted ids are generated.
    ///
    /// Persistence happens concurrently, bounded by the active memory
    /// strategy's concurrency knobs (or a small default under
    /// `FullMemory`). On the first persistence failure, the first error is
    /// returned and the in-memory state is left mutated only for the
    /// documents whose persistence succeeded — this is a best-effort
    /// operation, not an all-or-nothing transaction.
    pub async fn add_documents(&self, texts: Vec<String>, ids: Option<Vec<Uuid>>) -> Result<Vec<Uuid>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(ids) = &ids {
            if ids.len() != texts.len() {
                return Err(VecturaError::InvalidInput {
                    reason: format!(
                        "ids length ({}) does not match texts length ({})",
                        ids.len(),
                        texts.len()
                    ),
                });
            }
        }

        for text in &texts {
            if is_blank(text) {
                return Err(VecturaError::InvalidInput {
                    reason: "document text must not be empty".into(),
                });
            }
            if text.len() > MAX_DOCUMENT_TEXT_BYTES {
                return Err(VecturaError::InvalidInput {
                    reason: format!(
                        "document text of {} bytes exceeds the {} byte limit",
                        text.len(),
                        MAX_DOCUMENT_TEXT_BYTES
                    ),
                });
            }
        }

        let ids = ids.unwrap_or_else(|| texts.iter().map(|_| Uuid::new_v4()).collect());

        let embeddings = self.embedder.embed_many(&texts).await?;
        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(VecturaError::DimensionMismatch {
                    expected: self.dimension,
                    got: embedding.len(),
                });
            }
        }

        let documents: Vec<Document> = ids
            .into_iter()
            .zip(texts)
            .zip(embeddings)
            .map(|((id, text), embedding)| Document::new(id, text, embedding, Utc::now()))
            .collect();

        let mut inner = self.inner.lock().await;

        let max_concurrent = match memory_strategy::resolve(&self.config.memory_strategy, inner.bm25.len(), self.indexed_storage.is_some()) {
            EffectiveMode::Indexed { max_concurrent_batches, .. } => max_concurrent_batches,
            EffectiveMode::FullMemory => DEFAULT_WRITE_CONCURRENCY,
        };

        let (persisted, first_error) = persist_concurrently(Arc::clone(&self.storage), documents, max_concurrent).await;

        let mut persisted_ids = Vec::with_capacity(persisted.len());
        for document in persisted {
            persisted_ids.push(document.id);
            inner.bm25.index(document.id, &document.text);
            inner.store.insert(document);
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        Ok(persisted_ids)
    }

    /// Replaces `id`'s text and embedding. Implemented as delete-then-add:
    /// if `id` doesn't currently exist, this still succeeds — it behaves as
    /// a plain insert under that id.
    pub async fn update_document(&self, id: Uuid, new_text: impl Into<String>) -> Result<()> {
        self.delete_documents(vec![id]).await?;
        self.add_documents(vec![new_text.into()], Some(vec![id])).await?;
        Ok(())
    }

    /// Removes `ids` from the in-memory state unconditionally, then
    /// attempts to delete each from storage. Storage failures are
    /// aggregated into a single `StorageFailed` error; in-memory removal is
    /// never rolled back on such a failure — an id that fails to delete
    /// from storage is, from this instance's point of view, already gone.
    pub async fn delete_documents(&self, ids: Vec<Uuid>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.lock().await;
        for id in &ids {
            inner.store.remove(id);
            inner.bm25.remove(*id);
        }

        let mut failures = Vec::new();
        for id in ids {
            if let Err(e) = self.storage.delete(id).await {
                failures.push(format!("{id}: {e}"));
            }
        }

        if !failures.is_empty() {
            return Err(VecturaError::StorageFailed {
                operation: "delete_documents".into(),
                reason: failures.join("; "),
            });
        }
        Ok(())
    }

    /// Clears all in-memory state and deletes every persisted document.
    /// Idempotent: resetting an already-empty instance succeeds trivially.
    pub async fn reset(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.store.clear();
        inner.bm25 = Bm25Index::new(self.config.search.bm25_params());
        self.storage.delete_all().await
    }

    /// Hybrid search: embeds `query`, tokenizes it for BM25, and fuses both
    /// signals per the configured `hybrid_weight`.
    pub async fn search(&self, query: &str, num_results: Option<usize>, threshold: Option<f32>) -> Result<Vec<SearchResult>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(VecturaError::InvalidInput {
                reason: "search query must not be empty".into(),
            });
        }

        let query_tokens = tokenize(trimmed);
        let query_vec = self.embedder.embed(trimmed).await?;
        self.run_search(query_vec, Some(query_tokens), num_results, threshold).await
    }

    /// Vector-only search: no BM25 signal, so the fused score collapses to
    /// pure cosine similarity.
    pub async fn search_by_vector(&self, vector: Vec<f32>, num_results: Option<usize>, threshold: Option<f32>) -> Result<Vec<SearchResult>> {
        if vector.len() != self.dimension {
            return Err(VecturaError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        self.run_search(vector, None, num_results, threshold).await
    }

    async fn run_search(
        &self,
        query_vec: Vec<f32>,
        query_tokens: Option<Vec<String>>,
        num_results: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchResult>> {
        let num_results = num_results.unwrap_or(self.config.search.default_num_results);
        if num_results == 0 {
            return Err(VecturaError::InvalidInput {
                reason: "num_results must be greater than zero".into(),
            });
        }

        let threshold = threshold.or(self.config.search.min_threshold);
        if let Some(t) = threshold {
            if !(-1.0..=1.0).contains(&t) {
                return Err(VecturaError::InvalidInput {
                    reason: format!("threshold must be within [-1, 1], got {t}"),
                });
            }
        }

        let query_norm = normalize_l2(&query_vec);
        let params = FusionParams {
            hybrid_weight: self.config.search.hybrid_weight(),
            bm25_normalization_factor: self.config.search.bm25_normalization_factor,
        };

        let mut inner = self.inner.lock().await;

        let mode = memory_strategy::resolve(&self.config.memory_strategy, inner.bm25.len(), self.indexed_storage.is_some());

        let scored = match mode {
            EffectiveMode::FullMemory => {
                let candidates: Vec<Uuid> = inner.store.ids().copied().collect();
                score_candidates(&inner, &candidates, &query_norm, query_tokens.as_deref(), &params)
            }
            EffectiveMode::Indexed {
                candidate_multiplier,
                batch_size,
                max_concurrent_batches,
            } => {
                let indexed_storage = self
                    .indexed_storage
                    .clone()
                    .expect("resolve() only returns Indexed when indexed_storage is Some");

                let candidate_ids = memory_strategy::candidate_ids(
                    indexed_storage.as_ref(),
                    &query_norm,
                    num_results,
                    candidate_multiplier,
                )
                .await?;

                let missing: Vec<Uuid> = candidate_ids
                    .iter()
                    .filter(|id| inner.store.normalized(id).is_none())
                    .copied()
                    .collect();

                let hydrated = memory_strategy::hydrate_missing(
                    Arc::clone(&self.storage),
                    &missing,
                    batch_size,
                    max_concurrent_batches,
                )
                .await;

                for document in hydrated {
                    if !inner.bm25.contains(&document.id) {
                        inner.bm25.index(document.id, &document.text);
                    }
                    inner.store.insert(document);
                }

                // Only candidates that actually made it into memory are
                // scored — a candidate whose hydration failed is dropped
                // from this search's results rather than erroring it out.
                let hydrated_candidates: Vec<Uuid> = candidate_ids
                    .into_iter()
                    .filter(|id| inner.store.normalized(id).is_some())
                    .collect();

                score_candidates(&inner, &hydrated_candidates, &query_norm, query_tokens.as_deref(), &params)
            }
        };

        Ok(search::rank(scored, threshold, num_results))
    }
}

/// Scores every id in `candidates` against `query_norm` (and, if present,
/// `query_tokens` for the BM25 side) in parallel via rayon — mirroring
/// `search_parallel`'s fan-out, generalized from a single cosine pass to
/// the hybrid fusion.
fn score_candidates(
    inner: &Inner,
    candidates: &[Uuid],
    query_norm: &[f32],
    query_tokens: Option<&[String]>,
    params: &FusionParams,
) -> Vec<Scored> {
    candidates
        .par_iter()
        .filter_map(|id| {
            let document = inner.store.get(id)?;
            let normalized = inner.store.normalized(id)?;
            let cos = cosine(query_norm, normalized);
            let bm25_raw = query_tokens.map(|tokens| inner.bm25.score(tokens, id));
            Some(Scored {
                id: *id,
                text: document.text.clone(),
                created_at: document.created_at,
                score: search::fuse(cos, bm25_raw, params),
                insertion_seq: inner.store.insertion_seq(id),
            })
        })
        .collect()
}

/// Persists `documents` concurrently, bounded by `max_concurrent` in-flight
/// writes. Returns the subset that succeeded (in their original relative
/// order) and, if any write failed, the first error encountered.
async fn persist_concurrently(
    storage: Arc<dyn StorageProvider>,
    documents: Vec<Document>,
    max_concurrent: usize,
) -> (Vec<Document>, Option<VecturaError>) {
    let total = documents.len();
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for (index, document) in documents.into_iter().enumerate() {
        let storage = Arc::clone(&storage);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
            let result = storage.store(&document).await;
            (index, document, result)
        });
    }

    let mut slots: Vec<Option<Document>> = (0..total).map(|_| None).collect();
    let mut first_error = None;

    while let Some(outcome) = tasks.join_next().await {
        match outcome {
            Ok((index, document, Ok(()))) => slots[index] = Some(document),
            Ok((_, document, Err(e))) => {
                warn!(document_id = %document.id, error = %e, "failed to persist document");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(join_error) => {
                warn!(error = %join_error, "persistence task panicked");
            }
        }
    }

    (slots.into_iter().flatten().collect(), first_error)
}
