//! Resolves `MemoryStrategy` into an effective mode at each operation
//! boundary, and performs the indexed path's bounded-concurrency candidate
//! hydration.
//!
//! Grounded on the pack's layered cache/index/storage dispatch idiom (e.g.
//! `search_provider.rs`'s `LayerSearchStats` three-tier model, collapsed
//! here to two tiers) and on `vector_kb`'s comment discipline around not
//! holding a sync lock across an `.await` — the hydration loop below never
//! holds the facade's lock while waiting on storage I/O.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;
use uuid::Uuid;

use crate::config::MemoryStrategy;
use crate::document::Document;
use crate::storage::{IndexedStorageProvider, StorageProvider};

/// The mode actually in effect for a given operation, after resolving
/// `MemoryStrategy::Automatic`'s threshold and any silent degrade when the
/// storage provider doesn't implement `IndexedStorageProvider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveMode {
    FullMemory,
    Indexed {
        candidate_multiplier: usize,
        batch_size: usize,
        max_concurrent_batches: usize,
    },
}

/// Resolves `strategy` given the current live document count and whether
/// the storage provider backing this instance supports indexed candidate
/// generation. Automatic mode is evaluated fresh on every call — cheap,
/// and keeps behavior consistent whether a caller is crossing the
/// threshold upward or downward.
pub fn resolve(strategy: &MemoryStrategy, live_count: usize, storage_is_indexed: bool) -> EffectiveMode {
    let requested = match strategy {
        MemoryStrategy::FullMemory => EffectiveMode::FullMemory,
        MemoryStrategy::Indexed {
            candidate_multiplier,
            batch_size,
            max_concurrent_batches,
        } => EffectiveMode::Indexed {
            candidate_multiplier: *candidate_multiplier,
            batch_size: *batch_size,
            max_concurrent_batches: *max_concurrent_batches,
        },
        MemoryStrategy::Automatic {
            threshold,
            candidate_multiplier,
            batch_size,
            max_concurrent_batches,
        } => {
            if live_count <= *threshold {
                EffectiveMode::FullMemory
            } else {
                EffectiveMode::Indexed {
                    candidate_multiplier: *candidate_multiplier,
                    batch_size: *batch_size,
                    max_concurrent_batches: *max_concurrent_batches,
                }
            }
        }
    };

    match requested {
        EffectiveMode::Indexed { .. } if !storage_is_indexed => EffectiveMode::FullMemory,
        other => other,
    }
}

/// Asks `storage` for up to `candidate_multiplier * k` candidate ids for
/// `query_vec`.
pub async fn candidate_ids<S: IndexedStorageProvider + ?Sized>(
    storage: &S,
    query_vec: &[f32],
    k: usize,
    candidate_multiplier: usize,
) -> crate::error::Result<Vec<Uuid>> {
    storage
        .candidate_ids(query_vec, k.saturating_mul(candidate_multiplier))
        .await
}

/// Loads every id in `missing` (the caller is responsible for filtering out
/// ids already hydrated — this keeps the hydration future free of any
/// borrow on the caller's document store across its `.await` points), in
/// batches of `batch_size`, with at most `max_concurrent_batches` batches
/// in flight at once. A load failure for one candidate drops that
/// candidate silently (logged, never surfaced) rather than failing the
/// whole search.
pub async fn hydrate_missing(
    storage: Arc<dyn StorageProvider>,
    missing: &[Uuid],
    batch_size: usize,
    max_concurrent_batches: usize,
) -> Vec<Document> {
    if missing.is_empty() {
        return Vec::new();
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrent_batches.max(1)));
    let mut batches = JoinSet::new();

    for chunk in missing.chunks(batch_size.max(1)) {
        let chunk = chunk.to_vec();
        let storage = Arc::clone(&storage);
        let semaphore = Arc::clone(&semaphore);
        batches.spawn(async move {
            // Acquiring the permit before doing any I/O bounds the number
            // of batches in flight rather than the number of individual
            // loads — `max_concurrent_batches` bounds batches, not loads.
            let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
            let mut hydrated = Vec::with_capacity(chunk.len());
            for id in chunk {
                match storage.load(id).await {
                    Ok(doc) => hydrated.push(doc),
                    Err(e) => warn!(document_id = %id, error = %e, "candidate hydration failed, dropping from results"),
                }
            }
            hydrated
        });
    }

    let mut out = Vec::new();
    while let Some(result) = batches.join_next().await {
        match result {
            Ok(docs) => out.extend(docs),
            Err(e) => warn!(error = %e, "hydration batch task panicked"),
        }
    }
    out
}
