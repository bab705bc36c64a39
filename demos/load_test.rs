//! ```bash
//! cargo run --release --bin vectura-demo
//! ```
//!
//! Generates a synthetic corpus, times bulk insertion and hybrid search
//! through the public `VecturaKit` API, then closes and reopens the
//! instance against the same on-disk directory to verify that a fresh
//! facade recovers the full corpus from storage alone.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rand::{rngs::StdRng, Rng, SeedableRng};
use vectura_kit::{Embedder, HashingEmbedder, JsonFileStorage, VecturaConfig, VecturaKit};

/// Embedding width used for the demo's `HashingEmbedder`.
const DIM: usize = 256;
/// Number of synthetic documents to insert.
const N_DOCS: usize = 5_000;
/// Number of search queries to run for the timing summary.
const N_QUERIES: usize = 100;
/// Deterministic seed for reproducibility.
const SEED: u64 = 42;

const VOCAB: &[&str] = &[
    "rust", "vector", "search", "database", "embedding", "hybrid", "bm25", "cosine",
    "similarity", "document", "retrieval", "index", "query", "storage", "async", "tokio",
    "concurrency", "memory", "semantic", "lexical", "token", "ranking", "threshold", "cache",
    "persistence", "relevance", "corpus", "normalization", "score", "candidate",
];

fn random_sentence(rng: &mut StdRng, words: usize) -> String {
    (0..words)
        .map(|_| VOCAB[rng.gen_range(0..VOCAB.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn divider() {
    println!("{}", "-".repeat(60));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("==============================================================");
    println!("          vectura-kit load test & persistence verifier");
    println!("==============================================================");
    println!();

    let data_dir = PathBuf::from("/tmp/vectura_load_test");
    let _ = std::fs::remove_dir_all(&data_dir);

    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(DIM));

    // Phase 1: corpus generation.
    divider();
    println!("Phase 1 - Generating synthetic corpus");
    println!("  Documents: {N_DOCS}");
    println!("  Embedding dimension: {DIM}");

    let t0 = Instant::now();
    let mut rng = StdRng::seed_from_u64(SEED);
    let documents: Vec<String> = (0..N_DOCS).map(|_| random_sentence(&mut rng, 8)).collect();
    println!("  Generated in {:?}", t0.elapsed());

    // Phase 2: bulk insertion.
    divider();
    println!("Phase 2 - Inserting into VecturaKit");

    let storage = Arc::new(JsonFileStorage::new(&data_dir, "demo").await?);
    let config = VecturaConfig::new("demo").with_dimension(DIM);
    let kit = VecturaKit::new(config, Arc::clone(&embedder), storage).await?;

    let t0 = Instant::now();
    kit.add_documents(documents.clone(), None).await?;
    let insert_duration = t0.elapsed();
    println!("  Inserted {N_DOCS} documents in {insert_duration:?}");
    println!(
        "  Throughput: {:.0} docs/sec",
        N_DOCS as f64 / insert_duration.as_secs_f64()
    );

    // Phase 3: hybrid search timing.
    divider();
    println!("Phase 3 - Running {N_QUERIES} hybrid searches");

    let mut query_rng = StdRng::seed_from_u64(SEED + 1);
    let queries: Vec<String> = (0..N_QUERIES)
        .map(|_| random_sentence(&mut query_rng, 3))
        .collect();

    let t0 = Instant::now();
    let mut hits = 0usize;
    for query in &queries {
        let results = kit.search(query, Some(5), None).await?;
        if !results.is_empty() {
            hits += 1;
        }
    }
    let search_duration = t0.elapsed();
    println!("  Completed in {search_duration:?}");
    println!(
        "  Average per query: {:.2} us",
        search_duration.as_micros() as f64 / N_QUERIES as f64
    );
    println!("  Queries with at least one hit: {hits}/{N_QUERIES}");

    // Phase 4: close and reopen against the same directory.
    divider();
    println!("Phase 4 - Reopening from disk");

    let count_before = kit.document_count().await;
    drop(kit);

    let t0 = Instant::now();
    let storage = Arc::new(JsonFileStorage::new(&data_dir, "demo").await?);
    let config = VecturaConfig::new("demo").with_dimension(DIM);
    let reopened = VecturaKit::new(config, embedder, storage).await?;
    let reopen_duration = t0.elapsed();

    let count_after = reopened.document_count().await;
    println!("  Reopened in {reopen_duration:?}");
    println!("  Document count before close: {count_before}");
    println!("  Document count after reopen: {count_after}");

    divider();
    if count_before == count_after {
        println!("Persistence round-trip: PASSED");
    } else {
        println!("Persistence round-trip: FAILED");
    }

    let _ = std::fs::remove_dir_all(&data_dir);

    Ok(())
}
