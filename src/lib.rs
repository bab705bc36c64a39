//! # vectura-kit — embedded hybrid vector + BM25 document retrieval
//!
//! `VecturaKit` keeps a document's text, its embedding, and a BM25 posting
//! entry together behind one lock-guarded facade, and fuses cosine
//! similarity with BM25 lexical scoring into a single ranked result list.
//! Embeddings and persistence are supplied by the caller through the
//! [`Embedder`] and [`StorageProvider`] traits; this crate owns the index,
//! the fusion math, and the memory-strategy tradeoff between keeping every
//! document resident and hydrating candidates on demand.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use vectura_kit::{VecturaConfig, VecturaKit, HashingEmbedder, JsonFileStorage, Embedder};
//! # async fn run() -> vectura_kit::Result<()> {
//! let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(384));
//! let storage = Arc::new(JsonFileStorage::new("./data".as_ref(), "notes").await?);
//! let kit = VecturaKit::new(VecturaConfig::new("notes"), embedder, storage).await?;
//!
//! kit.add_document("the quick brown fox", None).await?;
//! let hits = kit.search("quick fox", Some(5), None).await?;
//! # let _ = hits;
//! # Ok(())
//! # }
//! ```

// mimalloc's per-thread size-segregated free lists keep small-allocation
// churn (one `Vec<f32>` per document embedding, one `String` per document
// text) cheap under the facade's concurrent hydration and persistence
// paths. Declared at the crate root so it covers every allocation,
// including those made by rayon and tokio.
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod bm25;
mod config;
mod document;
mod embedder;
mod error;
mod facade;
mod memory_strategy;
mod search;
mod storage;
mod store;
mod tokenizer;
mod vectormath;

pub use config::{MemoryStrategy, SearchOptions, VecturaConfig};
pub use document::{Document, SearchResult};
pub use embedder::{Embedder, HashingEmbedder};
pub use error::{Result, VecturaError};
pub use facade::VecturaKit;
pub use storage::{IndexedStorageProvider, JsonFileStorage, StorageProvider};
