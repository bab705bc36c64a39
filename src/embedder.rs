//! The embedder capability (text -> vector): an external collaborator, not
//! part of this crate's core. This module only defines the trait boundary
//! the facade consumes, plus a single deterministic reference implementation
//! used by tests and the demo binary.

use async_trait::async_trait;

use crate::error::Result;

/// Opaque text-embedding capability. Implementations may call out to a
/// local model, a remote API, or (as here) a cheap deterministic stand-in.
/// The facade treats calls into it as unsynchronized unless the
/// implementation documents its own concurrency.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Dimensionality of vectors this embedder produces. Queried once at
    /// facade construction to freeze `D` if not declared in config.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Batch variant. The default implementation just calls `embed` in a
    /// loop; implementations backed by a batching-capable model should
    /// override this for throughput.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// A deterministic, dependency-free reference `Embedder`: hashes each
/// token into a fixed-width accumulator and L2-normalizes the result.
///
/// Grounded on `vector_kb::StubEmbedder` — "not as strong as transformer
/// embeddings, but enables fully offline semantic-ish recall without
/// pulling in heavy model runtimes." Used by this crate's tests and demo
/// binary; production callers should supply a real model.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dim];
        let lower = text.to_ascii_lowercase();
        for token in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = fnv1a32(token.as_bytes());
            let idx = (h as usize) % self.dim;
            v[idx] += 1.0;
        }
        Ok(v)
    }
}

/// FNV-1a 32-bit hash — small, stable, and dependency-free.
fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut h: u32 = 2166136261;
    for &b in bytes {
        h ^= b as u32;
        h = h.wrapping_mul(16777619);
    }
    h
}
