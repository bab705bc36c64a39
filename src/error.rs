//! Error taxonomy for VecturaKit.
//!
//! Validation errors short-circuit before any state mutation; embedder and
//! storage errors propagate to the caller as-is. See `facade.rs` for the
//! propagation policy around partial failures during batched operations.

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum VecturaError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("document not found: {id}")]
    DocumentNotFound { id: Uuid },

    #[error("failed to load {} document(s) from storage: {}", failures.len(), summarize(failures))]
    LoadFailed { failures: Vec<(String, String)> },

    #[error("embedding failed for {text:?}: {reason}")]
    EmbeddingFailed { text: String, reason: String },

    #[error("storage operation {operation} failed: {reason}")]
    StorageFailed { operation: String, reason: String },
}

fn summarize(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(id, reason)| format!("{id}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, VecturaError>;
