//! Document entity and the in-memory normalized-embedding cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored document: its id, source text, raw embedding, and creation time.
///
/// Documents are created by `add`, mutated only via delete-then-re-add
/// (`update`), and destroyed by `delete`/`reset` — there is no in-place
/// mutation of a live `Document`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub text: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: Uuid, text: String, embedding: Vec<f32>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            text,
            embedding,
            created_at,
        }
    }
}

/// A search hit: the fields a caller receives back, independent of the
/// internal `Document` representation (callers never see raw embeddings).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: Uuid,
    pub text: String,
    pub score: f32,
    pub created_at: DateTime<Utc>,
}
