//! Score fusion, thresholding, and ranking — the shared tail end of every
//! search, whether the candidates came from the full-memory scan or the
//! indexed path's hydration.
//!
//! Grounded on `hybrid_search.rs`'s `SimilarityMetric`/`BM25Scorer` fusion
//! shape: cosine and BM25 are blended by `hybrid_weight`, with vector-only
//! queries collapsing to pure cosine rather than attenuating it against a
//! meaningless zero BM25 term.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::document::SearchResult;

#[derive(Debug, Clone, Copy)]
pub struct FusionParams {
    pub hybrid_weight: f32,
    pub bm25_normalization_factor: f32,
}

/// Fuses a cosine score with an optional raw BM25 score. `None` means the
/// query carried no text (a raw vector query) — score collapses to pure
/// cosine, never attenuated by the hybrid weight.
pub fn fuse(cos: f32, bm25_raw: Option<f32>, params: &FusionParams) -> f32 {
    let cos = cos.clamp(-1.0, 1.0);
    match bm25_raw {
        None => cos,
        Some(raw) => {
            let bm25_norm = (raw / params.bm25_normalization_factor).clamp(0.0, 1.0);
            params.hybrid_weight * cos + (1.0 - params.hybrid_weight) * bm25_norm
        }
    }
}

/// A candidate with its fused score, ready for thresholding and ranking.
/// `insertion_seq` is the document's position in its store's insertion
/// order — independent of the order candidates were scored in (the
/// indexed path's concurrent hydration does not preserve scan order), it
/// is what lets tie-breaking be deterministic regardless of scoring order.
pub struct Scored {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub score: f32,
    pub insertion_seq: u64,
}

/// Applies the threshold filter, then a stable sort descending by score
/// (ties broken by insertion order, then lexicographically by id), then
/// truncates to `num_results`. Threshold is applied *before* truncation, so
/// a low-recall corpus can legitimately return fewer than `num_results`
/// rows.
pub fn rank(mut scored: Vec<Scored>, threshold: Option<f32>, num_results: usize) -> Vec<SearchResult> {
    if let Some(t) = threshold {
        scored.retain(|s| s.score >= t);
    }

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.insertion_seq.cmp(&b.insertion_seq))
            .then_with(|| a.id.cmp(&b.id))
    });

    scored.truncate(num_results);

    scored
        .into_iter()
        .map(|s| SearchResult {
            id: s.id,
            text: s.text,
            score: s.score,
            created_at: s.created_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: u128, score: f32, seq: u64) -> Scored {
        Scored {
            id: Uuid::from_u128(id),
            text: format!("doc-{id}"),
            created_at: Utc::now(),
            score,
            insertion_seq: seq,
        }
    }

    #[test]
    fn vector_only_query_collapses_to_pure_cosine() {
        let params = FusionParams {
            hybrid_weight: 0.5,
            bm25_normalization_factor: 10.0,
        };
        assert_eq!(fuse(0.8, None, &params), 0.8);
    }

    #[test]
    fn hybrid_weight_one_depends_only_on_cosine() {
        let params = FusionParams {
            hybrid_weight: 1.0,
            bm25_normalization_factor: 10.0,
        };
        assert_eq!(fuse(0.42, Some(9.0), &params), 0.42);
    }

    #[test]
    fn hybrid_weight_zero_depends_only_on_bm25() {
        let params = FusionParams {
            hybrid_weight: 0.0,
            bm25_normalization_factor: 10.0,
        };
        assert!((fuse(0.99, Some(5.0), &params) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn bm25_contribution_is_clamped_to_unit_range() {
        let params = FusionParams {
            hybrid_weight: 0.0,
            bm25_normalization_factor: 10.0,
        };
        assert_eq!(fuse(0.0, Some(1000.0), &params), 1.0);
    }

    #[test]
    fn threshold_is_applied_before_truncation() {
        let candidates = vec![scored(1, 0.9, 0), scored(2, 0.1, 1), scored(3, 0.95, 2)];
        let results = rank(candidates, Some(0.5), 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, Uuid::from_u128(3));
    }

    #[test]
    fn results_are_sorted_non_increasing_by_score() {
        let candidates = vec![scored(1, 0.2, 0), scored(2, 0.9, 1), scored(3, 0.5, 2)];
        let results = rank(candidates, None, 10);
        let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let candidates = vec![scored(1, 0.5, 2), scored(2, 0.5, 0), scored(3, 0.5, 1)];
        let results = rank(candidates, None, 10);
        let ids: Vec<Uuid> = results.iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![Uuid::from_u128(2), Uuid::from_u128(3), Uuid::from_u128(1)]
        );
    }
}
