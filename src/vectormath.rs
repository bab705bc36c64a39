//! Vector math primitives: L2 normalization, dot product, cosine similarity.
//!
//! Grounded on the `abkve` crate's hand-unrolled dot product: 8 independent
//! accumulators break the serial FMA dependency chain so the compiler can
//! schedule loads from both operands across iterations. The
//! `unsafe`/`get_unchecked` inner loop is preserved for the full-memory
//! scan; everything else in this crate stays in safe Rust.

/// Returns `v / ||v||₂`. If `v` is the zero vector, returns it unchanged —
/// there is nothing meaningful to normalize, and this keeps the operation
/// total rather than failing on a legitimate all-zero embedding.
pub fn normalize_l2(v: &[f32]) -> Vec<f32> {
    let norm = l2_norm(v);
    if norm <= 1e-10 {
        return v.to_vec();
    }
    let inv = 1.0 / norm;
    v.iter().map(|x| x * inv).collect()
}

#[inline]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Dot product of two equal-length slices. Precondition: `a.len() == b.len()`.
///
/// Uses an 8-wide unrolled accumulator pattern: on dimensions
/// that are multiples of 8 (common embedding widths — 384, 768, 1536) the
/// full loop runs unchecked; any remainder is handled with safe indexing.
#[inline(always)]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "dot product requires equal-length vectors");

    let len = a.len();
    let chunks = len / 8;

    let mut acc0 = 0.0f32;
    let mut acc1 = 0.0f32;
    let mut acc2 = 0.0f32;
    let mut acc3 = 0.0f32;
    let mut acc4 = 0.0f32;
    let mut acc5 = 0.0f32;
    let mut acc6 = 0.0f32;
    let mut acc7 = 0.0f32;

    // SAFETY: `i * 8 + 7 < chunks * 8 <= len == a.len() == b.len()`.
    unsafe {
        for i in 0..chunks {
            let base = i * 8;
            acc0 += a.get_unchecked(base) * b.get_unchecked(base);
            acc1 += a.get_unchecked(base + 1) * b.get_unchecked(base + 1);
            acc2 += a.get_unchecked(base + 2) * b.get_unchecked(base + 2);
            acc3 += a.get_unchecked(base + 3) * b.get_unchecked(base + 3);
            acc4 += a.get_unchecked(base + 4) * b.get_unchecked(base + 4);
            acc5 += a.get_unchecked(base + 5) * b.get_unchecked(base + 5);
            acc6 += a.get_unchecked(base + 6) * b.get_unchecked(base + 6);
            acc7 += a.get_unchecked(base + 7) * b.get_unchecked(base + 7);
        }
    }

    let mut result = acc0 + acc1 + acc2 + acc3 + acc4 + acc5 + acc6 + acc7;

    let remainder_start = chunks * 8;
    for i in remainder_start..len {
        result += a[i] * b[i];
    }

    result
}

/// Cosine similarity of two already-normalized vectors, clamped to `[-1, 1]`
/// to absorb floating-point drift.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    dot(a, b).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_unit_vector_is_idempotent() {
        let v = normalize_l2(&[3.0, 4.0]);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
        assert!((v[0] - 0.6).abs() < 1e-5);
        assert!((v[1] - 0.8).abs() < 1e-5);
    }

    #[test]
    fn normalize_zero_vector_returns_unchanged() {
        let v = normalize_l2(&[0.0, 0.0, 0.0]);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn dot_product_matches_naive_sum() {
        let a: Vec<f32> = (0..17).map(|i| i as f32).collect();
        let b: Vec<f32> = (0..17).map(|i| (i * 2) as f32).collect();
        let expected: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        assert!((dot(&a, &b) - expected).abs() < 1e-3);
    }

    #[test]
    fn cosine_of_identical_normalized_vectors_is_one() {
        let v = normalize_l2(&[1.0, 2.0, 3.0, 4.0]);
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = normalize_l2(&[1.0, 0.0]);
        let b = normalize_l2(&[0.0, 1.0]);
        assert!(cosine(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_clamped_within_bounds() {
        let v = normalize_l2(&[1.0, 1.0, 1.0]);
        let score = cosine(&v, &v);
        assert!((-1.0..=1.0).contains(&score));
    }
}
