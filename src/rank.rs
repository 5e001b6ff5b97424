//! Cosine-similarity ranking.
//!
//! Scores are computed in `f64` regardless of the `f32` storage, so ranking a
//! list is deterministic and independent of how the vectors were batched.

use std::cmp::Ordering;

use crate::{PipelineError, ScoredResult};

/// `dot(a, b) / (|a| * |b|)`, or `0.0` when either operand has zero norm.
///
/// Callers must pass equal-length slices.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Effective result count: `n` when unspecified, otherwise `1..=n`.
pub fn resolve_top_k(top_k: Option<usize>, n: usize) -> Result<usize, PipelineError> {
    match top_k {
        None => Ok(n),
        Some(k) if k >= 1 && k <= n => Ok(k),
        Some(k) => Err(PipelineError::validation(
            "top_k",
            format!("must be between 1 and {n}, got {k}"),
        )),
    }
}

/// Rank `documents` against `query`, best first.
///
/// Ties keep ascending document order. Returns exactly `min(top_k, n)` entries
/// with unique indices.
pub fn rank(
    query: &[f32],
    documents: &[Vec<f32>],
    top_k: Option<usize>,
) -> Result<Vec<ScoredResult>, PipelineError> {
    if documents.is_empty() {
        return Err(PipelineError::validation(
            "documents",
            "must contain at least one document",
        ));
    }
    if query.is_empty() {
        return Err(PipelineError::validation("query", "must not be empty"));
    }
    let k = resolve_top_k(top_k, documents.len())?;

    if let Some((index, doc)) = documents
        .iter()
        .enumerate()
        .find(|(_, doc)| doc.len() != query.len())
    {
        return Err(PipelineError::DimensionMismatch {
            index,
            expected: query.len(),
            actual: doc.len(),
        });
    }

    let mut scored: Vec<ScoredResult> = documents
        .iter()
        .enumerate()
        .map(|(index, doc)| ScoredResult::new(index, cosine_similarity(query, doc)))
        .collect();

    scored.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.index.cmp(&b.index),
        other => other,
    });
    scored.truncate(k);
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_descending_score() {
        let docs = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]];
        let ranked = rank(&[1.0, 0.0], &docs, None).unwrap();
        let pairs: Vec<(usize, f64)> = ranked.iter().map(|r| (r.index, r.score)).collect();
        assert_eq!(pairs, vec![(0, 1.0), (1, 0.0), (2, -1.0)]);
    }

    #[test]
    fn top_k_truncates() {
        let docs = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]];
        let ranked = rank(&[1.0, 0.0], &docs, Some(1)).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].index, 0);
    }

    #[test]
    fn ties_keep_input_order() {
        let docs = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 2.0], vec![1.0, 0.0]];
        let ranked = rank(&[1.0, 0.0], &docs, None).unwrap();
        let order: Vec<usize> = ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn top_k_out_of_range_rejected() {
        let docs = vec![vec![1.0], vec![2.0]];
        for k in [0, 3] {
            let err = rank(&[1.0], &docs, Some(k)).unwrap_err();
            assert_eq!(err.field(), Some("top_k"));
        }
    }

    #[test]
    fn empty_documents_rejected() {
        let err = rank(&[1.0], &[], None).unwrap_err();
        assert_eq!(err.field(), Some("documents"));
    }

    #[test]
    fn dimension_mismatch_reports_first_offender() {
        let docs = vec![vec![1.0, 0.0], vec![1.0], vec![1.0, 2.0, 3.0]];
        match rank(&[1.0, 0.0], &docs, None).unwrap_err() {
            PipelineError::DimensionMismatch {
                index,
                expected,
                actual,
            } => assert_eq!((index, expected, actual), (1, 2, 1)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_norm_document_scores_zero() {
        let docs = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let ranked = rank(&[1.0, 1.0], &docs, None).unwrap();
        assert_eq!(ranked[1].index, 0);
        assert_eq!(ranked[1].score, 0.0);
    }

    #[test]
    fn scores_are_bounded() {
        let a = [0.1f32, 0.2, 0.3];
        let b = [0.3f32, 0.6, 0.9];
        let s = cosine_similarity(&a, &b);
        assert!(s <= 1.0 && s > 0.9999);
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ranking_is_idempotent() {
        let docs: Vec<Vec<f32>> = (0..20)
            .map(|i| vec![(i as f32).sin(), (i as f32).cos(), 0.5])
            .collect();
        let first = rank(&[0.3, 0.7, 0.1], &docs, Some(5)).unwrap();
        let second = rank(&[0.3, 0.7, 0.1], &docs, Some(5)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn resolve_top_k_defaults_to_n() {
        assert_eq!(resolve_top_k(None, 4).unwrap(), 4);
        assert_eq!(resolve_top_k(Some(4), 4).unwrap(), 4);
    }
}
