//! Cosine-similarity ranking over the corpus.
//!
//! Brute-force linear scan (O(N·D) per query); fine while the corpus
//! stays in the low thousands of sections. TODO: revisit if a concrete
//! corpus-size requirement ever forces an ANN index.

use std::cmp::Ordering;

use super::store::DocumentSection;

/// A section paired with its similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredSection {
    pub section: DocumentSection,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
    /// 1-based position in the ranked output.
    pub rank: usize,
}

/// Cosine similarity between two vectors.
///
/// Zero or near-zero norms score 0.0 rather than propagating NaN, as do
/// mismatched lengths. The result is clamped to [-1, 1] to absorb
/// floating-point drift.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// Score every section against the query vector and keep the top `k`.
///
/// Ordering is descending by score with ties broken by ascending
/// `doc_id`, so repeated calls on the same inputs always return the
/// same sequence.
pub fn rank(query: &[f32], sections: Vec<DocumentSection>, k: usize) -> Vec<ScoredSection> {
    let mut scored: Vec<ScoredSection> = sections
        .into_iter()
        .map(|section| {
            let score = cosine_similarity(query, &section.embedding);
            ScoredSection {
                section,
                score,
                rank: 0,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.section.doc_id.cmp(&b.section.doc_id))
    });
    scored.truncate(k);

    for (idx, entry) in scored.iter_mut().enumerate() {
        entry.rank = idx + 1;
    }

    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(doc_id: i64, embedding: Vec<f32>) -> DocumentSection {
        DocumentSection {
            doc_id,
            section: format!("S{doc_id}"),
            content: format!("text {doc_id}"),
            embedding,
        }
    }

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(cosine_similarity(&v, &v), 1.0));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_vectors() {
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = [0.3, -0.7, 2.0];
        let b = [1.1, 0.2, -0.4];
        assert!(approx_eq(
            cosine_similarity(&a, &b),
            cosine_similarity(&b, &a)
        ));
    }

    #[test]
    fn zero_norm_scores_zero_not_nan() {
        let score = cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]);
        assert!(approx_eq(score, 0.0));
        assert!(!score.is_nan());
    }

    #[test]
    fn mismatched_dimensions_score_zero() {
        assert!(approx_eq(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0));
    }

    #[test]
    fn rank_truncates_to_k_in_descending_order() {
        let query = vec![1.0, 0.0];
        let sections = vec![
            section(1, vec![0.8, 0.2]),
            section(2, vec![0.1, 0.9]),
            section(3, vec![0.9, 0.0]),
        ];

        let ranked = rank(&query, sections, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].section.doc_id, 3);
        assert_eq!(ranked[1].section.doc_id, 1);
        assert!(ranked[0].score >= ranked[1].score);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn rank_returns_at_most_corpus_size() {
        let query = vec![1.0];
        let ranked = rank(&query, vec![section(1, vec![1.0])], 10);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn rank_of_empty_corpus_is_empty() {
        assert!(rank(&[1.0, 0.0], Vec::new(), 5).is_empty());
    }

    #[test]
    fn ties_break_by_ascending_doc_id() {
        let query = vec![1.0, 0.0];
        let sections = vec![
            section(7, vec![2.0, 0.0]),
            section(3, vec![1.0, 0.0]),
            section(5, vec![3.0, 0.0]),
        ];

        // All three are colinear with the query, so every score is 1.0.
        let ranked = rank(&query, sections, 3);
        let ids: Vec<i64> = ranked.iter().map(|r| r.section.doc_id).collect();
        assert_eq!(ids, vec![3, 5, 7]);
    }

    #[test]
    fn orthogonal_example_picks_exact_match() {
        let sections = vec![
            section(1, vec![1.0, 0.0]),
            section(2, vec![0.0, 1.0]),
        ];

        let ranked = rank(&[1.0, 0.0], sections, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].section.doc_id, 1);
        assert!(approx_eq(ranked[0].score, 1.0));
    }
}
