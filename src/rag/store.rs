//! Chunk index abstraction and relevance scoring.
//!
//! Embeddings are compared as unit vectors by squared L2 distance `d`, and
//! `search` reports `1 - d / sqrt(2)`. An exact match scores 1.0; orthogonal
//! vectors score about -0.41 and opposite ones about -1.83.

use async_trait::async_trait;

use super::types::{Chunk, ScoredChunk};
use crate::core::errors::ApiError;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Swap the whole index for `items`, recording the model that embedded
    /// them. Readers see either the old or the new contents.
    async fn replace_all(
        &self,
        items: Vec<(Chunk, Vec<f32>)>,
        embedding_model: &str,
    ) -> Result<(), ApiError>;

    /// Return up to `limit` chunks most similar to the query embedding,
    /// best first.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, ApiError>;

    /// Total number of indexed chunks.
    async fn count(&self) -> Result<usize, ApiError>;

    /// Embedding model the stored vectors were produced with.
    async fn embedding_model(&self) -> Result<Option<String>, ApiError>;
}

/// Score of two vectors pointing in opposite directions.
const MIN_RELEVANCE: f32 = 1.0 - 4.0 / std::f32::consts::SQRT_2;

fn normalized(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// Squared L2 distance between the normalized vectors, mapped to relevance.
/// Vectors of different dimensions rank below everything else.
pub(crate) fn relevance_score(query: &[f32], stored: &[f32]) -> f32 {
    if query.len() != stored.len() || query.is_empty() {
        return MIN_RELEVANCE;
    }

    let distance: f32 = normalized(query)
        .iter()
        .zip(normalized(stored).iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    1.0 - distance / std::f32::consts::SQRT_2
}

/// Sorts best-first and keeps `limit` entries. Ties keep insertion order.
pub(crate) fn top_k(mut scored: Vec<ScoredChunk>, limit: usize) -> Vec<ScoredChunk> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn identical_directions_score_one() {
        assert!(approx_eq(relevance_score(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), 1.0));
    }

    #[test]
    fn score_follows_euclidean_distance_of_unit_vectors() {
        // cos = 0.8: d = 2 * (1 - 0.8) = 0.4
        assert!(approx_eq(
            relevance_score(&[1.0, 0.0], &[0.8, 0.6]),
            1.0 - 0.4 / std::f32::consts::SQRT_2
        ));
        assert!(approx_eq(
            relevance_score(&[1.0, 0.0], &[0.0, 1.0]),
            1.0 - std::f32::consts::SQRT_2
        ));
        assert!(approx_eq(relevance_score(&[1.0, 0.0], &[-1.0, 0.0]), MIN_RELEVANCE));
    }

    #[test]
    fn cosine_of_point_seven_falls_below_the_default_threshold() {
        let cos: f32 = 0.7;
        let score = relevance_score(&[1.0, 0.0], &[cos, (1.0 - cos * cos).sqrt()]);
        assert!(approx_eq(score, 1.0 - std::f32::consts::SQRT_2 * 0.3));
        assert!(score < 0.60);
    }

    #[test]
    fn mismatched_dimensions_rank_last() {
        assert_eq!(relevance_score(&[1.0, 0.0], &[1.0]), MIN_RELEVANCE);
        assert!(relevance_score(&[1.0, 0.0], &[-0.9, 0.1]) >= MIN_RELEVANCE);
    }

    #[test]
    fn top_k_orders_best_first() {
        let scored = vec![
            ScoredChunk { chunk: Chunk::new("a", 0, "a"), score: 0.2 },
            ScoredChunk { chunk: Chunk::new("b", 0, "b"), score: 0.9 },
            ScoredChunk { chunk: Chunk::new("c", 0, "c"), score: 0.5 },
        ];

        let ranked = top_k(scored, 2);

        let sources: Vec<&str> = ranked.iter().map(|s| s.chunk.source.as_str()).collect();
        assert_eq!(sources, vec!["b", "c"]);
    }
}
