//! Shared types used by all three query modes: pagination, scope filters,
//! and the scored-scene result shape.

use chrono::{DateTime, Utc};
use hx_models::Scene;
use serde::Serialize;

/// Page bounds. `limit` is clamped to `[1, 100]`, `offset` to `>= 0`, same
/// pagination defaults the API layer uses for its own `limit`/`offset`
/// query params.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(1, 100),
            offset: offset.max(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { limit: 20, offset: 0 }
    }
}

/// Scope common to all three modes: owner is always required by the caller
/// separately; this carries the optional narrowing filters.
#[derive(Debug, Clone, Default)]
pub struct RetrievalFilters {
    pub person_id: Option<uuid::Uuid>,
    pub min_duration_s: Option<f64>,
    pub max_duration_s: Option<f64>,
}

/// One ranked result: a Scene plus the score that produced its rank and the
/// parent Video fields a results list needs without a second round trip.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredScene {
    #[serde(flatten)]
    pub scene: Scene,
    pub score: f32,
    pub video_created_at: DateTime<Utc>,
    pub video_duration_s: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: &Pagination) -> Self {
        Self {
            items,
            limit: pagination.limit,
            offset: pagination.offset,
        }
    }
}

/// Cosine similarity of two unit-normalized vectors is their dot product.
/// Both legs of Mode S and the canonical candidate set only ever carry
/// vectors written by `hx_models::dims::l2_normalize`, so this never needs
/// to divide by the vectors' norms.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Apply offset/limit to an already-sorted `Vec`.
pub fn paginate<T>(items: Vec<T>, pagination: &Pagination) -> Vec<T> {
    let start = pagination.offset as usize;
    if start >= items.len() {
        return Vec::new();
    }
    let end = (start + pagination.limit as usize).min(items.len());
    items.into_iter().skip(start).take(end - start).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_limit_and_offset() {
        let p = Pagination::new(0, -5);
        assert_eq!(p.limit, 1);
        assert_eq!(p.offset, 0);

        let p = Pagination::new(1000, 10);
        assert_eq!(p.limit, 100);
        assert_eq!(p.offset, 10);
    }

    #[test]
    fn paginate_past_end_is_empty() {
        let items = vec![1, 2, 3];
        let p = Pagination::new(10, 5);
        assert!(paginate(items, &p).is_empty());
    }

    #[test]
    fn cosine_similarity_of_identical_unit_vectors_is_one() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }
}
