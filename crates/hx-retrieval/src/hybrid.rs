//! Mode H — hybrid search via Reciprocal Rank Fusion (spec §4.3).

use std::collections::HashMap;

use uuid::Uuid;

use hx_inference::InferenceClient;
use hx_models::dims::l2_normalize;
use hx_store::scenes::{keyword_search, list_candidates_for_owner, text_vec_search};
use sqlx::PgPool;

use crate::common::{paginate, Page, Pagination, RetrievalFilters, ScoredScene};
use crate::error::{RetrievalError, RetrievalResult};

/// RRF constants (spec §4.3 point 3). `topk` bounds how many ranks are
/// pulled from each leg before fusion.
#[derive(Debug, Clone, Copy)]
pub struct HybridWeights {
    pub k: f32,
    pub w_sparse: f32,
    pub w_dense: f32,
    pub topk: i64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            k: 60.0,
            w_sparse: 0.3,
            w_dense: 0.7,
            topk: 100,
        }
    }
}

/// `score(s) = w_sparse / (k + rank_sparse(s)) + w_dense / (k + rank_dense(s))`,
/// with a missing rank contributing 0. Ranks are 1-based.
pub fn fuse(
    weights: &HybridWeights,
    rank_sparse: Option<usize>,
    rank_dense: Option<usize>,
) -> f32 {
    let sparse_term = rank_sparse
        .map(|r| weights.w_sparse / (weights.k + r as f32))
        .unwrap_or(0.0);
    let dense_term = rank_dense
        .map(|r| weights.w_dense / (weights.k + r as f32))
        .unwrap_or(0.0);
    sparse_term + dense_term
}

pub async fn query(
    pool: &PgPool,
    inference: &InferenceClient,
    owner_id: &Uuid,
    query_text: &str,
    weights: &HybridWeights,
    filters: &RetrievalFilters,
    pagination: &Pagination,
) -> RetrievalResult<Page<ScoredScene>> {
    let trimmed = query_text.trim();
    if trimmed.is_empty() {
        return Err(RetrievalError::Invalid("query must not be empty".into()));
    }

    let mut query_vec = inference.embed_text_for_query(trimmed).await?;
    l2_normalize(&mut query_vec);

    let sparse_rows = keyword_search(pool, owner_id, trimmed, weights.topk).await?;
    let dense_rows = text_vec_search(pool, owner_id, &query_vec, weights.topk).await?;

    let rank_sparse: HashMap<Uuid, usize> = sparse_rows
        .into_iter()
        .enumerate()
        .map(|(i, (scene_id, _video_id, _rank))| (scene_id, i + 1))
        .collect();
    let rank_dense: HashMap<Uuid, usize> = dense_rows
        .into_iter()
        .enumerate()
        .map(|(i, (scene_id, _video_id, _sim))| (scene_id, i + 1))
        .collect();

    let candidate_map = list_candidates_for_owner(
        pool,
        owner_id,
        filters.person_id,
        filters.min_duration_s,
        filters.max_duration_s,
    )
    .await?;

    let mut scored: Vec<ScoredScene> = candidate_map
        .into_iter()
        .filter_map(|candidate| {
            let scene_id = candidate.scene.scene_id.as_uuid();
            let rs = rank_sparse.get(&scene_id).copied();
            let rd = rank_dense.get(&scene_id).copied();
            if rs.is_none() && rd.is_none() {
                return None;
            }
            let score = fuse(weights, rs, rd);
            Some(ScoredScene {
                video_created_at: candidate.video_created_at,
                video_duration_s: candidate.video_duration_s,
                scene: candidate.scene,
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    Ok(Page::new(paginate(scored, pagination), pagination))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spec §8 scenario 6. A ranks #1 sparse / #5 dense; B ranks #10 sparse
    /// / #1 dense. With defaults, B's fused score should exceed A's despite
    /// A holding the top sparse rank.
    #[test]
    fn hybrid_fusion_reorders_by_combined_rank() {
        let weights = HybridWeights::default();

        let score_a = fuse(&weights, Some(1), Some(5));
        let score_b = fuse(&weights, Some(10), Some(1));

        assert!((score_a - 0.015_69).abs() < 1e-4);
        assert!((score_b - 0.015_76).abs() < 1e-4);
        assert!(score_b > score_a);
    }

    #[test]
    fn missing_rank_contributes_zero() {
        let weights = HybridWeights::default();
        let sparse_only = fuse(&weights, Some(1), None);
        assert!((sparse_only - weights.w_sparse / (weights.k + 1.0)).abs() < 1e-6);
    }
}
