//! Mode S — semantic search (spec §4.3). Combines text/vision cosine
//! similarity against a single query embedding, with an optional per-scene
//! person boost and an optional ANN pre-filter stage.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use hx_inference::InferenceClient;
use hx_models::dims::l2_normalize;
use hx_store::scenes::{image_vec_search, list_candidates_for_owner, CandidateScene};
use sqlx::PgPool;

use crate::common::{cosine_similarity, paginate, Page, Pagination, RetrievalFilters, ScoredScene};
use crate::error::{RetrievalError, RetrievalResult};

/// Default weights per spec §4.3. `tag_weight` is reserved (always 0 until
/// a tag-similarity leg is added) and is not exposed for override.
#[derive(Debug, Clone, Copy)]
pub struct SemanticWeights {
    pub w_text: f32,
    pub w_vision: f32,
    pub person_boost: f32,
}

impl Default for SemanticWeights {
    fn default() -> Self {
        Self {
            w_text: 0.5,
            w_vision: 0.35,
            person_boost: 0.3,
        }
    }
}

impl SemanticWeights {
    fn validate(&self) -> RetrievalResult<()> {
        let in_range = |w: f32| (0.0..=1.0).contains(&w);
        if !in_range(self.w_text) || !in_range(self.w_vision) || !in_range(self.person_boost) {
            return Err(RetrievalError::Invalid(
                "semantic weights must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// ANN tuning knobs (spec §4.3 point 4). `enabled` gates whether the vector
/// index is consulted for a bounded candidate set before re-ranking.
#[derive(Debug, Clone, Copy)]
pub struct AnnOptions {
    pub enabled: bool,
    pub topk_candidates: i64,
    pub final_limit: i64,
}

impl Default for AnnOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            topk_candidates: 200,
            final_limit: 20,
        }
    }
}

async fn candidate_map(
    pool: &PgPool,
    owner_id: &Uuid,
    filters: &RetrievalFilters,
) -> RetrievalResult<HashMap<Uuid, CandidateScene>> {
    let candidates = list_candidates_for_owner(
        pool,
        owner_id,
        None,
        filters.min_duration_s,
        filters.max_duration_s,
    )
    .await?;
    Ok(candidates
        .into_iter()
        .filter(|c| c.scene.image_vec.is_some())
        .map(|c| (c.scene.scene_id.as_uuid(), c))
        .collect())
}

async fn boosted_scene_ids(
    pool: &PgPool,
    owner_id: &Uuid,
    person_id: Option<Uuid>,
) -> RetrievalResult<HashSet<Uuid>> {
    let Some(person_id) = person_id else {
        return Ok(HashSet::new());
    };
    let rows = list_candidates_for_owner(pool, owner_id, Some(person_id), None, None).await?;
    Ok(rows.into_iter().map(|c| c.scene.scene_id.as_uuid()).collect())
}

fn to_scored(candidate: CandidateScene, score: f32) -> ScoredScene {
    ScoredScene {
        video_created_at: candidate.video_created_at,
        video_duration_s: candidate.video_duration_s,
        scene: candidate.scene,
        score,
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn query(
    pool: &PgPool,
    inference: &InferenceClient,
    owner_id: &Uuid,
    query_text: &str,
    weights: &SemanticWeights,
    ann: &AnnOptions,
    filters: &RetrievalFilters,
    pagination: &Pagination,
) -> RetrievalResult<Page<ScoredScene>> {
    let trimmed = query_text.trim();
    if trimmed.is_empty() {
        return Err(RetrievalError::Invalid("query must not be empty".into()));
    }
    weights.validate()?;

    let mut query_vec = inference.embed_text_for_query(trimmed).await?;
    l2_normalize(&mut query_vec);

    let boosted = boosted_scene_ids(pool, owner_id, filters.person_id).await?;

    let scored: Vec<ScoredScene> = if ann.enabled {
        let mut candidates = candidate_map(pool, owner_id, filters).await?;
        let ann_rows = image_vec_search(pool, owner_id, &query_vec, ann.topk_candidates).await?;

        let mut scored: Vec<ScoredScene> = ann_rows
            .into_iter()
            .filter_map(|(scene_id, _video_id, vision_sim)| {
                let candidate = candidates.remove(&scene_id)?;
                let text_sim = candidate
                    .scene
                    .text_vec
                    .as_deref()
                    .map(|v| cosine_similarity(v, &query_vec))
                    .unwrap_or(0.0);
                let boost = if boosted.contains(&scene_id) {
                    weights.person_boost
                } else {
                    0.0
                };
                let score = weights.w_text * text_sim + weights.w_vision * vision_sim + boost;
                Some(to_scored(candidate, score))
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(ann.final_limit.max(0) as usize);
        scored
    } else {
        let candidates = candidate_map(pool, owner_id, filters).await?;
        let mut scored: Vec<ScoredScene> = candidates
            .into_values()
            .filter_map(|candidate| {
                let image_vec = candidate.scene.image_vec.as_deref()?;
                let vision_sim = cosine_similarity(image_vec, &query_vec);
                let text_sim = candidate
                    .scene
                    .text_vec
                    .as_deref()
                    .map(|v| cosine_similarity(v, &query_vec))
                    .unwrap_or(0.0);
                let boost = if boosted.contains(&candidate.scene.scene_id.as_uuid()) {
                    weights.person_boost
                } else {
                    0.0
                };
                let score = weights.w_text * text_sim + weights.w_vision * vision_sim + boost;
                Some(to_scored(candidate, score))
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    };

    Ok(Page::new(paginate(scored, pagination), pagination))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_out_of_range_are_rejected() {
        let w = SemanticWeights {
            w_text: 1.5,
            ..SemanticWeights::default()
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn default_weights_are_in_range() {
        assert!(SemanticWeights::default().validate().is_ok());
    }

    #[test]
    fn person_boost_adds_exactly_configured_amount() {
        let weights = SemanticWeights::default();
        let text_sim = 0.4_f32;
        let vision_sim = 0.6_f32;
        let base = weights.w_text * text_sim + weights.w_vision * vision_sim;
        let boosted = base + weights.person_boost;
        assert!((boosted - base - weights.person_boost).abs() < 1e-6);
    }
}
