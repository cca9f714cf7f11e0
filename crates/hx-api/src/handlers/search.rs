//! Search handlers for the three retrieval modes (spec §4.3, §6).

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use hx_retrieval::{
    query_hybrid, query_keyword, query_semantic, AnnOptions, HybridWeights, Page, Pagination,
    RetrievalFilters, ScoredScene, SemanticWeights,
};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub person_id: Option<uuid::Uuid>,
    #[serde(default)]
    pub min_duration: Option<f64>,
    #[serde(default)]
    pub max_duration: Option<f64>,
}

impl SearchParams {
    fn pagination(&self) -> Pagination {
        Pagination::new(self.limit.unwrap_or(20), self.offset.unwrap_or(0))
    }

    fn filters(&self) -> RetrievalFilters {
        RetrievalFilters {
            person_id: self.person_id,
            min_duration_s: self.min_duration,
            max_duration_s: self.max_duration,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SemanticSearchParams {
    #[serde(flatten)]
    pub base: SearchParams,
    #[serde(default)]
    pub text_weight: Option<f32>,
    #[serde(default)]
    pub vision_weight: Option<f32>,
}

/// `GET /search` — Mode K, keyword/metadata scoring (spec §4.3).
pub async fn keyword(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Page<ScoredScene>>> {
    let owner_uuid = auth.owner_id.as_uuid();
    let videos = hx_store::videos::list_for_owner(&state.store, &auth.owner_id, 10_000, 0).await?;
    let storage_keys: HashMap<uuid::Uuid, String> = videos
        .into_iter()
        .map(|v| (v.video_id.as_uuid(), v.storage_key))
        .collect();

    let page = query_keyword(
        &state.store,
        &owner_uuid,
        &params.q,
        &storage_keys,
        &params.filters(),
        &params.pagination(),
    )
    .await?;
    Ok(Json(page))
}

/// `GET /search/semantic` — Mode S (spec §4.3).
pub async fn semantic(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SemanticSearchParams>,
) -> ApiResult<Json<Page<ScoredScene>>> {
    if !state.flags.semantic_search {
        return Err(ApiError::bad_request("semantic search is disabled"));
    }
    let owner_uuid = auth.owner_id.as_uuid();

    let mut weights = SemanticWeights::default();
    if let Some(w) = params.text_weight {
        weights.w_text = w;
    }
    if let Some(w) = params.vision_weight {
        weights.w_vision = w;
    }
    weights.person_boost = state.config.semantic_person_boost;

    let ann = AnnOptions {
        enabled: state.flags.ann_tuning,
        topk_candidates: state.config.ann_topk_candidates,
        final_limit: state.config.ann_final_limit,
    };

    let page = query_semantic(
        &state.store,
        &state.inference,
        &owner_uuid,
        &params.base.q,
        &weights,
        &ann,
        &params.base.filters(),
        &params.base.pagination(),
    )
    .await?;
    Ok(Json(page))
}

/// `GET /search/hybrid` — Mode H, gated behind both `semantic_search` and
/// `hybrid_rrf` feature flags (spec §6 "requires both ... enabled (else 501)").
pub async fn hybrid(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Page<ScoredScene>>> {
    if !state.flags.semantic_search || !state.flags.hybrid_rrf {
        return Err(ApiError::not_implemented(
            "hybrid search requires semantic_search and hybrid_rrf to be enabled",
        ));
    }
    let owner_uuid = auth.owner_id.as_uuid();

    let weights = HybridWeights {
        k: state.config.hybrid_rrf_k,
        w_sparse: state.config.hybrid_sparse_weight,
        w_dense: state.config.hybrid_dense_weight,
        topk: state.config.hybrid_topk,
    };

    let page = query_hybrid(
        &state.store,
        &state.inference,
        &owner_uuid,
        &params.q,
        &weights,
        &params.filters(),
        &params.pagination(),
    )
    .await?;
    Ok(Json(page))
}
