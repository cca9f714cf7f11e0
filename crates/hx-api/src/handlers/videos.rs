//! Video listing/detail/status handlers (spec §6).

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hx_models::{Job, Video, VideoId};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub video_id: Uuid,
    pub mime_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<DateTime<Utc>>,
}

impl From<Video> for VideoResponse {
    fn from(v: Video) -> Self {
        Self {
            video_id: v.video_id.as_uuid(),
            mime_type: v.mime_type,
            size_bytes: v.size_bytes,
            duration_s: v.duration_s,
            state: v.state.as_str().to_string(),
            error_text: v.error_text,
            created_at: v.created_at,
            indexed_at: v.indexed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// `GET /videos` — list the owner's videos, newest first (spec §6).
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<VideoResponse>>> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);
    let videos = hx_store::videos::list_for_owner(&state.store, &auth.owner_id, limit, offset).await?;
    Ok(Json(videos.into_iter().map(VideoResponse::from).collect()))
}

async fn owned_video(state: &AppState, auth: &AuthUser, video_id: Uuid) -> ApiResult<Video> {
    let video_id = VideoId::from_uuid(video_id);
    let video = hx_store::videos::get(&state.store, &video_id).await?;
    if video.owner_id != auth.owner_id {
        return Err(ApiError::not_found(format!("video {video_id}")));
    }
    Ok(video)
}

/// `GET /videos/{id}` — video detail.
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> ApiResult<Json<VideoResponse>> {
    let video = owned_video(&state, &auth, video_id).await?;
    Ok(Json(video.into()))
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: Uuid,
    pub stage: &'static str,
    pub state: &'static str,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl From<Job> for JobResponse {
    fn from(j: Job) -> Self {
        Self {
            job_id: j.job_id.as_uuid(),
            stage: j.stage.as_str(),
            state: j.state.as_str(),
            progress: j.progress,
            error_text: j.error_text,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VideoStatusResponse {
    pub video_id: Uuid,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    pub jobs: Vec<JobResponse>,
}

/// `GET /videos/{id}/status` — state plus the per-stage Job list (spec §6
/// "status includes per-stage Job list").
pub async fn status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(video_id): Path<Uuid>,
) -> ApiResult<Json<VideoStatusResponse>> {
    let video = owned_video(&state, &auth, video_id).await?;
    let jobs = hx_store::jobs::list_for_video(&state.store, &video.video_id).await?;

    Ok(Json(VideoStatusResponse {
        video_id: video.video_id.as_uuid(),
        state: video.state.as_str().to_string(),
        error_text: video.error_text,
        jobs: jobs.into_iter().map(JobResponse::from).collect(),
    }))
}
