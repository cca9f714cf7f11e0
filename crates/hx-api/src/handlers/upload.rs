//! Upload init/complete handlers (spec §6 `/videos/upload/init`,
//! `/videos/upload/complete`).

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hx_blob::keys::upload_key;
use hx_models::{Video, VideoId, VideoStatus};
use hx_queue::job::{ProcessVideoJob, QueueJob};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadInitRequest {
    pub mime_type: String,
    pub size_bytes: i64,
}

#[derive(Debug, Serialize)]
pub struct UploadInitResponse {
    pub video_id: Uuid,
    pub upload_url: String,
    pub expires_in: u64,
}

/// `POST /videos/upload/init` — validates MIME and size, creates the
/// `Video` row in `uploading`, and returns a presigned PUT URL (spec §6).
pub async fn init(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UploadInitRequest>,
) -> ApiResult<Json<UploadInitResponse>> {
    if !state.config.allowed_mime_types.iter().any(|m| m == &req.mime_type) {
        return Err(ApiError::bad_request(format!(
            "mime type {} is not in the allowed list",
            req.mime_type
        )));
    }
    if req.size_bytes <= 0 || req.size_bytes > state.config.max_video_bytes {
        return Err(ApiError::bad_request(format!(
            "size_bytes must be within (0, {}]",
            state.config.max_video_bytes
        )));
    }

    let video_id = VideoId::new();
    let extension = extension_for_mime(&req.mime_type);
    let storage_key = upload_key(&auth.owner_id, &video_id, extension);
    let video = Video {
        video_id: video_id.clone(),
        ..Video::new(auth.owner_id, storage_key.clone(), &req.mime_type, req.size_bytes)
    };

    hx_store::videos::insert(&state.store, &video).await?;

    let upload_url = state
        .blob
        .presign_put(&storage_key, &req.mime_type, state.config.upload_url_ttl)
        .await?;

    Ok(Json(UploadInitResponse {
        video_id: video.video_id.as_uuid(),
        upload_url,
        expires_in: state.config.upload_url_ttl.as_secs(),
    }))
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        _ => "bin",
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadCompleteRequest {
    pub video_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UploadCompleteResponse {
    pub video_id: Uuid,
    pub state: String,
}

/// `POST /videos/upload/complete` — transitions `uploading` → `validating`
/// and enqueues the pipeline task (spec §6). Completing the same video
/// twice is rejected with `conflict` rather than re-enqueuing (spec §8
/// boundary behavior).
pub async fn complete(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<UploadCompleteRequest>,
) -> ApiResult<Json<UploadCompleteResponse>> {
    let video_id = VideoId::from_uuid(req.video_id);
    let video = hx_store::videos::get(&state.store, &video_id).await?;
    if video.owner_id != auth.owner_id {
        return Err(ApiError::not_found(format!("video {video_id}")));
    }
    if video.state != VideoStatus::Uploading {
        return Err(ApiError::conflict(format!(
            "video {video_id} is already {}",
            video.state
        )));
    }

    hx_store::videos::set_state(&state.store, &video_id, VideoStatus::Validating).await?;

    let job = QueueJob::ProcessVideo(ProcessVideoJob::new(video_id.clone()));
    state.queue.enqueue_process_video(job).await?;

    Ok(Json(UploadCompleteResponse {
        video_id: video_id.as_uuid(),
        state: VideoStatus::Validating.as_str().to_string(),
    }))
}
