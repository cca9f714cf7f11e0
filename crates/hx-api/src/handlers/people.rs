//! Face profile CRUD and photo enrollment handlers (spec §4.2, §6).

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hx_blob::keys::enrollment_photo_key;
use hx_models::{FaceProfile, PersonId};
use hx_queue::job::{ComputeFaceEmbeddingJob, QueueJob};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PersonResponse {
    pub person_id: Uuid,
    pub name: String,
    pub has_embedding: bool,
    pub photo_count: usize,
}

impl From<FaceProfile> for PersonResponse {
    fn from(p: FaceProfile) -> Self {
        Self {
            person_id: p.person_id.as_uuid(),
            name: p.name,
            has_embedding: p.face_vec.is_some(),
            photo_count: p.photo_keys.len(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePersonRequest {
    pub name: String,
}

/// `POST /people` — create a face profile (spec §6 "Profiles CRUD").
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreatePersonRequest>,
) -> ApiResult<Json<PersonResponse>> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }
    let profile = FaceProfile::new(auth.owner_id, req.name.trim());
    hx_store::faces::insert(&state.store, &profile).await?;
    Ok(Json(profile.into()))
}

/// `GET /people` — list the owner's face profiles.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<PersonResponse>>> {
    let profiles = hx_store::faces::list_for_owner(&state.store, &auth.owner_id).await?;
    Ok(Json(profiles.into_iter().map(PersonResponse::from).collect()))
}

/// `DELETE /people/{id}` — remove a face profile.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(person_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let person_id = PersonId::from(person_id);
    let profile = hx_store::faces::get(&state.store, &person_id).await?;
    if profile.owner_id != auth.owner_id {
        return Err(ApiError::not_found(format!("person {person_id}")));
    }
    hx_store::faces::delete(&state.store, &person_id).await?;
    Ok(Json(serde_json::json!({"deleted": true})))
}

#[derive(Debug, Serialize)]
pub struct PhotoUploadResponse {
    pub upload_url: String,
    pub expires_in: u64,
    pub photo_index: usize,
}

/// `POST /people/{id}/photos` — presigned upload for one enrollment photo
/// (spec §6 "Returns presigned upload").
pub async fn add_photo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(person_id): Path<Uuid>,
) -> ApiResult<Json<PhotoUploadResponse>> {
    let person_id = PersonId::from(person_id);
    let profile = hx_store::faces::get(&state.store, &person_id).await?;
    if profile.owner_id != auth.owner_id {
        return Err(ApiError::not_found(format!("person {person_id}")));
    }

    let photo_index = profile.photo_keys.len();
    let key = enrollment_photo_key(&auth.owner_id, &person_id, photo_index);
    let upload_url = state
        .blob
        .presign_put(&key, "image/jpeg", state.config.upload_url_ttl)
        .await?;

    Ok(Json(PhotoUploadResponse {
        upload_url,
        expires_in: state.config.upload_url_ttl.as_secs(),
        photo_index,
    }))
}

#[derive(Debug, Serialize)]
pub struct PhotoCompleteResponse {
    pub person_id: Uuid,
    pub photo_count: usize,
}

/// `POST /people/{id}/photos/complete` — record the uploaded photo key and
/// enqueue the enrollment task (spec §6, §4.2).
pub async fn complete_photo(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(person_id): Path<Uuid>,
) -> ApiResult<Json<PhotoCompleteResponse>> {
    if !state.flags.face_enrollment {
        return Err(ApiError::not_implemented("face enrollment is disabled"));
    }
    let person_id = PersonId::from(person_id);
    let profile = hx_store::faces::get(&state.store, &person_id).await?;
    if profile.owner_id != auth.owner_id {
        return Err(ApiError::not_found(format!("person {person_id}")));
    }

    let photo_index = profile.photo_keys.len();
    let key = enrollment_photo_key(&auth.owner_id, &person_id, photo_index);
    hx_store::faces::add_photo_key(&state.store, &person_id, &key).await?;

    let job = QueueJob::ComputeFaceEmbedding(ComputeFaceEmbeddingJob::new(person_id.clone()));
    state.queue.enqueue_face_embedding(job).await?;

    Ok(Json(PhotoCompleteResponse {
        person_id: person_id.as_uuid(),
        photo_count: photo_index + 1,
    }))
}
