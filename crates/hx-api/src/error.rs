//! API error types (spec §7 `Classified`, centralized here across every
//! downstream crate's error type).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use hx_models::Classified;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limited")]
    RateLimited,

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error(transparent)]
    Classified(#[from] Classified),

    #[error(transparent)]
    Store(#[from] hx_store::StoreError),

    #[error(transparent)]
    Storage(#[from] hx_blob::StorageError),

    #[error(transparent)]
    Queue(#[from] hx_queue::QueueError),

    #[error(transparent)]
    Inference(#[from] hx_inference::InferenceError),

    #[error(transparent)]
    Retrieval(#[from] hx_retrieval::RetrievalError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Classified::Unauthorized(msg.into()).into()
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Classified::Unauthorized(msg.into()).into()
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Classified::NotFound(msg.into()).into()
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Classified::Invalid(msg.into()).into()
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Classified::Conflict(msg.into()).into()
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Classified::Internal(msg.into()).into()
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::NotImplemented(msg.into())
    }

    /// Consumes `self` so each downstream error converts into `Classified`
    /// exactly once, preserving its original variant. The two API-only
    /// variants have no `Classified` counterpart and are handled directly.
    fn into_status_and_detail(self) -> (StatusCode, String) {
        let detail = self.to_string();
        match self {
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, detail),
            ApiError::NotImplemented(_) => (StatusCode::NOT_IMPLEMENTED, detail),
            ApiError::Classified(c) => classified_response(c),
            ApiError::Store(e) => classified_response(e.into()),
            ApiError::Storage(e) => classified_response(e.into()),
            ApiError::Queue(e) => classified_response(e.into()),
            ApiError::Inference(e) => classified_response(e.into()),
            ApiError::Retrieval(e) => classified_response(e.into()),
        }
    }
}

fn classified_response(classified: Classified) -> (StatusCode, String) {
    let status = StatusCode::from_u16(classified.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, classified.to_string())
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.into_status_and_detail();
        (status, Json(ErrorResponse { detail })).into_response()
    }
}
