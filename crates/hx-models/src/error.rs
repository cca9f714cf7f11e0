//! Shared error taxonomy (spec §7). Every crate's local error enum
//! implements `From<LocalError> for Classified` so the worker's stage
//! classifier and the API's `IntoResponse` impl speak one vocabulary,
//! with `hx_api::ApiError` centralizing conversions from each downstream
//! crate's error type.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Error)]
pub enum Classified {
    /// Caller-supplied input was invalid; retrying without changing the
    /// request would fail identically.
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// Worth retrying with backoff: network blip, 5xx, lock contention.
    #[error("transient: {0}")]
    Transient(String),
    /// The media itself is unusable (corrupt, unreadable, zero duration).
    #[error("fatal media error: {0}")]
    FatalMedia(String),
    /// A stage could not complete fully but the pipeline may continue
    /// (spec §9 `StageResult::SoftDegrade`).
    #[error("soft degrade: {0}")]
    SoftDegrade(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Classified {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Classified::Transient(_))
    }

    pub fn is_permanent_failure(&self) -> bool {
        matches!(self, Classified::FatalMedia(_) | Classified::Invalid(_))
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Classified::Invalid(_) | Classified::FatalMedia(_) => 400,
            Classified::Unauthorized(_) => 401,
            Classified::NotFound(_) => 404,
            Classified::Conflict(_) => 409,
            Classified::Transient(_) => 503,
            Classified::SoftDegrade(_) | Classified::Internal(_) => 500,
        }
    }
}

/// The tagged outcome of a single pipeline stage (spec §9 "Dynamic
/// dispatch"). Distinct from [`Classified`]: a stage can succeed, soft
/// degrade, or fail fatally/transiently, and the executor reacts
/// differently to each without unwinding through a generic `Result<_, E>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    Ok,
    /// Stage produced a partial result; the pipeline proceeds but the
    /// reason is recorded on the job/video for observability.
    SoftDegrade(String),
    /// Stage cannot succeed no matter how many times it's retried; the
    /// video moves to `failed` immediately.
    Fatal(String),
    /// Stage failed for a reason that may clear on retry; the executor's
    /// retry/DLQ bookkeeping applies.
    Transient(String),
}

impl StageResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageResult::Ok)
    }

    pub fn is_reschedule(&self) -> bool {
        matches!(self, StageResult::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_retryable_fatal_media_is_not() {
        assert!(Classified::Transient("x".into()).is_retryable());
        assert!(!Classified::FatalMedia("x".into()).is_retryable());
        assert!(Classified::FatalMedia("x".into()).is_permanent_failure());
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(Classified::NotFound("x".into()).http_status(), 404);
        assert_eq!(Classified::Transient("x".into()).http_status(), 503);
    }
}
