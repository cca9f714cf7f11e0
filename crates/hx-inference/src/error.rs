//! Inference client error types.

use thiserror::Error;

pub type InferenceResult<T> = Result<T, InferenceError>;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("inference service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("inference response could not be decoded: {0}")]
    Decode(String),

    #[error("inference request timed out after {0} retries")]
    RetriesExhausted(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl InferenceError {
    /// 5xx and transport-level errors are worth retrying; 4xx never is.
    pub fn is_retryable(&self) -> bool {
        match self {
            InferenceError::Request(e) => e.is_timeout() || e.is_connect() || e.status().is_none(),
            InferenceError::Status { status, .. } => *status >= 500,
            InferenceError::RetriesExhausted(_) => false,
            InferenceError::Decode(_) | InferenceError::Io(_) => false,
        }
    }

    /// `Retry-After` seconds, if the failure carried one.
    pub fn retry_after_secs(&self) -> Option<u64> {
        None
    }
}

impl From<InferenceError> for hx_models::Classified {
    fn from(e: InferenceError) -> Self {
        if e.is_retryable() {
            hx_models::Classified::Transient(e.to_string())
        } else {
            hx_models::Classified::SoftDegrade(e.to_string())
        }
    }
}
