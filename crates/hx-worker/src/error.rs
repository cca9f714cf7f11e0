//! Worker error types. Wraps every downstream crate's error and delegates
//! retry/failure classification to `hx_models::Classified`, following the
//! same `From<_> for Classified` pattern as `hx-store`/`hx-inference`/
//! `hx-queue`'s own error types.

use thiserror::Error;

use hx_models::error::Classified;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("job failed: {0}")]
    JobFailed(String),

    #[error("stage {stage} failed: {message}")]
    StageFailed { stage: String, message: String },

    #[error("{0}")]
    Classified(Classified),

    #[error(transparent)]
    Store(#[from] hx_store::StoreError),

    #[error(transparent)]
    Blob(#[from] hx_blob::StorageError),

    #[error(transparent)]
    Media(#[from] hx_media::MediaError),

    #[error(transparent)]
    Inference(#[from] hx_inference::InferenceError),

    #[error(transparent)]
    Queue(#[from] hx_queue::QueueError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn stage_failed(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// The classification downstream callers (retry/DLQ bookkeeping, stage
    /// transitions) actually act on. Each downstream crate's own
    /// `is_retryable()` decides the split; this just routes to the right
    /// `Classified` variant without needing to consume `self`.
    pub fn classify(&self) -> Classified {
        match self {
            WorkerError::JobFailed(m) => Classified::Internal(m.clone()),
            WorkerError::StageFailed { message, .. } => Classified::Internal(message.clone()),
            WorkerError::Classified(c) => c.clone(),
            WorkerError::Store(e) if e.is_retryable() => Classified::Transient(e.to_string()),
            WorkerError::Store(e) => match e {
                hx_store::StoreError::NotFound(m) => Classified::NotFound(m.clone()),
                hx_store::StoreError::Conflict(m) => Classified::Conflict(m.clone()),
                e => Classified::Internal(e.to_string()),
            },
            WorkerError::Blob(e) => Classified::SoftDegrade(e.to_string()),
            WorkerError::Media(e) => Classified::FatalMedia(e.to_string()),
            WorkerError::Inference(e) if e.is_retryable() => Classified::Transient(e.to_string()),
            WorkerError::Inference(e) => Classified::SoftDegrade(e.to_string()),
            WorkerError::Queue(e) if e.is_retryable() => Classified::Transient(e.to_string()),
            WorkerError::Queue(e) => Classified::Internal(e.to_string()),
            WorkerError::Io(e) => Classified::Transient(e.to_string()),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.classify().is_retryable()
    }

    pub fn is_permanent_failure(&self) -> bool {
        self.classify().is_permanent_failure()
    }
}

impl From<WorkerError> for Classified {
    fn from(e: WorkerError) -> Self {
        e.classify()
    }
}
