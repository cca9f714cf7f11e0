//! Store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Database(e) if matches!(e, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
        )
    }
}

impl From<StoreError> for hx_models::Classified {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(m) => hx_models::Classified::NotFound(m),
            StoreError::Conflict(m) => hx_models::Classified::Conflict(m),
            e if e.is_retryable() => hx_models::Classified::Transient(e.to_string()),
            e => hx_models::Classified::Internal(e.to_string()),
        }
    }
}
