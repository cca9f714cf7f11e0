//! Retrieval error types. Mirrors `hx_store::StoreError`/
//! `hx_inference::InferenceError`'s `From<_> for Classified` pattern so the
//! API layer's `IntoResponse` impl speaks the one shared vocabulary.

use thiserror::Error;

pub type RetrievalResult<T> = Result<T, RetrievalError>;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("invalid query: {0}")]
    Invalid(String),

    #[error("{0} is disabled")]
    FeatureDisabled(&'static str),

    #[error(transparent)]
    Store(#[from] hx_store::StoreError),

    #[error(transparent)]
    Inference(#[from] hx_inference::InferenceError),
}

impl From<RetrievalError> for hx_models::Classified {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::Invalid(m) => hx_models::Classified::Invalid(m),
            RetrievalError::FeatureDisabled(m) => hx_models::Classified::Invalid(format!("{m} is disabled")),
            RetrievalError::Store(e) => e.into(),
            RetrievalError::Inference(e) => e.into(),
        }
    }
}
