//! Hybrid keyword/semantic/RRF retrieval engine over `hx-store` (spec §4.3).
//!
//! Consumed by `hx-api`'s search handlers as a plain library: each mode is a
//! function taking a borrowed `PgPool`/`InferenceClient` and returning a
//! `Page<ScoredScene>`, with no connection pool or cache of its own beyond
//! the `InferenceClient`'s query-embedding LRU.

pub mod canonical;
pub mod common;
pub mod error;
pub mod hybrid;
pub mod keyword;
pub mod semantic;

pub use canonical::{build_canonical_text, tags_from_json, VisionTag};
pub use common::{cosine_similarity, Page, Pagination, RetrievalFilters, ScoredScene};
pub use error::{RetrievalError, RetrievalResult};
pub use hybrid::{HybridWeights};
pub use keyword::query as query_keyword;
pub use semantic::{AnnOptions, SemanticWeights};

pub use hybrid::query as query_hybrid;
pub use semantic::query as query_semantic;
