//! Axum HTTP API surface (spec §2 C8, §6).
//!
//! Thin by design: every handler validates its request, then delegates to
//! `hx-store`/`hx-blob`/`hx-queue`/`hx-retrieval` for the actual work. The
//! pipeline and retrieval engine are the hard engineering; this crate only
//! wires them to HTTP.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
