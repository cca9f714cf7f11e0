//! Postgres + pgvector store (spec §4.4 / §2 C1).
//!
//! One module per entity, each exposing typed CRUD functions over a shared
//! `sqlx::PgPool` rather than a repository struct, since every caller
//! already holds the pool via `Arc` in its own app state.

pub mod error;
pub mod faces;
pub mod jobs;
pub mod metadata;
pub mod pool;
pub mod scenes;
pub mod videos;

pub use error::{StoreError, StoreResult};
pub use pool::{connect, StoreConfig};
