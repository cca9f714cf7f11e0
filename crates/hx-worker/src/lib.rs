#![deny(unreachable_patterns)]
//! Video-indexing and face-enrollment worker.
//!
//! This crate provides:
//! - Job executors for the video pipeline and face-embedding jobs
//! - The eight-stage pipeline itself
//! - Per-job structured logging
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod face_enrollment;
pub mod logging;
pub mod scratch;
pub mod stages;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{FaceEnrollmentExecutor, PipelineExecutor};
pub use logging::JobLogger;
pub use scratch::ScratchDir;
pub use stages::PipelineContext;
