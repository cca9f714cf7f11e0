//! Shared data model for the heimdex indexing and retrieval core.
//!
//! This crate provides Serde/Schemars-serializable types for:
//! - Videos, scenes, and their embeddings
//! - Face profiles for the enrollment worker
//! - Jobs and the eight-stage pipeline
//! - The sidecar JSON written alongside each indexed video
//! - The shared `Classified`/`StageResult` error vocabulary
//! - Feature-flag configuration shared by every binary

pub mod config;
pub mod dims;
pub mod error;
pub mod face;
pub mod job;
pub mod owner;
pub mod scene;
pub mod sidecar;
pub mod video;

pub use config::FeatureFlags;
pub use dims::{l2_normalize, FACE_DIM, IMAGE_DIM, TEXT_DIM};
pub use error::{Classified, StageResult};
pub use face::{FaceProfile, PersonId};
pub use job::{Job, JobId, JobStage, JobState};
pub use owner::OwnerId;
pub use scene::{Scene, SceneId, ScenePerson};
pub use sidecar::{
    Sidecar, SidecarEmbeddingInfo, SidecarEmbeddings, SidecarMetadata, SidecarPerson,
    SidecarProcessingInfo, SidecarTranscript, SidecarTranscriptSegment, SIDECAR_SCHEMA_VERSION,
};
pub use video::{Video, VideoId, VideoMetadata, VideoStatus};
