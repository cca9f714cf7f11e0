//! Video entity and its state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub Uuid);

impl VideoId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for VideoId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Lifecycle state of a video, driven by the pipeline worker.
///
/// `uploading -> validating -> processing -> indexed`, with `failed`
/// reachable from `validating`/`processing` and `deleted` reachable from
/// any non-deleted state. There is no path back out of `indexed`/`failed`
/// other than re-running the pipeline (which re-enters `processing`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Upload session opened, bytes not yet confirmed in blob storage.
    #[default]
    Uploading,
    /// Bytes present in blob storage; `upload_validate` stage has not run yet.
    Validating,
    /// Past validation, pipeline stages running.
    Processing,
    /// All stages committed; scenes are queryable via retrieval.
    Indexed,
    /// A stage returned a fatal result; `error_text` carries the reason.
    Failed,
    /// Soft-deleted; blob and row retained for audit, excluded from retrieval.
    Deleted,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploading => "uploading",
            VideoStatus::Validating => "validating",
            VideoStatus::Processing => "processing",
            VideoStatus::Indexed => "indexed",
            VideoStatus::Failed => "failed",
            VideoStatus::Deleted => "deleted",
        }
    }

    /// States from which a pipeline run may still be (re-)started.
    pub fn is_processable(&self) -> bool {
        matches!(
            self,
            VideoStatus::Validating | VideoStatus::Processing | VideoStatus::Failed
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Indexed | VideoStatus::Deleted)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A video owned by one [`crate::owner::OwnerId`], tracked through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Video {
    pub video_id: VideoId,
    pub owner_id: crate::owner::OwnerId,
    /// Blob key of the original upload.
    pub storage_key: String,
    pub mime_type: String,
    pub size_bytes: i64,
    /// Populated by `upload_validate`; absent before that stage runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    pub state: VideoStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<DateTime<Utc>>,
}

impl Video {
    pub fn new(
        owner_id: crate::owner::OwnerId,
        storage_key: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: i64,
    ) -> Self {
        Self {
            video_id: VideoId::new(),
            owner_id,
            storage_key: storage_key.into(),
            mime_type: mime_type.into(),
            size_bytes,
            duration_s: None,
            state: VideoStatus::Uploading,
            error_text: None,
            created_at: Utc::now(),
            indexed_at: None,
        }
    }

    pub fn mark_indexed(&mut self) {
        self.state = VideoStatus::Indexed;
        self.indexed_at = Some(Utc::now());
        self.error_text = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.state = VideoStatus::Failed;
        self.error_text = Some(error.into());
    }
}

/// Optional user-supplied metadata, separate from the pipeline's own fields.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct VideoMetadata {
    pub video_id: VideoId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::OwnerId;

    #[test]
    fn new_video_starts_uploading() {
        let v = Video::new(OwnerId::new(), "uploads/abc.mp4", "video/mp4", 1024);
        assert_eq!(v.state, VideoStatus::Uploading);
        assert!(v.duration_s.is_none());
    }

    #[test]
    fn mark_indexed_clears_error_and_stamps_time() {
        let mut v = Video::new(OwnerId::new(), "uploads/abc.mp4", "video/mp4", 1024);
        v.mark_failed("boom");
        v.mark_indexed();
        assert_eq!(v.state, VideoStatus::Indexed);
        assert!(v.error_text.is_none());
        assert!(v.indexed_at.is_some());
    }

    #[test]
    fn terminal_states_are_not_processable() {
        assert!(!VideoStatus::Indexed.is_processable());
        assert!(!VideoStatus::Deleted.is_processable());
        assert!(VideoStatus::Failed.is_processable());
    }
}
