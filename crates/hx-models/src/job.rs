//! Job definitions: one row per pipeline run, tracking which stage is
//! executing and its state.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::video::VideoId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// The eight ordered stages of the Pipeline Worker (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    UploadValidate,
    AudioExtract,
    Asr,
    SceneDetect,
    PerSceneEmbed,
    PerSceneFaceMatch,
    SidecarBuild,
    Commit,
}

impl JobStage {
    pub const ORDER: [JobStage; 8] = [
        JobStage::UploadValidate,
        JobStage::AudioExtract,
        JobStage::Asr,
        JobStage::SceneDetect,
        JobStage::PerSceneEmbed,
        JobStage::PerSceneFaceMatch,
        JobStage::SidecarBuild,
        JobStage::Commit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::UploadValidate => "upload_validate",
            JobStage::AudioExtract => "audio_extract",
            JobStage::Asr => "asr",
            JobStage::SceneDetect => "scene_detect",
            JobStage::PerSceneEmbed => "per_scene_embed",
            JobStage::PerSceneFaceMatch => "per_scene_face_match",
            JobStage::SidecarBuild => "sidecar_build",
            JobStage::Commit => "commit",
        }
    }

    /// The stage that follows this one, or `None` after `commit`.
    pub fn next(&self) -> Option<JobStage> {
        let idx = Self::ORDER.iter().position(|s| s == self)?;
        Self::ORDER.get(idx + 1).copied()
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job state in the queue/executor sense (distinct from stage outcome
/// classification, see [`crate::error::Classified`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }
}

/// One pipeline run for a video, at a given stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub job_id: JobId,
    pub video_id: VideoId,
    pub stage: JobStage,
    pub state: JobState,
    /// 0.0-1.0 fraction of the stage's own work completed.
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(video_id: VideoId, stage: JobStage) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            stage,
            state: JobState::Pending,
            progress: 0.0,
            error_text: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(mut self) -> Self {
        self.state = JobState::Running;
        self.started_at = Some(Utc::now());
        self
    }

    pub fn complete(mut self) -> Self {
        self.state = JobState::Completed;
        self.progress = 1.0;
        self.finished_at = Some(Utc::now());
        self.error_text = None;
        self
    }

    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.state = JobState::Failed;
        self.error_text = Some(error.into());
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn with_progress(mut self, progress: f32) -> Self {
        self.progress = progress.clamp(0.0, 1.0);
        self
    }

    /// Advance to the next stage as a fresh pending `Job`, or `None` if
    /// `commit` just completed.
    pub fn advance(&self) -> Option<Job> {
        self.stage.next().map(|next| Job::new(self.video_id.clone(), next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_ends_at_commit() {
        assert_eq!(JobStage::Commit.next(), None);
        assert_eq!(JobStage::UploadValidate.next(), Some(JobStage::AudioExtract));
    }

    #[test]
    fn completing_sets_full_progress() {
        let job = Job::new(VideoId::new(), JobStage::Asr).start().complete();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.progress, 1.0);
    }

    #[test]
    fn advance_yields_fresh_pending_job_for_next_stage() {
        let job = Job::new(VideoId::new(), JobStage::UploadValidate).start().complete();
        let next = job.advance().unwrap();
        assert_eq!(next.stage, JobStage::AudioExtract);
        assert_eq!(next.state, JobState::Pending);
    }
}
