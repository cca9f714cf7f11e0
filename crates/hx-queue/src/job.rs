//! Task Bus message payloads (spec §6 "Task Bus messages"). Payloads are
//! hints only — `video_id`/`person_id` — the worker always re-reads
//! authoritative state from the Store before acting on them.

use serde::{Deserialize, Serialize};

use hx_models::{PersonId, VideoId};

/// `process_video(video_id)` on queue `video_processing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVideoJob {
    pub video_id: VideoId,
}

impl ProcessVideoJob {
    pub fn new(video_id: VideoId) -> Self {
        Self { video_id }
    }

    /// Re-enqueuing the same video collapses to one in-flight task (spec
    /// §8 "Enqueuing process_video(v) after v is indexed leaves the store
    /// unchanged").
    pub fn idempotency_key(&self) -> String {
        format!("process_video:{}", self.video_id)
    }
}

/// `compute_face_embedding(person_id)` on queue `face_processing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeFaceEmbeddingJob {
    pub person_id: PersonId,
}

impl ComputeFaceEmbeddingJob {
    pub fn new(person_id: PersonId) -> Self {
        Self { person_id }
    }

    pub fn idempotency_key(&self) -> String {
        format!("compute_face_embedding:{}", self.person_id)
    }
}

/// Wrapper stored in the stream payload, tagged so one stream could in
/// principle carry either shape (the two are kept on separate streams in
/// practice; see [`crate::queue::QueueConfig`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueJob {
    ProcessVideo(ProcessVideoJob),
    ComputeFaceEmbedding(ComputeFaceEmbeddingJob),
}

impl QueueJob {
    pub fn idempotency_key(&self) -> String {
        match self {
            QueueJob::ProcessVideo(j) => j.idempotency_key(),
            QueueJob::ComputeFaceEmbedding(j) => j.idempotency_key(),
        }
    }

    pub fn video_id(&self) -> Option<&VideoId> {
        match self {
            QueueJob::ProcessVideo(j) => Some(&j.video_id),
            QueueJob::ComputeFaceEmbedding(_) => None,
        }
    }

    pub fn person_id(&self) -> Option<&PersonId> {
        match self {
            QueueJob::ProcessVideo(_) => None,
            QueueJob::ComputeFaceEmbedding(j) => Some(&j.person_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_video_serde_roundtrip() {
        let job = QueueJob::ProcessVideo(ProcessVideoJob::new(VideoId::new()));
        let json = serde_json::to_string(&job).expect("serialize");
        let decoded: QueueJob = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded.video_id(), job.video_id());
    }

    #[test]
    fn idempotency_key_is_stable_for_same_video() {
        let video_id = VideoId::new();
        let a = ProcessVideoJob::new(video_id.clone());
        let b = ProcessVideoJob::new(video_id);
        assert_eq!(a.idempotency_key(), b.idempotency_key());
    }
}
