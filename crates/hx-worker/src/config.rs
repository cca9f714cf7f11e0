//! Worker configuration.

use std::time::Duration;

/// Worker configuration. `StoreConfig`/`R2Config`/`InferenceConfig`/
/// `QueueConfig` are each constructed separately via their own
/// `from_env()` rather than folded in here — this struct only carries the
/// pipeline's own scheduling/concurrency knobs.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Maximum concurrent FFmpeg processes per job
    pub max_ffmpeg_processes: usize,
    /// Bound on per-scene fan-out within `per_scene_embed` and
    /// `per_scene_face_match` (spec §5, default 4)
    pub max_scene_parallel: usize,
    /// Job timeout
    pub job_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Scratch directory root for per-video working files
    pub work_dir: String,
    /// How often the worker should scan for orphaned pending jobs
    pub claim_interval: Duration,
    /// Minimum idle time before a pending job can be claimed (crash recovery)
    pub claim_min_idle: Duration,
    /// Interval for refreshing job ownership while processing (prevents premature reclamation)
    pub job_heartbeat_interval: Duration,
    /// Maximum accepted source video duration in seconds; videos longer than
    /// this fail `upload_validate` with `fatal_media` (spec §8 scenario 2)
    pub max_video_duration_s: f64,
    /// Cosine-similarity threshold for accepting a face match (spec §4.1,
    /// default 0.6)
    pub face_similarity_threshold: f32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            max_ffmpeg_processes: 4,
            max_scene_parallel: 4,
            job_timeout: Duration::from_secs(3600),
            shutdown_timeout: Duration::from_secs(30),
            work_dir: "/tmp/heimdex-worker".to_string(),
            claim_interval: Duration::from_secs(30),
            claim_min_idle: Duration::from_secs(300),
            job_heartbeat_interval: Duration::from_secs(30),
            max_video_duration_s: 7200.0,
            face_similarity_threshold: 0.6,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.max_concurrent_jobs),
            max_ffmpeg_processes: std::env::var("WORKER_MAX_FFMPEG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.max_ffmpeg_processes),
            max_scene_parallel: std::env::var("WORKER_MAX_SCENE_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.max_scene_parallel),
            job_timeout: Duration::from_secs(
                std::env::var("WORKER_JOB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(d.job_timeout.as_secs()),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(d.shutdown_timeout.as_secs()),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or(d.work_dir),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(d.claim_interval.as_secs()),
            ),
            claim_min_idle: Duration::from_secs(
                std::env::var("WORKER_CLAIM_MIN_IDLE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(d.claim_min_idle.as_secs()),
            ),
            job_heartbeat_interval: Duration::from_secs(
                std::env::var("WORKER_JOB_HEARTBEAT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(d.job_heartbeat_interval.as_secs()),
            ),
            max_video_duration_s: std::env::var("WORKER_MAX_VIDEO_DURATION_S")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.max_video_duration_s),
            face_similarity_threshold: std::env::var("WORKER_FACE_SIMILARITY_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.face_similarity_threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let c = WorkerConfig::default();
        assert_eq!(c.max_scene_parallel, 4);
        assert!((c.face_similarity_threshold - 0.6).abs() < 1e-6);
    }
}
