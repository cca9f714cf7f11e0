//! Job executors that consume the Task Bus and drive the two worker
//! pipelines (spec §2 C4 / §4.1 / §4.2): video indexing on
//! `Stream::VideoProcessing`, face-profile recompute on
//! `Stream::FaceProcessing`. Both follow the same consume/execute/ack/
//! retry/DLQ shape, parameterized by stream and job-processing function.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use hx_queue::{JobQueue, QueueJob, Stream};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::face_enrollment;
use crate::stages::{self, PipelineContext};

/// How often the claim-pending sweep runs (spec §4.1 "stale claim sweep").
const CLAIM_INTERVAL: Duration = Duration::from_secs(60);
/// Minimum idle time before a pending entry is reclaimed from a dead consumer.
const CLAIM_MIN_IDLE_MS: u64 = 1_800_000;

/// Consumes `process_video` jobs and runs the 8-stage indexing pipeline.
pub struct PipelineExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    ctx: Arc<PipelineContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl PipelineExecutor {
    pub fn new(config: WorkerConfig, queue: JobQueue, ctx: PipelineContext) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("hx-worker-video-{}", Uuid::new_v4());
        Self {
            config,
            queue: Arc::new(queue),
            ctx: Arc::new(ctx),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    pub async fn run(&self) -> WorkerResult<()> {
        info!(consumer = %self.consumer_name, max_jobs = self.config.max_concurrent_jobs, "starting video pipeline executor");

        let mut shutdown_rx = self.shutdown.subscribe();
        let claim_task = self.spawn_claim_task();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("shutdown signal received, stopping video pipeline executor");
                        break;
                    }
                }
                result = self.consume_once() => {
                    if let Err(e) = result {
                        error!(error = %e, "error consuming video_processing stream");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();
        info!("waiting for in-flight video jobs to complete");
        let _ = tokio::time::timeout(Duration::from_secs(60), self.wait_for_jobs()).await;
        info!("video pipeline executor stopped");
        Ok(())
    }

    fn spawn_claim_task(&self) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let ctx = Arc::clone(&self.ctx);
        let semaphore = Arc::clone(&self.job_semaphore);
        let consumer_name = self.consumer_name.clone();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLAIM_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match queue.claim_pending(Stream::VideoProcessing, &consumer_name, CLAIM_MIN_IDLE_MS, 5).await {
                            Ok(jobs) if !jobs.is_empty() => {
                                info!(count = jobs.len(), "claimed stale video_processing jobs");
                                for (message_id, job) in jobs {
                                    spawn_video_job(Arc::clone(&ctx), Arc::clone(&queue), Arc::clone(&semaphore), message_id, job).await;
                                }
                            }
                            Ok(_) => {}
                            Err(e) => warn!(error = %e, "failed to claim pending video_processing jobs"),
                        }
                    }
                }
            }
        })
    }

    async fn consume_once(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(Stream::VideoProcessing, &self.consumer_name, 1000, available.min(5))
            .await?;
        if jobs.is_empty() {
            return Ok(());
        }
        debug!(count = jobs.len(), "consumed video_processing jobs");

        for (message_id, job) in jobs {
            spawn_video_job(Arc::clone(&self.ctx), Arc::clone(&self.queue), Arc::clone(&self.job_semaphore), message_id, job).await;
        }
        Ok(())
    }

    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

async fn spawn_video_job(
    ctx: Arc<PipelineContext>,
    queue: Arc<JobQueue>,
    semaphore: Arc<Semaphore>,
    message_id: String,
    job: QueueJob,
) {
    let Some(video_id) = job.video_id().cloned() else {
        warn!(message_id = %message_id, "video_processing stream carried a non-video job, acking to drop it");
        queue.ack(Stream::VideoProcessing, &message_id).await.ok();
        return;
    };

    let permit = match semaphore.acquire_owned().await {
        Ok(p) => p,
        Err(_) => return,
    };

    tokio::spawn(async move {
        let _permit = permit;
        info!(video_id = %video_id, "processing video");
        match stages::run_pipeline(&ctx, &video_id).await {
            Ok(()) => {
                info!(video_id = %video_id, "video pipeline completed");
                queue.ack(Stream::VideoProcessing, &message_id).await.ok();
                queue.clear_dedup(&job).await.ok();
            }
            Err(e) => handle_failure(&queue, Stream::VideoProcessing, &message_id, &job, &e.to_string()).await,
        }
    });
}

/// Consumes `compute_face_embedding` jobs and recomputes face centroids.
pub struct FaceEnrollmentExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    ctx: Arc<PipelineContext>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl FaceEnrollmentExecutor {
    pub fn new(config: WorkerConfig, queue: JobQueue, ctx: PipelineContext) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("hx-worker-face-{}", Uuid::new_v4());
        Self {
            config,
            queue: Arc::new(queue),
            ctx: Arc::new(ctx),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    pub async fn run(&self) -> WorkerResult<()> {
        info!(consumer = %self.consumer_name, "starting face enrollment executor");

        let mut shutdown_rx = self.shutdown.subscribe();
        let claim_task = self.spawn_claim_task();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("shutdown signal received, stopping face enrollment executor");
                        break;
                    }
                }
                result = self.consume_once() => {
                    if let Err(e) = result {
                        error!(error = %e, "error consuming face_processing stream");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        claim_task.abort();
        let _ = tokio::time::timeout(Duration::from_secs(60), self.wait_for_jobs()).await;
        info!("face enrollment executor stopped");
        Ok(())
    }

    fn spawn_claim_task(&self) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let ctx = Arc::clone(&self.ctx);
        let semaphore = Arc::clone(&self.job_semaphore);
        let consumer_name = self.consumer_name.clone();
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLAIM_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match queue.claim_pending(Stream::FaceProcessing, &consumer_name, CLAIM_MIN_IDLE_MS, 5).await {
                            Ok(jobs) if !jobs.is_empty() => {
                                info!(count = jobs.len(), "claimed stale face_processing jobs");
                                for (message_id, job) in jobs {
                                    spawn_face_job(Arc::clone(&ctx), Arc::clone(&queue), Arc::clone(&semaphore), message_id, job).await;
                                }
                            }
                            Ok(_) => {}
                            Err(e) => warn!(error = %e, "failed to claim pending face_processing jobs"),
                        }
                    }
                }
            }
        })
    }

    async fn consume_once(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(Stream::FaceProcessing, &self.consumer_name, 1000, available.min(5))
            .await?;
        if jobs.is_empty() {
            return Ok(());
        }
        debug!(count = jobs.len(), "consumed face_processing jobs");

        for (message_id, job) in jobs {
            spawn_face_job(Arc::clone(&self.ctx), Arc::clone(&self.queue), Arc::clone(&self.job_semaphore), message_id, job).await;
        }
        Ok(())
    }

    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

async fn spawn_face_job(
    ctx: Arc<PipelineContext>,
    queue: Arc<JobQueue>,
    semaphore: Arc<Semaphore>,
    message_id: String,
    job: QueueJob,
) {
    let Some(person_id) = job.person_id().copied() else {
        warn!(message_id = %message_id, "face_processing stream carried a non-face job, acking to drop it");
        queue.ack(Stream::FaceProcessing, &message_id).await.ok();
        return;
    };

    let permit = match semaphore.acquire_owned().await {
        Ok(p) => p,
        Err(_) => return,
    };

    tokio::spawn(async move {
        let _permit = permit;
        info!(person_id = %person_id, "recomputing face profile");
        match face_enrollment::process_face_enrollment(&ctx, &person_id).await {
            Ok(()) => {
                info!(person_id = %person_id, "face profile recompute completed");
                queue.ack(Stream::FaceProcessing, &message_id).await.ok();
                queue.clear_dedup(&job).await.ok();
            }
            Err(e) => handle_failure(&queue, Stream::FaceProcessing, &message_id, &job, &e.to_string()).await,
        }
    });
}

/// Shared retry/DLQ bookkeeping: a job that keeps failing past
/// `max_retries` moves to that stream's DLQ; otherwise it is left
/// unacked to be redelivered after the visibility timeout.
async fn handle_failure(queue: &JobQueue, stream: Stream, message_id: &str, job: &QueueJob, error: &str) {
    error!(message_id = %message_id, error, "job failed");

    let retry_count = queue.increment_retry(message_id).await.unwrap_or(u32::MAX);
    let max_retries = queue.max_retries();

    if retry_count >= max_retries {
        warn!(message_id = %message_id, retry_count, max_retries, "exceeded max retries, moving to DLQ");
        if let Err(e) = queue.dlq(stream, message_id, job, error).await {
            error!(message_id = %message_id, error = %e, "failed to move job to DLQ");
        }
        queue.clear_dedup(job).await.ok();
    } else {
        info!(message_id = %message_id, retry_count, max_retries, "job will be retried");
    }
}
