//! Task Bus over Redis Streams (spec §2 C4, §6 "Task Bus messages").
//!
//! Two streams, one consumer group apiece: `video_processing` carries
//! [`crate::job::ProcessVideoJob`], `face_processing` carries
//! [`crate::job::ComputeFaceEmbeddingJob`]. Both go through the same
//! enqueue/consume/ack/dlq/claim plumbing, parameterized by stream name.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::job::QueueJob;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    pub video_stream: String,
    pub face_stream: String,
    pub consumer_group: String,
    pub dlq_stream_suffix: String,
    pub max_retries: u32,
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            video_stream: "video_processing".to_string(),
            face_stream: "face_processing".to_string(),
            consumer_group: "hx:workers".to_string(),
            dlq_stream_suffix: ":dlq".to_string(),
            max_retries: 3,
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            video_stream: std::env::var("QUEUE_VIDEO_STREAM")
                .unwrap_or_else(|_| "video_processing".to_string()),
            face_stream: std::env::var("QUEUE_FACE_STREAM")
                .unwrap_or_else(|_| "face_processing".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "hx:workers".to_string()),
            dlq_stream_suffix: std::env::var("QUEUE_DLQ_SUFFIX")
                .unwrap_or_else(|_| ":dlq".to_string()),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// Which of the two streams a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    VideoProcessing,
    FaceProcessing,
}

pub struct JobQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    fn stream_name(&self, stream: Stream) -> &str {
        match stream {
            Stream::VideoProcessing => &self.config.video_stream,
            Stream::FaceProcessing => &self.config.face_stream,
        }
    }

    fn dlq_name(&self, stream: Stream) -> String {
        format!("{}{}", self.stream_name(stream), self.config.dlq_stream_suffix)
    }

    /// Create both consumer groups (ignores BUSYGROUP if already present).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        for stream in [Stream::VideoProcessing, Stream::FaceProcessing] {
            let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
                .arg("CREATE")
                .arg(self.stream_name(stream))
                .arg(&self.config.consumer_group)
                .arg("$")
                .arg("MKSTREAM")
                .query_async(&mut conn)
                .await;
            match result {
                Ok(_) => info!(stream = self.stream_name(stream), "created consumer group"),
                Err(e) if e.to_string().contains("BUSYGROUP") => {
                    debug!(stream = self.stream_name(stream), "consumer group already exists");
                }
                Err(e) => return Err(QueueError::Redis(e)),
            }
        }
        Ok(())
    }

    pub async fn enqueue_process_video(&self, job: QueueJob) -> QueueResult<String> {
        self.enqueue(Stream::VideoProcessing, job).await
    }

    pub async fn enqueue_face_embedding(&self, job: QueueJob) -> QueueResult<String> {
        self.enqueue(Stream::FaceProcessing, job).await
    }

    /// Enqueue a job, rejecting it if its idempotency key is already
    /// in flight (spec §8 "enqueuing the same key twice... leaves the
    /// store unchanged").
    async fn enqueue(&self, stream: Stream, job: QueueJob) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let payload = serde_json::to_string(&job)?;
        let idempotency_key = job.idempotency_key();
        let dedup_key = format!("hx:dedup:{idempotency_key}");

        let exists: bool = conn.exists(&dedup_key).await?;
        if exists {
            warn!(key = %idempotency_key, "duplicate job rejected");
            return Err(QueueError::enqueue_failed("duplicate job"));
        }

        let message_id: String = redis::cmd("XADD")
            .arg(self.stream_name(stream))
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("key")
            .arg(&idempotency_key)
            .query_async(&mut conn)
            .await?;

        conn.set_ex::<_, _, ()>(&dedup_key, "1", 3600).await?;

        info!(key = %idempotency_key, message_id = %message_id, "enqueued job");
        Ok(message_id)
    }

    pub async fn ack(&self, stream: Stream, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("XACK")
            .arg(self.stream_name(stream))
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;
        redis::cmd("XDEL")
            .arg(self.stream_name(stream))
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;
        debug!(message_id = %message_id, "acknowledged job");
        Ok(())
    }

    /// Clear the dedup key so the same video/person can be re-enqueued
    /// after this attempt concludes (success or DLQ).
    pub async fn clear_dedup(&self, job: &QueueJob) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let dedup_key = format!("hx:dedup:{}", job.idempotency_key());
        conn.del::<_, ()>(&dedup_key).await?;
        Ok(())
    }

    pub async fn dlq(
        &self,
        stream: Stream,
        message_id: &str,
        job: &QueueJob,
        error: &str,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(job)?;
        redis::cmd("XADD")
            .arg(self.dlq_name(stream))
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;
        self.ack(stream, message_id).await?;
        warn!(key = %job.idempotency_key(), error, "moved job to DLQ");
        Ok(())
    }

    pub async fn len(&self, stream: Stream) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.xlen(self.stream_name(stream)).await?)
    }

    pub async fn dlq_len(&self, stream: Stream) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.xlen(self.dlq_name(stream)).await?)
    }

    pub async fn consume(
        &self,
        stream: Stream,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, QueueJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(self.stream_name(stream))
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();
        for stream_key in result.keys {
            for entry in stream_key.ids {
                let message_id = entry.id.clone();
                if let Some(redis::Value::BulkString(payload)) = entry.map.get("job") {
                    let payload_str = String::from_utf8_lossy(payload);
                    match serde_json::from_str::<QueueJob>(&payload_str) {
                        Ok(job) => jobs.push((message_id, job)),
                        Err(e) => {
                            warn!(error = %e, "failed to parse job payload, acking to drop it");
                            self.ack(stream, &message_id).await.ok();
                        }
                    }
                }
            }
        }
        Ok(jobs)
    }

    /// Claim pending entries idle longer than `min_idle_ms`, for recovery
    /// after a worker crash (spec §4.1 "stale claim sweep").
    pub async fn claim_pending(
        &self,
        stream: Stream,
        consumer_name: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, QueueJob)>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let pending_count: usize = redis::cmd("XPENDING")
            .arg(self.stream_name(stream))
            .arg(&self.config.consumer_group)
            .query_async(&mut conn)
            .await
            .map(|reply: redis::streams::StreamPendingReply| reply.count())
            .unwrap_or(0);
        if pending_count == 0 {
            return Ok(Vec::new());
        }

        let pending_details: Vec<Vec<redis::Value>> = redis::cmd("XPENDING")
            .arg(self.stream_name(stream))
            .arg(&self.config.consumer_group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut message_ids_to_claim = Vec::new();
        for detail in pending_details {
            if detail.len() >= 4 {
                if let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Int(idle_ms))) =
                    (detail.first(), detail.get(2))
                {
                    let idle_ms = *idle_ms as u64;
                    if idle_ms >= min_idle_ms {
                        if let Ok(id) = String::from_utf8(id_bytes.clone()) {
                            message_ids_to_claim.push(id);
                        }
                    }
                }
            }
        }
        if message_ids_to_claim.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(self.stream_name(stream))
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms);
        for msg_id in &message_ids_to_claim {
            cmd.arg(msg_id);
        }
        let claimed_messages: Vec<Vec<redis::Value>> = cmd.query_async(&mut conn).await?;

        let mut jobs = Vec::new();
        for message in claimed_messages {
            if message.len() < 2 {
                continue;
            }
            let (Some(redis::Value::BulkString(id_bytes)), Some(redis::Value::Array(fields))) =
                (message.first(), message.get(1))
            else {
                continue;
            };
            let Ok(message_id) = String::from_utf8(id_bytes.clone()) else {
                continue;
            };

            let mut job_payload: Option<String> = None;
            let mut i = 0;
            while i + 1 < fields.len() {
                if let (
                    Some(redis::Value::BulkString(field_bytes)),
                    Some(redis::Value::BulkString(value_bytes)),
                ) = (fields.get(i), fields.get(i + 1))
                {
                    if let (Ok(field), Ok(value)) = (
                        String::from_utf8(field_bytes.clone()),
                        String::from_utf8(value_bytes.clone()),
                    ) {
                        if field == "job" {
                            job_payload = Some(value);
                            break;
                        }
                    }
                }
                i += 2;
            }

            if let Some(payload) = job_payload {
                match serde_json::from_str::<QueueJob>(&payload) {
                    Ok(job) => {
                        info!(key = %job.idempotency_key(), "claimed pending job");
                        jobs.push((message_id, job));
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to parse claimed job payload");
                        self.ack(stream, &message_id).await.ok();
                    }
                }
            }
        }
        Ok(jobs)
    }

    pub async fn get_retry_count(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("hx:retry:{message_id}");
        let count: Option<u32> = conn.get(&key).await?;
        Ok(count.unwrap_or(0))
    }

    pub async fn increment_retry(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("hx:retry:{message_id}");
        let count: u32 = conn.incr(&key, 1).await?;
        conn.expire::<_, ()>(&key, 86400).await?;
        Ok(count)
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Reset the idle timer for a message still being worked on, so the
    /// stale-claim sweep does not reclaim it mid-flight.
    pub async fn refresh_visibility(
        &self,
        stream: Stream,
        consumer_name: &str,
        message_id: &str,
    ) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _res: redis::Value = redis::cmd("XCLAIM")
            .arg(self.stream_name(stream))
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(0)
            .arg(message_id)
            .arg("JUSTID")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    pub fn visibility_timeout(&self) -> Duration {
        self.config.visibility_timeout
    }
}
