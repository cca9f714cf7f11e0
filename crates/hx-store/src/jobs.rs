//! Job repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use hx_models::{Job, JobId, JobStage, JobState, VideoId};

use crate::error::{StoreError, StoreResult};

#[derive(sqlx::FromRow)]
struct JobRow {
    job_id: Uuid,
    video_id: Uuid,
    stage: String,
    state: String,
    progress: f32,
    error_text: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl JobRow {
    fn into_job(self) -> Job {
        Job {
            job_id: JobId::from(self.job_id),
            video_id: VideoId::from_uuid(self.video_id),
            stage: parse_stage(&self.stage),
            state: parse_state(&self.state),
            progress: self.progress,
            error_text: self.error_text,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

fn parse_stage(s: &str) -> JobStage {
    JobStage::ORDER
        .into_iter()
        .find(|st| st.as_str() == s)
        .unwrap_or_else(|| unreachable!("unknown job_stage enum value: {s}"))
}

fn parse_state(s: &str) -> JobState {
    match s {
        "pending" => JobState::Pending,
        "running" => JobState::Running,
        "completed" => JobState::Completed,
        "failed" => JobState::Failed,
        "cancelled" => JobState::Cancelled,
        other => unreachable!("unknown job_state enum value: {other}"),
    }
}

pub async fn insert(pool: &PgPool, job: &Job) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO jobs (job_id, video_id, stage, state, progress)
        VALUES ($1, $2, $3::job_stage, $4::job_state, $5)
        "#,
    )
    .bind(job.job_id.as_uuid())
    .bind(job.video_id.as_uuid())
    .bind(job.stage.as_str())
    .bind(job.state.as_str())
    .bind(job.progress)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update(pool: &PgPool, job: &Job) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET state = $2::job_state, progress = $3, error_text = $4,
            started_at = $5, finished_at = $6
        WHERE job_id = $1
        "#,
    )
    .bind(job.job_id.as_uuid())
    .bind(job.state.as_str())
    .bind(job.progress)
    .bind(&job.error_text)
    .bind(job.started_at)
    .bind(job.finished_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_for_video(pool: &PgPool, video_id: &VideoId) -> StoreResult<Vec<Job>> {
    let rows: Vec<JobRow> = sqlx::query_as(
        r#"
        SELECT job_id, video_id, stage::text AS stage, state::text AS state,
               progress, error_text, started_at, finished_at
        FROM jobs WHERE video_id = $1 ORDER BY started_at NULLS LAST
        "#,
    )
    .bind(video_id.as_uuid())
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(JobRow::into_job).collect())
}

/// Jobs stuck `running` for longer than `min_idle`, used by the executor's
/// crash-recovery sweep.
pub async fn list_stale_running(
    pool: &PgPool,
    min_idle_secs: i64,
) -> StoreResult<Vec<Job>> {
    let rows: Vec<JobRow> = sqlx::query_as(
        r#"
        SELECT job_id, video_id, stage::text AS stage, state::text AS state,
               progress, error_text, started_at, finished_at
        FROM jobs
        WHERE state = 'running'
          AND started_at IS NOT NULL
          AND started_at < now() - make_interval(secs => $1)
        "#,
    )
    .bind(min_idle_secs as f64)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(JobRow::into_job).collect())
}

pub async fn get(pool: &PgPool, job_id: &JobId) -> StoreResult<Job> {
    let row: JobRow = sqlx::query_as(
        r#"
        SELECT job_id, video_id, stage::text AS stage, state::text AS state,
               progress, error_text, started_at, finished_at
        FROM jobs WHERE job_id = $1
        "#,
    )
    .bind(job_id.as_uuid())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::not_found(format!("job {job_id}")))?;
    Ok(row.into_job())
}
