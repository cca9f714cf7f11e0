//! Video repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use hx_models::{OwnerId, Video, VideoId, VideoStatus};

use crate::error::{StoreError, StoreResult};

#[derive(sqlx::FromRow)]
struct VideoRow {
    video_id: Uuid,
    owner_id: Uuid,
    storage_key: String,
    mime_type: String,
    size_bytes: i64,
    duration_s: Option<f64>,
    state: String,
    error_text: Option<String>,
    created_at: DateTime<Utc>,
    indexed_at: Option<DateTime<Utc>>,
}

impl VideoRow {
    fn into_video(self) -> Video {
        Video {
            video_id: VideoId::from_uuid(self.video_id),
            owner_id: OwnerId::from(self.owner_id),
            storage_key: self.storage_key,
            mime_type: self.mime_type,
            size_bytes: self.size_bytes,
            duration_s: self.duration_s,
            state: parse_state(&self.state),
            error_text: self.error_text,
            created_at: self.created_at,
            indexed_at: self.indexed_at,
        }
    }
}

fn parse_state(s: &str) -> VideoStatus {
    match s {
        "uploading" => VideoStatus::Uploading,
        "validating" => VideoStatus::Validating,
        "processing" => VideoStatus::Processing,
        "indexed" => VideoStatus::Indexed,
        "failed" => VideoStatus::Failed,
        "deleted" => VideoStatus::Deleted,
        other => unreachable!("unknown video_state enum value: {other}"),
    }
}

pub async fn insert(pool: &PgPool, video: &Video) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO videos (video_id, owner_id, storage_key, mime_type, size_bytes, state, created_at)
        VALUES ($1, $2, $3, $4, $5, $6::video_state, $7)
        "#,
    )
    .bind(video.video_id.as_uuid())
    .bind(video.owner_id.as_uuid())
    .bind(&video.storage_key)
    .bind(&video.mime_type)
    .bind(video.size_bytes)
    .bind(video.state.as_str())
    .bind(video.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(pool: &PgPool, video_id: &VideoId) -> StoreResult<Video> {
    let row: VideoRow = sqlx::query_as(
        r#"
        SELECT video_id, owner_id, storage_key, mime_type, size_bytes,
               duration_s::float8 AS duration_s, state::text AS state, error_text, created_at, indexed_at
        FROM videos WHERE video_id = $1
        "#,
    )
    .bind(video_id.as_uuid())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::not_found(format!("video {video_id}")))?;
    Ok(row.into_video())
}

pub async fn list_for_owner(
    pool: &PgPool,
    owner_id: &OwnerId,
    limit: i64,
    offset: i64,
) -> StoreResult<Vec<Video>> {
    let rows: Vec<VideoRow> = sqlx::query_as(
        r#"
        SELECT video_id, owner_id, storage_key, mime_type, size_bytes,
               duration_s::float8 AS duration_s, state::text AS state, error_text, created_at, indexed_at
        FROM videos
        WHERE owner_id = $1 AND state != 'deleted'
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(owner_id.as_uuid())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(VideoRow::into_video).collect())
}

pub async fn set_state(pool: &PgPool, video_id: &VideoId, state: VideoStatus) -> StoreResult<()> {
    sqlx::query("UPDATE videos SET state = $1::video_state WHERE video_id = $2")
        .bind(state.as_str())
        .bind(video_id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_duration(pool: &PgPool, video_id: &VideoId, duration_s: f64) -> StoreResult<()> {
    sqlx::query("UPDATE videos SET duration_s = $1 WHERE video_id = $2")
        .bind(duration_s)
        .bind(video_id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_indexed(pool: &PgPool, video_id: &VideoId) -> StoreResult<()> {
    sqlx::query(
        "UPDATE videos SET state = 'indexed'::video_state, indexed_at = now(), error_text = NULL WHERE video_id = $1",
    )
    .bind(video_id.as_uuid())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_failed(pool: &PgPool, video_id: &VideoId, error_text: &str) -> StoreResult<()> {
    sqlx::query("UPDATE videos SET state = 'failed'::video_state, error_text = $1 WHERE video_id = $2")
        .bind(error_text)
        .bind(video_id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn soft_delete(pool: &PgPool, video_id: &VideoId) -> StoreResult<()> {
    sqlx::query("UPDATE videos SET state = 'deleted'::video_state WHERE video_id = $1")
        .bind(video_id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}
