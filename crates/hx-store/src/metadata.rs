//! Video metadata repository (title/description/tags), the optional 1:1
//! extension table Mode K's metadata scoring reads from.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use hx_models::{VideoId, VideoMetadata};

use crate::error::StoreResult;

#[derive(sqlx::FromRow)]
struct MetadataRow {
    video_id: Uuid,
    title: Option<String>,
    description: Option<String>,
    tags: Option<Value>,
}

impl MetadataRow {
    fn into_metadata(self) -> VideoMetadata {
        let tags = self
            .tags
            .and_then(|v| serde_json::from_value::<Vec<String>>(v).ok())
            .unwrap_or_default();
        VideoMetadata {
            video_id: VideoId::from_uuid(self.video_id),
            title: self.title,
            description: self.description,
            tags,
        }
    }
}

/// Upsert metadata for a video. Called by the API on video create/update,
/// never by the pipeline (spec §3 "not required for the pipeline").
pub async fn upsert(pool: &PgPool, metadata: &VideoMetadata) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO video_metadata (video_id, title, description, tags)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (video_id)
        DO UPDATE SET title = EXCLUDED.title, description = EXCLUDED.description, tags = EXCLUDED.tags
        "#,
    )
    .bind(metadata.video_id.as_uuid())
    .bind(&metadata.title)
    .bind(&metadata.description)
    .bind(serde_json::to_value(&metadata.tags).ok())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(pool: &PgPool, video_id: &VideoId) -> StoreResult<Option<VideoMetadata>> {
    let row: Option<MetadataRow> = sqlx::query_as(
        "SELECT video_id, title, description, tags FROM video_metadata WHERE video_id = $1",
    )
    .bind(video_id.as_uuid())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(MetadataRow::into_metadata))
}

/// Fetch metadata for every indexed, owner-scoped video in one round trip,
/// keyed by video id, for Mode K's scoring pass.
pub async fn map_for_owner(
    pool: &PgPool,
    owner_id: &Uuid,
) -> StoreResult<std::collections::HashMap<Uuid, VideoMetadata>> {
    let rows: Vec<MetadataRow> = sqlx::query_as(
        r#"
        SELECT m.video_id, m.title, m.description, m.tags
        FROM video_metadata m
        JOIN videos v ON v.video_id = m.video_id
        WHERE v.owner_id = $1
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| {
            let m = r.into_metadata();
            (m.video_id.as_uuid(), m)
        })
        .collect())
}
