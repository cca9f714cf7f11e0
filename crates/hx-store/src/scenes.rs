//! Scene repository, including the pgvector-bound embedding columns.

use pgvector::Vector;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use hx_models::{Scene, SceneId, VideoId};

use crate::error::{StoreError, StoreResult};

#[derive(sqlx::FromRow)]
struct SceneRow {
    scene_id: Uuid,
    video_id: Uuid,
    start_s: f64,
    end_s: f64,
    transcript: Option<String>,
    text_vec: Option<Vector>,
    image_vec: Option<Vector>,
    vision_tags: Option<Value>,
    thumbnail_key: Option<String>,
    sidecar_key: Option<String>,
}

impl SceneRow {
    fn into_scene(self) -> Scene {
        Scene {
            scene_id: SceneId::from(self.scene_id),
            video_id: VideoId::from_uuid(self.video_id),
            start_s: self.start_s,
            end_s: self.end_s,
            transcript: self.transcript,
            text_vec: self.text_vec.map(|v| v.to_vec()),
            image_vec: self.image_vec.map(|v| v.to_vec()),
            vision_tags: self.vision_tags,
            thumbnail_key: self.thumbnail_key,
            sidecar_key: self.sidecar_key,
        }
    }
}

pub async fn insert(pool: &PgPool, scene: &Scene) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO scenes (scene_id, video_id, start_s, end_s, transcript,
                             text_vec, image_vec, vision_tags, thumbnail_key, sidecar_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(scene.scene_id.as_uuid())
    .bind(scene.video_id.as_uuid())
    .bind(scene.start_s)
    .bind(scene.end_s)
    .bind(&scene.transcript)
    .bind(scene.text_vec.clone().map(Vector::from))
    .bind(scene.image_vec.clone().map(Vector::from))
    .bind(&scene.vision_tags)
    .bind(&scene.thumbnail_key)
    .bind(&scene.sidecar_key)
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert every scene of one video in a single transaction, so retrieval
/// never observes a partially-indexed video (spec §4.1 ordering guarantee).
pub async fn insert_batch(pool: &PgPool, scenes: &[Scene]) -> StoreResult<()> {
    let mut tx = pool.begin().await?;
    for scene in scenes {
        sqlx::query(
            r#"
            INSERT INTO scenes (scene_id, video_id, start_s, end_s, transcript,
                                 text_vec, image_vec, vision_tags, thumbnail_key, sidecar_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(scene.scene_id.as_uuid())
        .bind(scene.video_id.as_uuid())
        .bind(scene.start_s)
        .bind(scene.end_s)
        .bind(&scene.transcript)
        .bind(scene.text_vec.clone().map(Vector::from))
        .bind(scene.image_vec.clone().map(Vector::from))
        .bind(&scene.vision_tags)
        .bind(&scene.thumbnail_key)
        .bind(&scene.sidecar_key)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn list_for_video(pool: &PgPool, video_id: &VideoId) -> StoreResult<Vec<Scene>> {
    let rows: Vec<SceneRow> = sqlx::query_as(
        r#"
        SELECT scene_id, video_id, start_s::float8 AS start_s, end_s::float8 AS end_s,
               transcript, text_vec, image_vec, vision_tags, thumbnail_key, sidecar_key
        FROM scenes WHERE video_id = $1 ORDER BY start_s
        "#,
    )
    .bind(video_id.as_uuid())
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(SceneRow::into_scene).collect())
}

pub async fn get(pool: &PgPool, scene_id: &SceneId) -> StoreResult<Scene> {
    let row: SceneRow = sqlx::query_as(
        r#"
        SELECT scene_id, video_id, start_s::float8 AS start_s, end_s::float8 AS end_s,
               transcript, text_vec, image_vec, vision_tags, thumbnail_key, sidecar_key
        FROM scenes WHERE scene_id = $1
        "#,
    )
    .bind(scene_id.as_uuid())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::not_found(format!("scene {scene_id}")))?;
    Ok(row.into_scene())
}

/// Keyword search over `tsv` (Mode K). Returns `(scene_id, video_id,
/// ts_rank)` ordered by rank, scoped to one owner's indexed videos.
pub async fn keyword_search(
    pool: &PgPool,
    owner_id: &Uuid,
    query: &str,
    limit: i64,
) -> StoreResult<Vec<(Uuid, Uuid, f32)>> {
    let rows: Vec<(Uuid, Uuid, f32)> = sqlx::query_as(
        r#"
        SELECT s.scene_id, s.video_id, ts_rank(s.tsv, plainto_tsquery('english', $2))::float4 AS rank
        FROM scenes s
        JOIN videos v ON v.video_id = s.video_id
        WHERE v.owner_id = $1 AND v.state = 'indexed'
          AND s.tsv @@ plainto_tsquery('english', $2)
        ORDER BY rank DESC
        LIMIT $3
        "#,
    )
    .bind(owner_id)
    .bind(query)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Dense nearest-neighbor search over `text_vec` (Mode S, text leg).
/// `ef_search` is applied by the caller via `SET LOCAL` before running this
/// in the same transaction.
pub async fn text_vec_search(
    pool: &PgPool,
    owner_id: &Uuid,
    query_vec: &[f32],
    limit: i64,
) -> StoreResult<Vec<(Uuid, Uuid, f32)>> {
    let rows: Vec<(Uuid, Uuid, f32)> = sqlx::query_as(
        r#"
        SELECT s.scene_id, s.video_id, (1 - (s.text_vec <=> $2))::float4 AS similarity
        FROM scenes s
        JOIN videos v ON v.video_id = s.video_id
        WHERE v.owner_id = $1 AND v.state = 'indexed' AND s.text_vec IS NOT NULL
        ORDER BY s.text_vec <=> $2
        LIMIT $3
        "#,
    )
    .bind(owner_id)
    .bind(Vector::from(query_vec.to_vec()))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Dense nearest-neighbor search over `image_vec` (Mode S, vision leg).
pub async fn image_vec_search(
    pool: &PgPool,
    owner_id: &Uuid,
    query_vec: &[f32],
    limit: i64,
) -> StoreResult<Vec<(Uuid, Uuid, f32)>> {
    let rows: Vec<(Uuid, Uuid, f32)> = sqlx::query_as(
        r#"
        SELECT s.scene_id, s.video_id, (1 - (s.image_vec <=> $2))::float4 AS similarity
        FROM scenes s
        JOIN videos v ON v.video_id = s.video_id
        WHERE v.owner_id = $1 AND v.state = 'indexed' AND s.image_vec IS NOT NULL
        ORDER BY s.image_vec <=> $2
        LIMIT $3
        "#,
    )
    .bind(owner_id)
    .bind(Vector::from(query_vec.to_vec()))
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn set_ef_search(pool: &PgPool, ef_search: i32) -> StoreResult<()> {
    sqlx::query(&format!("SET hnsw.ef_search = {ef_search}"))
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn attach_sidecar_key(pool: &PgPool, scene_id: &SceneId, key: &str) -> StoreResult<()> {
    sqlx::query("UPDATE scenes SET sidecar_key = $1 WHERE scene_id = $2")
        .bind(key)
        .bind(scene_id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn attach_thumbnail_key(pool: &PgPool, scene_id: &SceneId, key: &str) -> StoreResult<()> {
    sqlx::query("UPDATE scenes SET thumbnail_key = $1 WHERE scene_id = $2")
        .bind(key)
        .bind(scene_id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// One candidate scene plus the parent video's `created_at`/`duration_s`,
/// for retrieval's common scope/filter/tie-break needs (spec §4.3).
pub struct CandidateScene {
    pub scene: Scene,
    pub video_created_at: chrono::DateTime<chrono::Utc>,
    pub video_duration_s: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct CandidateRow {
    scene_id: Uuid,
    video_id: Uuid,
    start_s: f64,
    end_s: f64,
    transcript: Option<String>,
    text_vec: Option<Vector>,
    image_vec: Option<Vector>,
    vision_tags: Option<Value>,
    thumbnail_key: Option<String>,
    sidecar_key: Option<String>,
    video_created_at: chrono::DateTime<chrono::Utc>,
    video_duration_s: Option<f64>,
}

/// All scenes of one owner's `indexed` videos, optionally scoped to a
/// person (requires a `scene_people` edge) and/or a video-duration range.
/// Used as the common candidate set for Modes K, S, and H, each of which
/// applies its own scoring/ranking in the retrieval engine.
pub async fn list_candidates_for_owner(
    pool: &PgPool,
    owner_id: &Uuid,
    person_id: Option<Uuid>,
    min_duration_s: Option<f64>,
    max_duration_s: Option<f64>,
) -> StoreResult<Vec<CandidateScene>> {
    let rows: Vec<CandidateRow> = sqlx::query_as(
        r#"
        SELECT s.scene_id, s.video_id, s.start_s::float8 AS start_s, s.end_s::float8 AS end_s,
               s.transcript, s.text_vec, s.image_vec, s.vision_tags, s.thumbnail_key, s.sidecar_key,
               v.created_at AS video_created_at, v.duration_s::float8 AS video_duration_s
        FROM scenes s
        JOIN videos v ON v.video_id = s.video_id
        WHERE v.owner_id = $1 AND v.state = 'indexed'
          AND ($2::uuid IS NULL OR EXISTS (
                SELECT 1 FROM scene_people sp WHERE sp.scene_id = s.scene_id AND sp.person_id = $2
              ))
          AND ($3::float8 IS NULL OR v.duration_s >= $3)
          AND ($4::float8 IS NULL OR v.duration_s <= $4)
        "#,
    )
    .bind(owner_id)
    .bind(person_id)
    .bind(min_duration_s)
    .bind(max_duration_s)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| CandidateScene {
            scene: Scene {
                scene_id: SceneId::from(r.scene_id),
                video_id: VideoId::from_uuid(r.video_id),
                start_s: r.start_s,
                end_s: r.end_s,
                transcript: r.transcript,
                text_vec: r.text_vec.map(|v| v.to_vec()),
                image_vec: r.image_vec.map(|v| v.to_vec()),
                vision_tags: r.vision_tags,
                thumbnail_key: r.thumbnail_key,
                sidecar_key: r.sidecar_key,
            },
            video_created_at: r.video_created_at,
            video_duration_s: r.video_duration_s,
        })
        .collect())
}
