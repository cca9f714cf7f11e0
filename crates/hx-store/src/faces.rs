//! Face profile and scene-person repository.

use pgvector::Vector;
use sqlx::PgPool;
use uuid::Uuid;

use hx_models::{FaceProfile, OwnerId, PersonId, SceneId};

use crate::error::{StoreError, StoreResult};

#[derive(sqlx::FromRow)]
struct FaceProfileRow {
    person_id: Uuid,
    owner_id: Uuid,
    name: String,
    face_vec: Option<Vector>,
    photo_keys: Vec<String>,
}

impl FaceProfileRow {
    fn into_profile(self) -> FaceProfile {
        FaceProfile {
            person_id: PersonId::from(self.person_id),
            owner_id: OwnerId::from(self.owner_id),
            name: self.name,
            face_vec: self.face_vec.map(|v| v.to_vec()),
            photo_keys: self.photo_keys,
        }
    }
}

pub async fn insert(pool: &PgPool, profile: &FaceProfile) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO face_profiles (person_id, owner_id, name, photo_keys)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(profile.person_id.as_uuid())
    .bind(profile.owner_id.as_uuid())
    .bind(&profile.name)
    .bind(&profile.photo_keys)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get(pool: &PgPool, person_id: &PersonId) -> StoreResult<FaceProfile> {
    let row: FaceProfileRow = sqlx::query_as(
        "SELECT person_id, owner_id, name, face_vec, photo_keys FROM face_profiles WHERE person_id = $1",
    )
    .bind(person_id.as_uuid())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| StoreError::not_found(format!("person {person_id}")))?;
    Ok(row.into_profile())
}

pub async fn list_for_owner(pool: &PgPool, owner_id: &OwnerId) -> StoreResult<Vec<FaceProfile>> {
    let rows: Vec<FaceProfileRow> = sqlx::query_as(
        "SELECT person_id, owner_id, name, face_vec, photo_keys FROM face_profiles WHERE owner_id = $1 ORDER BY name",
    )
    .bind(owner_id.as_uuid())
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(FaceProfileRow::into_profile).collect())
}

pub async fn update_centroid(pool: &PgPool, person_id: &PersonId, face_vec: &[f32]) -> StoreResult<()> {
    sqlx::query("UPDATE face_profiles SET face_vec = $1 WHERE person_id = $2")
        .bind(Vector::from(face_vec.to_vec()))
        .bind(person_id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn add_photo_key(pool: &PgPool, person_id: &PersonId, key: &str) -> StoreResult<()> {
    sqlx::query("UPDATE face_profiles SET photo_keys = array_append(photo_keys, $1) WHERE person_id = $2")
        .bind(key)
        .bind(person_id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, person_id: &PersonId) -> StoreResult<()> {
    sqlx::query("DELETE FROM face_profiles WHERE person_id = $1")
        .bind(person_id.as_uuid())
        .execute(pool)
        .await?;
    Ok(())
}

/// Upsert a scene-person match. Re-matching an already-processed scene is
/// idempotent: the conflict clause overwrites confidence/frame_count rather
/// than duplicating the row.
pub async fn upsert_scene_person(
    pool: &PgPool,
    scene_id: &SceneId,
    person_id: &PersonId,
    confidence: f32,
    frame_count: i32,
) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO scene_people (scene_id, person_id, confidence, frame_count)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (scene_id, person_id)
        DO UPDATE SET confidence = EXCLUDED.confidence, frame_count = EXCLUDED.frame_count
        "#,
    )
    .bind(scene_id.as_uuid())
    .bind(person_id.as_uuid())
    .bind(confidence)
    .bind(frame_count)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn people_in_scene(pool: &PgPool, scene_id: &SceneId) -> StoreResult<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT person_id FROM scene_people WHERE scene_id = $1")
            .bind(scene_id.as_uuid())
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// A matched person's name/confidence/frame_count for one scene, as the
/// sidecar document needs (`sidecar_build` joins `scene_people` against
/// `face_profiles` for the display name).
#[derive(Debug, Clone)]
pub struct ScenePersonMatch {
    pub person_id: Uuid,
    pub name: String,
    pub confidence: f32,
    pub frame_count: i32,
}

pub async fn people_with_names_in_scene(
    pool: &PgPool,
    scene_id: &SceneId,
) -> StoreResult<Vec<ScenePersonMatch>> {
    let rows: Vec<(Uuid, String, f32, i32)> = sqlx::query_as(
        r#"
        SELECT fp.person_id, fp.name, sp.confidence, sp.frame_count
        FROM scene_people sp
        JOIN face_profiles fp ON fp.person_id = sp.person_id
        WHERE sp.scene_id = $1
        ORDER BY sp.confidence DESC
        "#,
    )
    .bind(scene_id.as_uuid())
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(person_id, name, confidence, frame_count)| ScenePersonMatch {
            person_id,
            name,
            confidence,
            frame_count,
        })
        .collect())
}
