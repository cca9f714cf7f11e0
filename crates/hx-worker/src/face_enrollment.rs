//! Face enrollment pipeline (spec §4.2): recompute a person's face centroid
//! from their enrollment photos whenever `compute_face_embedding(person_id)`
//! arrives on the face-processing stream.

use hx_models::{FaceProfile, PersonId};

use crate::error::WorkerResult;
use crate::stages::PipelineContext;

/// Download every enrollment photo, detect and embed the face in each,
/// ignore photos with no detectable face, and recompute the centroid as
/// `normalize(mean(embeddings))`.
///
/// If every photo is undetectable the profile's existing centroid (if any)
/// is left untouched — `FaceProfile::recompute_centroid` is a no-op on an
/// empty embedding set — and a structured error is logged rather than
/// stored, since `face_profiles` carries no error column for enrollment
/// failures.
pub async fn process_face_enrollment(
    ctx: &PipelineContext,
    person_id: &PersonId,
) -> WorkerResult<()> {
    let mut profile: FaceProfile = hx_store::faces::get(&ctx.store, person_id).await?;

    if profile.photo_keys.is_empty() {
        tracing::warn!(person_id = %person_id, "face profile has no enrollment photos, nothing to compute");
        return Ok(());
    }

    let mut embeddings = Vec::with_capacity(profile.photo_keys.len());
    for key in &profile.photo_keys {
        let photo = match ctx.blob.download_bytes(key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(person_id = %person_id, key, error = %e, "failed to download enrollment photo, skipping");
                continue;
            }
        };

        let faces = match ctx.inference.detect_faces(&photo).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(person_id = %person_id, key, error = %e, "face detection failed, skipping photo");
                continue;
            }
        };
        if faces.is_empty() {
            tracing::debug!(person_id = %person_id, key, "no face detected in enrollment photo, skipping");
            continue;
        }

        match ctx.inference.embed_face(&photo).await {
            Ok(v) => embeddings.push(v),
            Err(e) => {
                tracing::warn!(person_id = %person_id, key, error = %e, "face embedding failed, skipping photo");
            }
        }
    }

    if profile.recompute_centroid(&embeddings).is_none() {
        tracing::error!(
            person_id = %person_id,
            photo_count = profile.photo_keys.len(),
            "no usable face embeddings from any enrollment photo, centroid left unchanged"
        );
        return Ok(());
    }

    let face_vec = profile
        .face_vec
        .as_deref()
        .expect("recompute_centroid returned Some, so face_vec is set");
    hx_store::faces::update_centroid(&ctx.store, person_id, face_vec).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recompute_centroid_contract_matches_enrollment_expectations() {
        let mut profile = FaceProfile::new(hx_models::OwnerId::new(), "Ada");
        assert!(profile.recompute_centroid(&[]).is_none());
        assert!(profile.face_vec.is_none());

        let embeddings = vec![vec![1.0_f32, 0.0], vec![0.0, 1.0]];
        assert!(profile.recompute_centroid(&embeddings).is_some());
        assert!(profile.face_vec.is_some());
    }
}
