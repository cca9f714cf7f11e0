//! Face profile entity for the enrollment worker (C6).
//!
//! The embedding is produced by whatever model Inference exposes behind
//! `/face/embed`; in the reference deployment that model is an explicitly
//! un-trained placeholder (flatten + average-pool + L2-normalize), so
//! face-match is feature-flagged and never load-bearing for retrieval
//! correctness. See the face_enrollment/face_detection flags in
//! [`crate::config`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::owner::OwnerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PersonId(pub Uuid);

impl PersonId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PersonId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A named person profile, enrolled from one or more reference photos.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FaceProfile {
    pub person_id: PersonId,
    pub owner_id: OwnerId,
    pub name: String,
    /// Centroid of per-photo embeddings, L2-normalized. `None` until the
    /// enrollment worker has processed at least one usable photo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_vec: Option<Vec<f32>>,
    pub photo_keys: Vec<String>,
}

impl FaceProfile {
    pub fn new(owner_id: OwnerId, name: impl Into<String>) -> Self {
        Self {
            person_id: PersonId::new(),
            owner_id,
            name: name.into(),
            face_vec: None,
            photo_keys: Vec::new(),
        }
    }

    /// Recompute the centroid from per-photo embeddings and normalize it.
    /// Returns `None` if no embeddings were usable, leaving `face_vec`
    /// untouched (a re-enrollment attempt that finds every photo
    /// undetectable must not erase a previously good profile).
    pub fn recompute_centroid(&mut self, embeddings: &[Vec<f32>]) -> Option<()> {
        if embeddings.is_empty() {
            return None;
        }
        let dim = embeddings[0].len();
        let mut centroid = vec![0.0_f32; dim];
        for e in embeddings {
            for (c, v) in centroid.iter_mut().zip(e.iter()) {
                *c += v;
            }
        }
        let n = embeddings.len() as f32;
        for c in centroid.iter_mut() {
            *c /= n;
        }
        crate::dims::l2_normalize(&mut centroid);
        self.face_vec = Some(centroid);
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_of_single_embedding_is_itself_normalized() {
        let mut p = FaceProfile::new(OwnerId::new(), "Alice");
        p.recompute_centroid(&[vec![3.0, 4.0]]).unwrap();
        let v = p.face_vec.unwrap();
        let norm = (v[0] * v[0] + v[1] * v[1]).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_embeddings_leaves_existing_vec_untouched() {
        let mut p = FaceProfile::new(OwnerId::new(), "Alice");
        p.face_vec = Some(vec![1.0, 0.0]);
        assert!(p.recompute_centroid(&[]).is_none());
        assert_eq!(p.face_vec, Some(vec![1.0, 0.0]));
    }
}
