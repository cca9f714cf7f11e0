//! Scene entity: a contiguous time span of a video with its transcript,
//! embeddings, and detected people.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::video::VideoId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SceneId(pub Uuid);

impl SceneId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SceneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SceneId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A scene as committed by the pipeline worker. Embeddings are `None` when
/// the corresponding stage soft-degraded (e.g. empty transcript never gets
/// a `text_vec`; see spec §4.1 "per_scene_embed").
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    pub scene_id: SceneId,
    pub video_id: VideoId,
    pub start_s: f64,
    pub end_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_vec: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_vec: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_tags: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidecar_key: Option<String>,
}

impl Scene {
    pub fn new(video_id: VideoId, start_s: f64, end_s: f64) -> Self {
        Self {
            scene_id: SceneId::new(),
            video_id,
            start_s,
            end_s,
            transcript: None,
            text_vec: None,
            image_vec: None,
            vision_tags: None,
            thumbnail_key: None,
            sidecar_key: None,
        }
    }

    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }

    /// True if an ASR segment `[seg_start, seg_end)` overlaps this scene.
    /// `seg_start < end_s && seg_end > start_s`, per the original ASR
    /// transcript assignment.
    pub fn overlaps_segment(&self, seg_start: f64, seg_end: f64) -> bool {
        seg_start < self.end_s && seg_end > self.start_s
    }
}

/// A detected/matched person within a scene.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScenePerson {
    pub scene_id: SceneId,
    pub person_id: crate::face::PersonId,
    pub confidence: f32,
    pub frame_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene::new(VideoId::new(), 10.0, 15.0)
    }

    #[test]
    fn overlap_requires_strict_crossing() {
        let s = scene();
        assert!(s.overlaps_segment(9.0, 11.0));
        assert!(s.overlaps_segment(14.0, 20.0));
        assert!(!s.overlaps_segment(0.0, 10.0));
        assert!(!s.overlaps_segment(15.0, 20.0));
    }

    #[test]
    fn duration_is_end_minus_start() {
        assert_eq!(scene().duration_s(), 5.0);
    }
}
