//! Sidecar JSON: the per-scene document written to Blob at `sidecar_build`
//! and referenced by `scenes.sidecar_key` (spec §6 "Sidecar JSON" v1.0).
//!
//! One sidecar is written per scene, not per video — `sidecar_build`
//! uploads `sidecars/{owner}/{video}/{scene}.json` for every scene
//! (spec §4.1).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::owner::OwnerId;
use crate::scene::SceneId;
use crate::video::VideoId;

pub const SIDECAR_SCHEMA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SidecarTranscript {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<SidecarTranscriptSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SidecarTranscriptSegment {
    pub start_s: f64,
    pub end_s: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SidecarEmbeddingInfo {
    pub model: String,
    pub dimensions: usize,
    pub has_embedding: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SidecarEmbeddings {
    pub text: SidecarEmbeddingInfo,
    pub vision: SidecarEmbeddingInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SidecarPerson {
    pub person_id: String,
    pub name: String,
    pub confidence: f32,
    pub frame_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SidecarProcessingInfo {
    pub asr_model: String,
    pub text_model: String,
    pub vision_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SidecarMetadata {
    pub created_at: DateTime<Utc>,
    pub version: String,
    pub processing_info: SidecarProcessingInfo,
}

/// Per-scene sidecar document (spec §6). Immutable once written; carries
/// model identifiers and dimensions but never the raw vector payloads.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Sidecar {
    pub video_id: VideoId,
    pub scene_id: SceneId,
    pub start_s: f64,
    pub end_s: f64,
    pub duration_s: f64,
    pub transcript: SidecarTranscript,
    pub embeddings: SidecarEmbeddings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_tags: Option<Value>,
    #[serde(default)]
    pub people: Vec<SidecarPerson>,
    pub metadata: SidecarMetadata,
}

impl Sidecar {
    /// Deterministic key: `sidecars/{owner}/{video}/{scene}.json`.
    pub fn key(owner_id: &OwnerId, video_id: &VideoId, scene_id: &SceneId) -> String {
        format!("sidecars/{}/{}/{}.json", owner_id, video_id, scene_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_deterministic_for_same_inputs() {
        let owner = OwnerId::new();
        let video = VideoId::new();
        let scene = SceneId::new();
        assert_eq!(
            Sidecar::key(&owner, &video, &scene),
            Sidecar::key(&owner, &video, &scene)
        );
    }

    #[test]
    fn encode_decode_roundtrip_is_lossless_for_non_vector_fields() {
        let sidecar = Sidecar {
            video_id: VideoId::new(),
            scene_id: SceneId::new(),
            start_s: 1.5,
            end_s: 4.25,
            duration_s: 2.75,
            transcript: SidecarTranscript {
                text: "hello world".into(),
                segments: vec![SidecarTranscriptSegment {
                    start_s: 1.5,
                    end_s: 4.25,
                    text: "hello world".into(),
                }],
                language: Some("en".into()),
            },
            embeddings: SidecarEmbeddings {
                text: SidecarEmbeddingInfo {
                    model: "siglip-so400m".into(),
                    dimensions: crate::dims::TEXT_DIM,
                    has_embedding: true,
                },
                vision: SidecarEmbeddingInfo {
                    model: "siglip-so400m".into(),
                    dimensions: crate::dims::IMAGE_DIM,
                    has_embedding: true,
                },
            },
            vision_tags: Some(serde_json::json!({"outdoor": 0.8})),
            people: vec![SidecarPerson {
                person_id: "p1".into(),
                name: "Alice".into(),
                confidence: 0.72,
                frame_count: 3,
            }],
            metadata: SidecarMetadata {
                created_at: Utc::now(),
                version: SIDECAR_SCHEMA_VERSION.into(),
                processing_info: SidecarProcessingInfo {
                    asr_model: "whisper-large-v3".into(),
                    text_model: "siglip-so400m".into(),
                    vision_model: "siglip-so400m".into(),
                },
            },
        };
        let json = serde_json::to_string(&sidecar).unwrap();
        let decoded: Sidecar = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.video_id, sidecar.video_id);
        assert_eq!(decoded.scene_id, sidecar.scene_id);
        assert_eq!(decoded.start_s, sidecar.start_s);
        assert_eq!(decoded.end_s, sidecar.end_s);
        assert_eq!(decoded.transcript.text, sidecar.transcript.text);
        assert_eq!(decoded.people.len(), sidecar.people.len());
        assert_eq!(decoded.metadata.version, sidecar.metadata.version);
    }
}
