//! The eight pipeline stage functions (spec §4.1), run in order by
//! `crate::executor::PipelineExecutor`. Each hard-failing stage propagates
//! `WorkerError` and lets the executor's retry/DLQ bookkeeping and
//! `WorkerError::classify` decide what happens next; ASR and face-match
//! degrade internally and always return their (possibly empty) result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::PgPool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use hx_blob::R2Client;
use hx_inference::{InferenceClient, TranscribeResponse, TranscriptSegment};
use hx_models::{
    FeatureFlags, OwnerId, Scene, Sidecar, SidecarEmbeddingInfo, SidecarEmbeddings,
    SidecarMetadata, SidecarPerson, SidecarProcessingInfo, SidecarTranscript, VideoId,
    VideoStatus,
};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::scratch::ScratchDir;

const ASR_MODEL_NAME: &str = "whisper-large-v3";
const EMBEDDING_MODEL_NAME: &str = "siglip-so400m";

/// A fixed, non-empty fallback used for a scene's text embedding input
/// when neither a transcript nor a video title is available (spec §4.1
/// `per_scene_embed` step 2: "ensures every scene is retrievable").
pub const UNTITLED_SCENE_PLACEHOLDER_TEXT: &str = "untitled video scene";

/// Everything a stage function needs, threaded through by value references
/// rather than reopening a connection/client per stage.
pub struct PipelineContext {
    pub store: PgPool,
    pub blob: R2Client,
    pub inference: InferenceClient,
    pub config: WorkerConfig,
    pub flags: FeatureFlags,
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        "video/webm" => "webm",
        _ => "mp4",
    }
}

/// Download the upload, probe its duration, and fail the video if the
/// container is unreadable or the duration is out of bounds. Returns the
/// local scratch path and probed duration for downstream stages.
pub async fn upload_validate(
    ctx: &PipelineContext,
    owner_storage_key: &str,
    mime_type: &str,
    video_id: &VideoId,
    scratch: &ScratchDir,
) -> WorkerResult<(PathBuf, f64)> {
    let local_path = scratch.join(format!("source.{}", extension_for_mime(mime_type)));
    ctx.blob.download_file(owner_storage_key, &local_path).await?;

    let duration = match hx_media::probe_video(&local_path).await {
        Ok(info) if info.duration > 0.0 && info.duration <= ctx.config.max_video_duration_s => {
            info.duration
        }
        Ok(info) => {
            let reason = format!(
                "duration {:.3}s outside accepted range (0, {}]",
                info.duration, ctx.config.max_video_duration_s
            );
            hx_store::videos::mark_failed(&ctx.store, video_id, &reason).await?;
            return Err(hx_media::MediaError::InvalidVideo(reason).into());
        }
        Err(e) => {
            hx_store::videos::mark_failed(&ctx.store, video_id, &e.to_string()).await?;
            return Err(e.into());
        }
    };

    hx_store::videos::set_duration(&ctx.store, video_id, duration).await?;
    hx_store::videos::set_state(&ctx.store, video_id, VideoStatus::Processing).await?;
    Ok((local_path, duration))
}

/// Produce the canonical 16 kHz mono PCM stream `asr` consumes. Failure is
/// `fatal_media` (spec §4.1 `audio_extract`).
pub async fn audio_extract(video_path: &Path, scratch: &ScratchDir) -> WorkerResult<PathBuf> {
    let audio_path = scratch.join("audio.wav");
    hx_media::extract_audio_pcm16k_mono(video_path, &audio_path).await?;
    Ok(audio_path)
}

/// Transcribe the extracted audio. Soft-failing: any error (including a
/// missing audio file) degrades to an empty transcript rather than failing
/// the video (spec §4.1 `asr`, §9). The returned `bool` distinguishes
/// "ASR ran" from "ASR was never attempted", which `per_scene_embed` needs
/// to tell a null transcript from an attempted-but-empty one (spec §4.1
/// tie-break).
pub async fn asr(
    ctx: &PipelineContext,
    audio_path: &Path,
    language: Option<&str>,
) -> (TranscribeResponse, bool) {
    let empty = || TranscribeResponse {
        text: String::new(),
        segments: Vec::new(),
        language: None,
    };

    let bytes = match tokio::fs::read(audio_path).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read extracted audio, proceeding with empty transcript");
            return (empty(), false);
        }
    };

    match ctx.inference.transcribe_audio(&bytes, language).await {
        Ok(resp) => (resp, true),
        Err(e) => {
            tracing::warn!(error = %e, "ASR failed after retries, proceeding with empty transcript");
            (empty(), false)
        }
    }
}

/// Segment the video into ordered, contiguous, non-overlapping scenes.
/// Hard-failing (spec §9): a detector crash fails the whole video rather
/// than indexing with fabricated boundaries.
pub async fn scene_detect(
    video_id: &VideoId,
    video_path: &Path,
    duration_s: f64,
) -> WorkerResult<Vec<Scene>> {
    let boundaries =
        hx_media::detect_scene_boundaries(video_path, hx_media::DEFAULT_SCENE_SCORE_THRESHOLD)
            .await?;
    let intervals = hx_media::boundaries_to_scenes(boundaries, duration_s);
    Ok(intervals
        .into_iter()
        .map(|(start, end)| Scene::new(video_id.clone(), start, end))
        .collect())
}

struct SceneEmbedOutcome {
    transcript: Option<String>,
    text_vec: Option<Vec<f32>>,
    image_vec: Option<Vec<f32>>,
    middle_frame_path: Option<PathBuf>,
}

fn non_zero_vec(v: Vec<f32>) -> Option<Vec<f32>> {
    if v.iter().all(|x| *x == 0.0) {
        None
    } else {
        Some(v)
    }
}

fn average_and_normalize(samples: Vec<Vec<f32>>) -> Option<Vec<f32>> {
    if samples.is_empty() {
        return None;
    }
    let dim = samples[0].len();
    let mut avg = vec![0.0_f32; dim];
    for s in &samples {
        for (a, v) in avg.iter_mut().zip(s.iter()) {
            *a += v;
        }
    }
    let n = samples.len() as f32;
    for a in avg.iter_mut() {
        *a /= n;
    }
    hx_models::l2_normalize(&mut avg);
    non_zero_vec(avg)
}

/// Concatenate every ASR segment overlapping `[start_s, end_s]`, matching
/// the same `seg_start < end_s && seg_end > start_s` test as
/// `hx_models::Scene::overlaps_segment`.
fn collect_overlapping_transcript(
    segments: &[TranscriptSegment],
    start_s: f64,
    end_s: f64,
) -> String {
    segments
        .iter()
        .filter(|seg| seg.start < end_s && seg.end > start_s)
        .map(|seg| seg.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

async fn embed_one_scene(
    inference: &InferenceClient,
    video_path: &Path,
    scene_dir: &Path,
    start_s: f64,
    end_s: f64,
    transcript: Option<String>,
    fallback_text: &str,
) -> SceneEmbedOutcome {
    if let Err(e) = tokio::fs::create_dir_all(scene_dir).await {
        tracing::warn!(error = %e, start_s, end_s, "failed to create scene scratch dir, embeddings left null");
        return SceneEmbedOutcome {
            transcript,
            text_vec: None,
            image_vec: None,
            middle_frame_path: None,
        };
    }

    let text_input: &str = match transcript.as_deref() {
        Some(t) if !t.is_empty() => t,
        _ => fallback_text,
    };
    let text_vec = match inference.embed_text(text_input).await {
        Ok(mut v) => {
            hx_models::l2_normalize(&mut v);
            non_zero_vec(v)
        }
        Err(e) => {
            tracing::warn!(error = %e, "text embedding failed, leaving scene text_vec null");
            None
        }
    };

    let frame_paths = hx_media::sample_scene_frames(video_path, start_s, end_s, scene_dir).await;
    let mut samples = Vec::with_capacity(frame_paths.len());
    for path in &frame_paths {
        match tokio::fs::read(path).await {
            Ok(bytes) => match inference.embed_vision(&bytes).await {
                Ok(v) => samples.push(v),
                Err(e) => tracing::warn!(error = %e, "vision embedding failed for one sample"),
            },
            Err(e) => tracing::warn!(error = %e, "failed to read a sampled scene frame"),
        }
    }
    let image_vec = average_and_normalize(samples);

    let middle_frame_path = scene_dir.join("middle.jpg");
    let middle_frame_path =
        match hx_media::capture_middle_frame(video_path, start_s, end_s, &middle_frame_path).await
        {
            Ok(()) => Some(middle_frame_path),
            Err(e) => {
                tracing::warn!(error = %e, "failed to capture scene middle frame");
                None
            }
        };

    SceneEmbedOutcome {
        transcript,
        text_vec,
        image_vec,
        middle_frame_path,
    }
}

/// Fill in each scene's transcript/text_vec/image_vec and capture its
/// middle frame, fanned out with bounded parallelism (spec §5, default 4).
/// Returns the captured middle-frame path per scene, parallel to `scenes`,
/// for `per_scene_face_match`/`sidecar_build` to reuse.
pub async fn per_scene_embed(
    ctx: &PipelineContext,
    video_path: &Path,
    scratch: &ScratchDir,
    scenes: &mut [Scene],
    asr_segments: &[TranscriptSegment],
    asr_succeeded: bool,
    fallback_text: &str,
) -> WorkerResult<Vec<Option<PathBuf>>> {
    let semaphore = Arc::new(Semaphore::new(ctx.config.max_scene_parallel.max(1)));
    let mut set = JoinSet::new();

    for (idx, scene) in scenes.iter().enumerate() {
        let sem = semaphore.clone();
        let inference = ctx.inference.clone();
        let video_path = video_path.to_path_buf();
        let scene_dir = scratch.join(format!("scene_{idx}"));
        let start_s = scene.start_s;
        let end_s = scene.end_s;
        let transcript = asr_succeeded
            .then(|| collect_overlapping_transcript(asr_segments, start_s, end_s));
        let fallback = fallback_text.to_string();

        set.spawn(async move {
            let _permit = sem.acquire_owned().await.expect("semaphore never closed");
            let outcome =
                embed_one_scene(&inference, &video_path, &scene_dir, start_s, end_s, transcript, &fallback)
                    .await;
            (idx, outcome)
        });
    }

    let mut outcomes: Vec<Option<SceneEmbedOutcome>> = (0..scenes.len()).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (idx, outcome) = joined
            .map_err(|e| WorkerError::job_failed(format!("scene embedding task panicked: {e}")))?;
        outcomes[idx] = Some(outcome);
    }

    let mut middle_frames = Vec::with_capacity(scenes.len());
    for (scene, outcome) in scenes.iter_mut().zip(outcomes.into_iter()) {
        let outcome = outcome.expect("every spawned scene index completes exactly once");
        scene.transcript = outcome.transcript;
        scene.text_vec = outcome.text_vec;
        scene.image_vec = outcome.image_vec;
        middle_frames.push(outcome.middle_frame_path);
    }
    Ok(middle_frames)
}

/// Match detected faces in each scene's middle frame against the owner's
/// enrolled centroids. Soft-failing and feature-flagged (spec §4.1,
/// `FeatureFlags::face_detection`): skips a scene on any Inference error
/// rather than failing the video.
///
/// The reference face model is an untrained placeholder producing one
/// embedding per frame rather than per detected face region (no cropping
/// primitive exists in this deployment's media stack); the single frame
/// embedding is compared against every enrolled centroid and the
/// highest-similarity match above threshold is recorded, with
/// `frame_count` set to the number of faces the detector found.
pub async fn per_scene_face_match(
    ctx: &PipelineContext,
    owner_id: &OwnerId,
    scenes: &[Scene],
    middle_frames: &[Option<PathBuf>],
) -> WorkerResult<()> {
    if !ctx.flags.face_detection {
        return Ok(());
    }

    let profiles = hx_store::faces::list_for_owner(&ctx.store, owner_id).await?;
    let centroids: Vec<(hx_models::PersonId, &[f32])> = profiles
        .iter()
        .filter_map(|p| p.face_vec.as_deref().map(|v| (p.person_id, v)))
        .collect();
    if centroids.is_empty() {
        return Ok(());
    }

    for (scene, frame_path) in scenes.iter().zip(middle_frames.iter()) {
        let Some(frame_path) = frame_path else {
            continue;
        };
        let jpeg = match tokio::fs::read(frame_path).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(scene_id = %scene.scene_id, error = %e, "failed to read middle frame for face match");
                continue;
            }
        };
        let faces = match ctx.inference.detect_faces(&jpeg).await {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(scene_id = %scene.scene_id, error = %e, "face detection failed, skipping scene");
                continue;
            }
        };
        if faces.is_empty() {
            continue;
        }
        let embedding = match ctx.inference.embed_face(&jpeg).await {
            Ok(mut v) => {
                hx_models::l2_normalize(&mut v);
                v
            }
            Err(e) => {
                tracing::warn!(scene_id = %scene.scene_id, error = %e, "face embedding failed, skipping scene");
                continue;
            }
        };

        let best = centroids
            .iter()
            .map(|(person_id, centroid)| (*person_id, hx_retrieval::cosine_similarity(&embedding, centroid)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        if let Some((person_id, similarity)) = best {
            if similarity >= ctx.config.face_similarity_threshold {
                hx_store::faces::upsert_scene_person(
                    &ctx.store,
                    &scene.scene_id,
                    &person_id,
                    similarity,
                    faces.len() as i32,
                )
                .await?;
            }
        }
    }
    Ok(())
}

/// Build and upload each scene's thumbnail and sidecar document, attaching
/// the resulting keys on the already-committed scene row.
pub async fn sidecar_build(
    ctx: &PipelineContext,
    owner_id: &OwnerId,
    video_id: &VideoId,
    scenes: &[Scene],
    middle_frames: &[Option<PathBuf>],
    scratch: &ScratchDir,
) -> WorkerResult<()> {
    for (idx, (scene, frame_path)) in scenes.iter().zip(middle_frames.iter()).enumerate() {
        if let Some(frame_path) = frame_path {
            let thumb_path = scratch.join(format!("thumb_{idx}.webp"));
            match hx_media::build_thumbnail(frame_path, &thumb_path).await {
                Ok(()) => {
                    let key = hx_blob::keys::thumbnail_key(owner_id, video_id, &scene.scene_id);
                    let bytes = tokio::fs::read(&thumb_path).await?;
                    ctx.blob.upload_bytes(bytes, &key, "image/webp").await?;
                    hx_store::scenes::attach_thumbnail_key(&ctx.store, &scene.scene_id, &key).await?;
                }
                Err(e) => {
                    tracing::warn!(scene_id = %scene.scene_id, error = %e, "thumbnail build failed, skipping");
                }
            }
        }

        let people = hx_store::faces::people_with_names_in_scene(&ctx.store, &scene.scene_id).await?;
        let sidecar = Sidecar {
            video_id: video_id.clone(),
            scene_id: scene.scene_id.clone(),
            start_s: scene.start_s,
            end_s: scene.end_s,
            duration_s: scene.duration_s(),
            transcript: SidecarTranscript {
                text: scene.transcript.clone().unwrap_or_default(),
                segments: Vec::new(),
                language: None,
            },
            embeddings: SidecarEmbeddings {
                text: SidecarEmbeddingInfo {
                    model: EMBEDDING_MODEL_NAME.to_string(),
                    dimensions: hx_models::TEXT_DIM,
                    has_embedding: scene.text_vec.is_some(),
                },
                vision: SidecarEmbeddingInfo {
                    model: EMBEDDING_MODEL_NAME.to_string(),
                    dimensions: hx_models::IMAGE_DIM,
                    has_embedding: scene.image_vec.is_some(),
                },
            },
            vision_tags: scene.vision_tags.clone(),
            people: people
                .into_iter()
                .map(|p| SidecarPerson {
                    person_id: p.person_id.to_string(),
                    name: p.name,
                    confidence: p.confidence,
                    frame_count: p.frame_count,
                })
                .collect(),
            metadata: SidecarMetadata {
                created_at: chrono::Utc::now(),
                version: hx_models::SIDECAR_SCHEMA_VERSION.to_string(),
                processing_info: SidecarProcessingInfo {
                    asr_model: ASR_MODEL_NAME.to_string(),
                    text_model: EMBEDDING_MODEL_NAME.to_string(),
                    vision_model: EMBEDDING_MODEL_NAME.to_string(),
                },
            },
        };

        let sidecar_json = serde_json::to_vec(&sidecar)
            .map_err(|e| WorkerError::stage_failed("sidecar_build", e.to_string()))?;
        let key = hx_blob::keys::sidecar_key(owner_id, video_id, &scene.scene_id);
        ctx.blob.upload_bytes(sidecar_json, &key, "application/json").await?;
        hx_store::scenes::attach_sidecar_key(&ctx.store, &scene.scene_id, &key).await?;
    }
    Ok(())
}

/// Transition the video to `indexed`. Hard-failing (spec §9): a commit
/// failure leaves the video `processing` for the next retry rather than
/// silently reporting success.
pub async fn commit(ctx: &PipelineContext, video_id: &VideoId) -> WorkerResult<()> {
    hx_store::videos::mark_indexed(&ctx.store, video_id).await?;
    Ok(())
}

/// Drive a video through all eight stages in order (spec §4.1). A task
/// for a video already `indexed` is a no-op (spec §4.1 re-processing
/// tie-break). The scratch directory is always cleaned up, whether the
/// run succeeds, fails hard, or a stage panics mid-scene-fan-out.
pub async fn run_pipeline(ctx: &PipelineContext, video_id: &VideoId) -> WorkerResult<()> {
    let video = hx_store::videos::get(&ctx.store, video_id).await?;
    if video.state == VideoStatus::Indexed {
        tracing::info!(video_id = %video_id, "video already indexed, treating task as no-op");
        return Ok(());
    }

    let scratch = ScratchDir::create(&ctx.config.work_dir, video_id).await?;
    let result = run_pipeline_inner(ctx, &video, &scratch).await;
    scratch.remove().await;
    result
}

async fn run_pipeline_inner(
    ctx: &PipelineContext,
    video: &hx_models::Video,
    scratch: &ScratchDir,
) -> WorkerResult<()> {
    let video_id = &video.video_id;

    let (video_path, duration_s) =
        upload_validate(ctx, &video.storage_key, &video.mime_type, video_id, scratch).await?;
    let audio_path = audio_extract(&video_path, scratch).await?;
    let (transcript, asr_succeeded) = asr(ctx, &audio_path, None).await;
    let mut scenes = scene_detect(video_id, &video_path, duration_s).await?;

    let fallback_text = match hx_store::metadata::get(&ctx.store, video_id).await? {
        Some(meta) if meta.title.as_deref().is_some_and(|t| !t.trim().is_empty()) => {
            meta.title.expect("checked Some above")
        }
        _ => UNTITLED_SCENE_PLACEHOLDER_TEXT.to_string(),
    };

    let middle_frames = per_scene_embed(
        ctx,
        &video_path,
        scratch,
        &mut scenes,
        &transcript.segments,
        asr_succeeded,
        &fallback_text,
    )
    .await?;

    hx_store::scenes::insert_batch(&ctx.store, &scenes).await?;
    per_scene_face_match(ctx, &video.owner_id, &scenes, &middle_frames).await?;
    sidecar_build(ctx, &video.owner_id, video_id, &scenes, &middle_frames, scratch).await?;
    commit(ctx, video_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn overlapping_transcript_concatenates_in_order() {
        let segments = vec![seg(0.0, 2.0, "hello"), seg(2.0, 4.0, "world"), seg(9.0, 11.0, "later")];
        assert_eq!(collect_overlapping_transcript(&segments, 1.0, 3.0), "hello world");
    }

    #[test]
    fn overlapping_transcript_is_empty_string_when_nothing_overlaps() {
        let segments = vec![seg(20.0, 22.0, "far away")];
        assert_eq!(collect_overlapping_transcript(&segments, 0.0, 5.0), "");
    }

    #[test]
    fn average_and_normalize_yields_unit_vector() {
        let samples = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let avg = average_and_normalize(samples).unwrap();
        let norm = (avg[0] * avg[0] + avg[1] * avg[1]).sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn average_and_normalize_is_none_for_empty_input() {
        assert!(average_and_normalize(Vec::new()).is_none());
    }

    #[test]
    fn zero_vector_embedding_is_stored_as_null() {
        assert!(non_zero_vec(vec![0.0, 0.0, 0.0]).is_none());
        assert!(non_zero_vec(vec![0.0, 0.1]).is_some());
    }
}
