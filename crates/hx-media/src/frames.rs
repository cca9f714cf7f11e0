//! Per-scene frame sampling for `per_scene_embed`/`per_scene_face_match`
//! and thumbnail capture (spec §4.1).

use std::path::{Path, PathBuf};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Fractions of a scene's span sampled for the vision embedding average
/// (spec §4.1 `per_scene_embed` step 3).
pub const VISION_SAMPLE_FRACTIONS: [f64; 3] = [0.25, 0.50, 0.75];

fn timestamp_at_fraction(start_s: f64, end_s: f64, fraction: f64) -> f64 {
    start_s + (end_s - start_s) * fraction
}

/// Capture a single frame at `timestamp_s` into `output_path` as a JPEG.
pub async fn capture_frame_at(
    video_path: impl AsRef<Path>,
    timestamp_s: f64,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(video_path, output_path)
        .seek(timestamp_s)
        .single_frame()
        .log_level("error");
    FfmpegRunner::new().run(&cmd).await
}

/// Capture a frame at each of [`VISION_SAMPLE_FRACTIONS`] of `[start_s,
/// end_s]`, writing `{out_dir}/sample_{n}.jpg`. Samples that fail to
/// extract are skipped rather than failing the whole call — the caller
/// averages whatever embeddings it can get and leaves the vector null
/// only if every sample failed.
pub async fn sample_scene_frames(
    video_path: impl AsRef<Path>,
    start_s: f64,
    end_s: f64,
    out_dir: impl AsRef<Path>,
) -> Vec<PathBuf> {
    let video_path = video_path.as_ref();
    let out_dir = out_dir.as_ref();
    let mut paths = Vec::with_capacity(VISION_SAMPLE_FRACTIONS.len());

    for (i, fraction) in VISION_SAMPLE_FRACTIONS.iter().enumerate() {
        let timestamp = timestamp_at_fraction(start_s, end_s, *fraction);
        let out_path = out_dir.join(format!("sample_{i}.jpg"));
        if capture_frame_at(video_path, timestamp, &out_path).await.is_ok() {
            paths.push(out_path);
        }
    }
    paths
}

/// Capture the scene's middle frame, used for the thumbnail and for
/// face matching.
pub async fn capture_middle_frame(
    video_path: impl AsRef<Path>,
    start_s: f64,
    end_s: f64,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let mid = timestamp_at_fraction(start_s, end_s, 0.5);
    capture_frame_at(video_path, mid, output_path).await
}
