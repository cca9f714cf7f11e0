//! Thumbnail generation: resize and center-crop a captured frame to a
//! fixed 16:9 tile, webp-encoded (spec §4.1 `sidecar_build`).

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

pub const THUMBNAIL_WIDTH: u32 = 320;
pub const THUMBNAIL_HEIGHT: u32 = 180;

/// Resize-and-center-crop `frame_path` (an already-captured still) to
/// 320x180 16:9 and encode as webp at `output_path`.
///
/// Scales up to cover the target box, then crops the overflow evenly
/// from both edges, so the output never letterboxes.
pub async fn build_thumbnail(
    frame_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
        w = THUMBNAIL_WIDTH,
        h = THUMBNAIL_HEIGHT,
    );

    let cmd = FfmpegCommand::new(frame_path, output_path)
        .video_filter(&filter)
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await
}

/// Capture a scene's middle frame directly into a 320x180 webp thumbnail,
/// skipping the intermediate full-resolution still.
pub async fn generate_scene_thumbnail(
    video_path: impl AsRef<Path>,
    start_s: f64,
    end_s: f64,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let mid = start_s + (end_s - start_s) * 0.5;
    let filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
        w = THUMBNAIL_WIDTH,
        h = THUMBNAIL_HEIGHT,
    );

    let cmd = FfmpegCommand::new(video_path, output_path)
        .seek(mid)
        .single_frame()
        .video_filter(&filter)
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_dimensions_are_16_9() {
        assert_eq!(THUMBNAIL_WIDTH * 9, THUMBNAIL_HEIGHT * 16);
    }
}
