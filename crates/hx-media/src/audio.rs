//! Canonical audio extraction for the `audio_extract` pipeline stage.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Sample rate and channel layout ASR expects: 16 kHz mono PCM.
pub const ASR_SAMPLE_RATE_HZ: u32 = 16_000;
pub const ASR_CHANNELS: u32 = 1;

/// Extract a 16 kHz mono PCM stream from `video_path` into `output_path`
/// (spec §4.1 `audio_extract`: "produce a canonical 16 kHz mono PCM stream
/// ... into scratch storage"). Failure here is `fatal_media`.
pub async fn extract_audio_pcm16k_mono(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let cmd = FfmpegCommand::new(video_path, output_path)
        .output_arg("-vn")
        .output_arg("-ar")
        .output_arg(ASR_SAMPLE_RATE_HZ.to_string())
        .output_arg("-ac")
        .output_arg(ASR_CHANNELS.to_string())
        .output_arg("-f")
        .output_arg("wav")
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await
}
