//! Content-aware scene boundary detection for the `scene_detect` pipeline
//! stage (spec §4.1): FFmpeg's `select`+`showinfo` scene-score filter,
//! parsed off stderr the same way `probe.rs` shells `ffprobe` directly
//! rather than going through the `FfmpegCommand`/`FfmpegRunner` builder,
//! since the interesting output here is log lines, not a rendered file.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// FFmpeg scene-score threshold above which a frame is reported as a cut.
/// 0.0-1.0; higher values require a starker visual change.
pub const DEFAULT_SCENE_SCORE_THRESHOLD: f64 = 0.3;

fn parse_pts_time(line: &str) -> Option<f64> {
    let rest = line.split_once("pts_time:")?.1;
    let token = rest.split_whitespace().next()?;
    token.parse::<f64>().ok()
}

/// Run FFmpeg's scene-change detector over the whole file and return the
/// sorted, deduplicated timestamps (seconds) at which a cut was detected.
/// An empty result means the detector found no cuts — the caller falls
/// back to a single `[0, duration]` scene per spec.
pub async fn detect_scene_boundaries(
    video_path: impl AsRef<Path>,
    threshold: f64,
) -> MediaResult<Vec<f64>> {
    let video_path = video_path.as_ref();
    if !video_path.exists() {
        return Err(MediaError::FileNotFound(video_path.to_path_buf()));
    }
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let filter = format!("select='gt(scene,{threshold})',showinfo");
    let mut child = Command::new("ffmpeg")
        .args([
            "-v", "info",
            "-i",
        ])
        .arg(video_path)
        .args(["-filter:v", &filter, "-an", "-f", "null", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    let stderr = child.stderr.take().expect("stderr not captured");
    let mut lines = BufReader::new(stderr).lines();
    let mut boundaries = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line.contains("Parsed_showinfo") {
            if let Some(t) = parse_pts_time(&line) {
                boundaries.push(t);
            }
        }
    }

    let status = child.wait().await?;
    if !status.success() {
        return Err(MediaError::ffmpeg_failed(
            "scene detection failed",
            None,
            status.code(),
        ));
    }

    boundaries.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    boundaries.dedup();
    Ok(boundaries)
}

/// Turn sorted interior cut timestamps into ordered, contiguous,
/// non-overlapping `(start, end)` intervals spanning `[0, duration]`.
/// Boundaries outside `(0, duration)` are dropped; an empty or fully
/// dropped boundary set yields the single-scene fallback.
pub fn boundaries_to_scenes(mut boundaries: Vec<f64>, duration: f64) -> Vec<(f64, f64)> {
    boundaries.retain(|&t| t > 0.0 && t < duration);
    boundaries.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    boundaries.dedup();

    if boundaries.is_empty() {
        return vec![(0.0, duration)];
    }

    let mut scenes = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0.0;
    for &b in &boundaries {
        scenes.push((start, b));
        start = b;
    }
    scenes.push((start, duration));
    scenes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pts_time_from_showinfo_line() {
        let line = "[Parsed_showinfo_1 @ 0x1] n:   3 pts: 123 pts_time:4.928000 duration: 1 ";
        assert_eq!(parse_pts_time(line), Some(4.928));
    }

    #[test]
    fn no_boundaries_yields_single_scene() {
        assert_eq!(boundaries_to_scenes(vec![], 10.0), vec![(0.0, 10.0)]);
    }

    #[test]
    fn boundaries_partition_the_full_span() {
        let scenes = boundaries_to_scenes(vec![3.0, 7.0], 10.0);
        assert_eq!(scenes, vec![(0.0, 3.0), (3.0, 7.0), (7.0, 10.0)]);
    }

    #[test]
    fn out_of_range_boundaries_are_dropped() {
        let scenes = boundaries_to_scenes(vec![-1.0, 0.0, 10.0, 11.0], 10.0);
        assert_eq!(scenes, vec![(0.0, 10.0)]);
    }
}
