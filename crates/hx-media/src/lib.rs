//! FFmpeg/ffprobe CLI wrapper for the indexing pipeline's media operations
//! (spec §4.1): container probing, canonical audio extraction, per-scene
//! frame sampling, and thumbnail generation.

pub mod audio;
pub mod command;
pub mod error;
pub mod frames;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod scene_detect;
pub mod thumbnail;

pub use audio::extract_audio_pcm16k_mono;
pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frames::{capture_frame_at, capture_middle_frame, sample_scene_frames};
pub use fs_utils::move_file;
pub use probe::{get_duration, probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use scene_detect::{boundaries_to_scenes, detect_scene_boundaries, DEFAULT_SCENE_SCORE_THRESHOLD};
pub use thumbnail::{build_thumbnail, generate_scene_thumbnail};
