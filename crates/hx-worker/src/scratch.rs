//! Per-video scratch directory lifecycle. Every pipeline stage that shells
//! out to FFmpeg or downloads bytes does so under one directory created at
//! the start of the job and removed on every exit path.

use std::path::{Path, PathBuf};

use hx_models::VideoId;

use crate::error::WorkerResult;

#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub async fn create(work_dir: &str, video_id: &VideoId) -> WorkerResult<Self> {
        let path = Path::new(work_dir).join(video_id.to_string());
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    pub async fn remove(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to clean up scratch dir");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_remove_round_trips() {
        let root = tempfile::tempdir().unwrap();
        let video_id = VideoId::new();
        let scratch = ScratchDir::create(root.path().to_str().unwrap(), &video_id)
            .await
            .unwrap();
        assert!(scratch.path().exists());
        let marker = scratch.join("marker.txt");
        tokio::fs::write(&marker, b"x").await.unwrap();
        scratch.remove().await;
        assert!(!marker.exists());
    }
}
