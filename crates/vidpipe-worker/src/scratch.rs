//! Per-invocation scratch directories.

use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use vidpipe_models::VideoId;

/// A unique scratch directory for one pipeline invocation.
///
/// The directory name embeds the video id plus a random suffix so that
/// redelivery-triggered re-entry for the same video never collides with a
/// still-running invocation.
#[derive(Debug)]
pub struct ScratchDir {
    dir: PathBuf,
}

impl ScratchDir {
    /// Create the scratch directory under `work_dir`.
    pub async fn create(work_dir: &Path, video_id: &VideoId) -> std::io::Result<Self> {
        let suffix = Uuid::new_v4().simple().to_string();
        let dir = work_dir.join(format!("{}-{}", video_id, &suffix[..8]));
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Local path for the downloaded source object.
    pub fn input_path(&self, filename: &str) -> PathBuf {
        // Object keys may contain separators; only the final component
        // names the local file.
        let base = Path::new(filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "input.mp4".into());
        self.dir.join(base)
    }

    /// Local path for the transcoded output.
    pub fn output_path(&self, video_id: &VideoId) -> PathBuf {
        self.dir.join(format!("{}-transcoded.mp4", video_id))
    }

    /// Best-effort removal of the whole directory.
    pub async fn cleanup(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            warn!(
                dir = %self.dir.display(),
                "Failed to clean up scratch directory: {}", e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scratch_dirs_are_unique_per_invocation() {
        let work_dir = tempfile::tempdir().unwrap();
        let video_id = VideoId::from_string("v1");

        let a = ScratchDir::create(work_dir.path(), &video_id).await.unwrap();
        let b = ScratchDir::create(work_dir.path(), &video_id).await.unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().exists());
        assert!(b.path().exists());
    }

    #[tokio::test]
    async fn cleanup_removes_directory_and_contents() {
        let work_dir = tempfile::tempdir().unwrap();
        let video_id = VideoId::from_string("v1");

        let scratch = ScratchDir::create(work_dir.path(), &video_id).await.unwrap();
        tokio::fs::write(scratch.input_path("a.mp4"), b"data")
            .await
            .unwrap();

        scratch.cleanup().await;
        assert!(!scratch.path().exists());
    }

    #[test]
    fn input_path_strips_key_prefixes() {
        let scratch = ScratchDir {
            dir: PathBuf::from("/tmp/work/v1-abcd1234"),
        };
        assert_eq!(
            scratch.input_path("uploads/v1-clip.mp4"),
            PathBuf::from("/tmp/work/v1-abcd1234/v1-clip.mp4")
        );
    }
}
