//! The fixed transcode profile used by the processing pipeline.

use std::path::Path;

use tokio::sync::watch;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Transcoder producing H.264 video / AAC audio output.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    /// Per-invocation timeout in seconds
    timeout_secs: u64,
}

impl FfmpegTranscoder {
    /// Create a transcoder with the given per-invocation timeout.
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    /// Transcode `input` into `output`.
    ///
    /// Synchronous from the caller's perspective: resolves when the
    /// subprocess exits, is cancelled, or hits the timeout.
    pub async fn transcode(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> MediaResult<()> {
        let input = input.as_ref();
        let output = output.as_ref();

        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }

        let cmd = FfmpegCommand::new(input, output)
            .video_codec("libx264")
            .audio_codec("aac");

        let mut runner = FfmpegRunner::new().with_timeout(self.timeout_secs);
        if let Some(cancel) = cancel {
            runner = runner.with_cancel(cancel);
        }

        runner.run(&cmd).await?;

        info!(
            input = %input.display(),
            output = %output.display(),
            "Transcoding complete"
        );
        Ok(())
    }
}
