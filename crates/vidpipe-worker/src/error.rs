//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Processing timed out after {0} seconds")]
    Timeout(u64),

    #[error("Fetch failed for video {video_id}: {source}")]
    Fetch {
        video_id: String,
        #[source]
        source: vidpipe_storage::StorageError,
    },

    #[error("Transcode failed for video {video_id}: {source}")]
    Transcode {
        video_id: String,
        #[source]
        source: vidpipe_media::MediaError,
    },

    #[error("Analysis failed for video {video_id}: {source}")]
    Analyze {
        video_id: String,
        #[source]
        source: vidpipe_inference::InferenceError,
    },

    #[error("Persist failed for video {video_id}: {source}")]
    Persist {
        video_id: String,
        #[source]
        source: vidpipe_metadata::MetadataError,
    },

    #[error("Queue error: {0}")]
    Queue(#[from] vidpipe_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Pipeline stage this error belongs to, if any.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            WorkerError::Fetch { .. } => Some("fetch"),
            WorkerError::Transcode { .. } => Some("transcode"),
            WorkerError::Analyze { .. } => Some("analyze"),
            WorkerError::Persist { .. } => Some("persist"),
            WorkerError::Timeout(_) => Some("timeout"),
            _ => None,
        }
    }
}
