//! Video metadata models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Tags written by the worker once a video has been fully processed.
///
/// Kept for compatibility with consumers that sniff tags instead of
/// reading the explicit [`VideoStatus`] field.
pub const PROCESSED_TAGS: [&str; 2] = ["transcoded", "ai-processed"];

/// Unique identifier for a video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that the identifier is non-empty.
    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty()
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Video processing status.
///
/// Set deterministically at each lifecycle step so that "processed vs. not"
/// is directly queryable rather than inferred from tag contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Uploaded, waiting for the worker to pick it up
    #[default]
    Uploaded,
    /// A worker is running the pipeline for this video
    Processing,
    /// Transcode + analysis completed, record updated
    Processed,
    /// Pipeline failed permanently
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Processing => "processing",
            VideoStatus::Processed => "processed",
            VideoStatus::Failed => "failed",
        }
    }

    /// Parse from the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(VideoStatus::Uploaded),
            "processing" => Some(VideoStatus::Processing),
            "processed" => Some(VideoStatus::Processed),
            "failed" => Some(VideoStatus::Failed),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Processed | VideoStatus::Failed)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted video record, keyed by `video_id`.
///
/// Created by the upload path at intake time and rewritten by the worker
/// once the processing pipeline completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    /// Unique video ID (primary key, immutable once created)
    pub video_id: VideoId,

    /// Video title (original upload filename at intake)
    pub title: String,

    /// Free-text description; the worker embeds the inference result here
    pub description: String,

    /// Resolvable object-storage URL of the current artifact
    pub url: String,

    /// Short descriptive tags (semantically unordered)
    #[serde(default)]
    pub tags: Vec<String>,

    /// Original upload timestamp
    pub upload_date: DateTime<Utc>,

    /// Open-ended key/value metadata from the upload path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,

    /// Explicit processing status
    #[serde(default)]
    pub status: VideoStatus,
}

impl VideoRecord {
    /// Create the initial "unprocessed" record written at intake time.
    pub fn new_uploaded(
        video_id: VideoId,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            video_id,
            title: title.into(),
            description: "A newly uploaded video".to_string(),
            url: url.into(),
            tags: Vec::new(),
            upload_date: Utc::now(),
            metadata: None,
            status: VideoStatus::Uploaded,
        }
    }

    /// Produce the post-processing version of this record.
    ///
    /// Merges rather than replaces: `title`, `upload_date` and `metadata`
    /// are preserved from the existing record, while `description`, `tags`,
    /// `url` and `status` are rewritten. Applying this twice with the same
    /// inputs yields the same record, which keeps redelivery harmless.
    pub fn into_processed(mut self, inference_result: &str, url: impl Into<String>) -> Self {
        self.description = format!("Transcoded and processed: {}", inference_result);
        self.tags = PROCESSED_TAGS.iter().map(|t| t.to_string()).collect();
        self.url = url.into();
        self.status = VideoStatus::Processed;
        self
    }

    /// Check the processed-marker tags (legacy consumers).
    pub fn has_processed_tags(&self) -> bool {
        PROCESSED_TAGS.iter().all(|t| self.tags.iter().any(|x| x == t))
    }
}

/// API response shape for a video record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub video_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    pub upload_date: String,
    pub status: VideoStatus,
}

impl From<&VideoRecord> for VideoResponse {
    fn from(record: &VideoRecord) -> Self {
        Self {
            video_id: record.video_id.to_string(),
            title: record.title.clone(),
            description: record.description.clone(),
            tags: record.tags.clone(),
            url: record.url.clone(),
            metadata: record.metadata.clone(),
            upload_date: record.upload_date.to_rfc3339(),
            status: record.status,
        }
    }
}
