//! Collaborator seams and the shared processing context.
//!
//! The pipeline talks to its collaborators through these traits so the
//! handler and pipeline can be exercised against in-process fakes. The
//! production implementations delegate to the real clients.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use vidpipe_inference::{InferenceClient, InferenceResult};
use vidpipe_media::{FfmpegTranscoder, MediaResult};
use vidpipe_metadata::{MetadataClient, MetadataResult};
use vidpipe_models::{VideoId, VideoRecord};
use vidpipe_queue::{Delivery, MessageQueue, QueueResult};
use vidpipe_storage::{S3Client, StorageResult};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// The pipeline's view of blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download an object to a local file.
    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()>;

    /// Public object URL for a key.
    fn object_url(&self, key: &str) -> String;
}

/// The pipeline's view of the metadata store.
#[async_trait]
pub trait VideoMetadataStore: Send + Sync {
    async fn get_video(&self, video_id: &VideoId) -> MetadataResult<VideoRecord>;
    async fn put_video(&self, record: &VideoRecord) -> MetadataResult<()>;
}

/// The pipeline's view of the transcoder.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        cancel: Option<watch::Receiver<bool>>,
    ) -> MediaResult<()>;
}

/// The pipeline's view of the analysis service.
#[async_trait]
pub trait VideoAnalyzer: Send + Sync {
    async fn analyze(&self, path: &Path) -> InferenceResult<String>;
}

/// The handler's view of the queue: ack, retry bookkeeping, DLQ.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn ack(&self, message_id: &str) -> QueueResult<()>;
    async fn increment_retry(&self, message_id: &str) -> QueueResult<u32>;
    async fn dlq(&self, message_id: &str, body: &str, error: &str) -> QueueResult<()>;
    fn max_retries(&self) -> u32;
}

/// The executor's view of the queue: everything a consumer needs on top
/// of the handler-facing sink.
#[async_trait]
pub trait QueueDriver: MessageSink {
    async fn init(&self) -> QueueResult<()>;
    async fn receive(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>>;
    async fn claim_pending(&self, consumer_name: &str, count: usize)
        -> QueueResult<Vec<Delivery>>;
}

#[async_trait]
impl BlobStore for S3Client {
    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()> {
        S3Client::download_file(self, key, path).await
    }

    fn object_url(&self, key: &str) -> String {
        S3Client::object_url(self, key)
    }
}

#[async_trait]
impl VideoMetadataStore for MetadataClient {
    async fn get_video(&self, video_id: &VideoId) -> MetadataResult<VideoRecord> {
        MetadataClient::get_video(self, video_id).await
    }

    async fn put_video(&self, record: &VideoRecord) -> MetadataResult<()> {
        MetadataClient::put_video(self, record).await
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        cancel: Option<watch::Receiver<bool>>,
    ) -> MediaResult<()> {
        FfmpegTranscoder::transcode(self, input, output, cancel).await
    }
}

#[async_trait]
impl VideoAnalyzer for InferenceClient {
    async fn analyze(&self, path: &Path) -> InferenceResult<String> {
        InferenceClient::analyze(self, path).await
    }
}

#[async_trait]
impl MessageSink for MessageQueue {
    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        MessageQueue::ack(self, message_id).await
    }

    async fn increment_retry(&self, message_id: &str) -> QueueResult<u32> {
        MessageQueue::increment_retry(self, message_id).await
    }

    async fn dlq(&self, message_id: &str, body: &str, error: &str) -> QueueResult<()> {
        MessageQueue::dlq(self, message_id, body, error).await
    }

    fn max_retries(&self) -> u32 {
        MessageQueue::max_retries(self)
    }
}

#[async_trait]
impl QueueDriver for MessageQueue {
    async fn init(&self) -> QueueResult<()> {
        MessageQueue::init(self).await
    }

    async fn receive(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        MessageQueue::receive(self, consumer_name, block_ms, count).await
    }

    async fn claim_pending(
        &self,
        consumer_name: &str,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        MessageQueue::claim_pending(self, consumer_name, count).await
    }
}

/// Shared state for message handlers.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub storage: Arc<dyn BlobStore>,
    pub metadata: Arc<dyn VideoMetadataStore>,
    pub transcoder: Arc<dyn Transcoder>,
    pub analyzer: Arc<dyn VideoAnalyzer>,
}

impl ProcessingContext {
    /// Create a context backed by the real clients, configured from the
    /// environment.
    pub async fn from_env(config: WorkerConfig) -> WorkerResult<Self> {
        let storage = S3Client::from_env()
            .await
            .map_err(|e| WorkerError::config_error(format!("storage client: {}", e)))?;

        let metadata = MetadataClient::from_env()
            .await
            .map_err(|e| WorkerError::config_error(format!("metadata client: {}", e)))?;

        let analyzer = InferenceClient::from_env()
            .map_err(|e| WorkerError::config_error(format!("inference client: {}", e)))?;

        let transcoder = FfmpegTranscoder::new(config.transcode_timeout.as_secs());

        Ok(Self {
            config,
            storage: Arc::new(storage),
            metadata: Arc::new(metadata),
            transcoder: Arc::new(transcoder),
            analyzer: Arc::new(analyzer),
        })
    }
}
