//! Hand-rolled fakes for the worker's collaborators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use vidpipe_inference::{InferenceError, InferenceResult};
use vidpipe_media::{MediaError, MediaResult};
use vidpipe_metadata::{MetadataError, MetadataResult};
use vidpipe_models::{VideoId, VideoRecord};
use vidpipe_queue::{Delivery, QueueError, QueueResult, VideoUploadedMessage};
use vidpipe_storage::{object_url_for, StorageError, StorageResult};

use crate::config::WorkerConfig;
use crate::context::{
    BlobStore, MessageSink, ProcessingContext, QueueDriver, Transcoder, VideoAnalyzer,
    VideoMetadataStore,
};

/// Shared event log for asserting cross-collaborator ordering.
pub type EventLog = Arc<Mutex<Vec<&'static str>>>;

pub struct FakeBlobStore {
    bucket: String,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    downloads: Mutex<Vec<PathBuf>>,
}

impl FakeBlobStore {
    pub fn new() -> Self {
        Self {
            bucket: "videos".to_string(),
            objects: Mutex::new(HashMap::new()),
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub fn insert_object(&self, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
    }

    pub fn downloads(&self) -> Vec<PathBuf> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn download_file(&self, key: &str, path: &Path) -> StorageResult<()> {
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))?;
        std::fs::write(path, bytes)?;
        self.downloads.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        object_url_for(&self.bucket, key)
    }
}

pub struct FakeMetadataStore {
    records: Mutex<HashMap<String, VideoRecord>>,
    events: EventLog,
}

impl FakeMetadataStore {
    pub fn new(events: EventLog) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn seed(&self, record: VideoRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.video_id.to_string(), record);
    }

    pub fn record(&self, video_id: &str) -> Option<VideoRecord> {
        self.records.lock().unwrap().get(video_id).cloned()
    }
}

#[async_trait]
impl VideoMetadataStore for FakeMetadataStore {
    async fn get_video(&self, video_id: &VideoId) -> MetadataResult<VideoRecord> {
        self.records
            .lock()
            .unwrap()
            .get(video_id.as_str())
            .cloned()
            .ok_or_else(|| MetadataError::not_found(video_id.to_string()))
    }

    async fn put_video(&self, record: &VideoRecord) -> MetadataResult<()> {
        self.records
            .lock()
            .unwrap()
            .insert(record.video_id.to_string(), record.clone());
        self.events.lock().unwrap().push("put");
        Ok(())
    }
}

pub struct FakeTranscoder {
    fail: AtomicBool,
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl FakeTranscoder {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        _cancel: Option<watch::Receiver<bool>>,
    ) -> MediaResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_path_buf(), output.to_path_buf()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(MediaError::ffmpeg_failed(
                "injected failure",
                Some("frame dropped".to_string()),
                Some(1),
            ));
        }
        std::fs::write(output, b"transcoded")?;
        Ok(())
    }
}

pub struct FakeAnalyzer {
    label: String,
    fail: AtomicBool,
    /// Extra delay applied when the analyzed path contains the key.
    delays: Mutex<Vec<(String, Duration)>>,
}

impl FakeAnalyzer {
    pub fn new() -> Self {
        Self {
            label: "This video appears to contain outdoor sports action.".to_string(),
            fail: AtomicBool::new(false),
            delays: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn slow_for(&self, path_fragment: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .push((path_fragment.to_string(), delay));
    }
}

#[async_trait]
impl VideoAnalyzer for FakeAnalyzer {
    async fn analyze(&self, path: &Path) -> InferenceResult<String> {
        let delay = {
            let delays = self.delays.lock().unwrap();
            let p = path.to_string_lossy().into_owned();
            delays
                .iter()
                .find(|(fragment, _)| p.contains(fragment.as_str()))
                .map(|(_, d)| *d)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(InferenceError::request_failed("injected failure"));
        }
        Ok(self.label.clone())
    }
}

pub struct FakeSink {
    acks: Mutex<Vec<String>>,
    retries: Mutex<HashMap<String, u32>>,
    dlq: Mutex<Vec<(String, String)>>,
    max_retries: u32,
    fail_ack: AtomicBool,
    events: EventLog,
}

impl FakeSink {
    pub fn new(events: EventLog) -> Self {
        Self {
            acks: Mutex::new(Vec::new()),
            retries: Mutex::new(HashMap::new()),
            dlq: Mutex::new(Vec::new()),
            max_retries: 3,
            fail_ack: AtomicBool::new(false),
            events,
        }
    }

    pub fn fail_ack(&self) {
        self.fail_ack.store(true, Ordering::SeqCst);
    }

    pub fn acks(&self) -> Vec<String> {
        self.acks.lock().unwrap().clone()
    }

    pub fn retry_count(&self, message_id: &str) -> u32 {
        self.retries
            .lock()
            .unwrap()
            .get(message_id)
            .copied()
            .unwrap_or(0)
    }

    /// (message_id, error) pairs moved to the DLQ.
    pub fn dlq_entries(&self) -> Vec<(String, String)> {
        self.dlq.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for FakeSink {
    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        if self.fail_ack.load(Ordering::SeqCst) {
            return Err(QueueError::connection_failed("injected ack failure"));
        }
        self.acks.lock().unwrap().push(message_id.to_string());
        self.events.lock().unwrap().push("ack");
        Ok(())
    }

    async fn increment_retry(&self, message_id: &str) -> QueueResult<u32> {
        let mut retries = self.retries.lock().unwrap();
        let count = retries.entry(message_id.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn dlq(&self, message_id: &str, _body: &str, error: &str) -> QueueResult<()> {
        self.dlq
            .lock()
            .unwrap()
            .push((message_id.to_string(), error.to_string()));
        Ok(())
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Scripted queue for exercising the executor loop. Receives pop scripted
/// batches (or errors) and fall back to empty once the script runs out;
/// sink operations delegate to the shared [`FakeSink`].
#[derive(Clone)]
pub struct FakeQueueDriver {
    sink: Arc<FakeSink>,
    script: Arc<Mutex<std::collections::VecDeque<Result<Vec<Delivery>, String>>>>,
    receive_counts: Arc<Mutex<Vec<usize>>>,
}

impl FakeQueueDriver {
    pub fn new(sink: Arc<FakeSink>) -> Self {
        Self {
            sink,
            script: Arc::new(Mutex::new(std::collections::VecDeque::new())),
            receive_counts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push_batch(&self, deliveries: Vec<Delivery>) {
        self.script.lock().unwrap().push_back(Ok(deliveries));
    }

    pub fn push_error(&self, message: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_counts.lock().unwrap().len()
    }

    /// The `count` argument observed on each receive call.
    pub fn receive_counts(&self) -> Vec<usize> {
        self.receive_counts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSink for FakeQueueDriver {
    async fn ack(&self, message_id: &str) -> QueueResult<()> {
        self.sink.ack(message_id).await
    }

    async fn increment_retry(&self, message_id: &str) -> QueueResult<u32> {
        self.sink.increment_retry(message_id).await
    }

    async fn dlq(&self, message_id: &str, body: &str, error: &str) -> QueueResult<()> {
        self.sink.dlq(message_id, body, error).await
    }

    fn max_retries(&self) -> u32 {
        MessageSink::max_retries(self.sink.as_ref())
    }
}

#[async_trait]
impl QueueDriver for FakeQueueDriver {
    async fn init(&self) -> QueueResult<()> {
        Ok(())
    }

    async fn receive(
        &self,
        _consumer_name: &str,
        _block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        self.receive_counts.lock().unwrap().push(count);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(deliveries)) => Ok(deliveries),
            Some(Err(message)) => Err(QueueError::connection_failed(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn claim_pending(
        &self,
        _consumer_name: &str,
        _count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        Ok(Vec::new())
    }
}

/// Fully wired context over fakes, with handles kept for assertions.
pub struct TestHarness {
    pub ctx: Arc<ProcessingContext>,
    pub storage: Arc<FakeBlobStore>,
    pub metadata: Arc<FakeMetadataStore>,
    pub transcoder: Arc<FakeTranscoder>,
    pub analyzer: Arc<FakeAnalyzer>,
    pub sink: Arc<FakeSink>,
    events: EventLog,
    shutdown: watch::Sender<bool>,
    _work_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let work_dir = tempfile::tempdir().unwrap();

        let config = WorkerConfig {
            work_dir: work_dir.path().to_string_lossy().into_owned(),
            message_timeout: Duration::from_secs(300),
            ..Default::default()
        };

        let storage = Arc::new(FakeBlobStore::new());
        let metadata = Arc::new(FakeMetadataStore::new(Arc::clone(&events)));
        let transcoder = Arc::new(FakeTranscoder::new());
        let analyzer = Arc::new(FakeAnalyzer::new());
        let sink = Arc::new(FakeSink::new(Arc::clone(&events)));

        let ctx = Arc::new(ProcessingContext {
            config,
            storage: Arc::clone(&storage) as Arc<dyn BlobStore>,
            metadata: Arc::clone(&metadata) as Arc<dyn VideoMetadataStore>,
            transcoder: Arc::clone(&transcoder) as Arc<dyn Transcoder>,
            analyzer: Arc::clone(&analyzer) as Arc<dyn VideoAnalyzer>,
        });

        let (shutdown, _) = watch::channel(false);

        Self {
            ctx,
            storage,
            metadata,
            transcoder,
            analyzer,
            sink,
            events,
            shutdown,
            _work_dir: work_dir,
        }
    }

    pub fn sink(&self) -> Arc<dyn MessageSink> {
        Arc::clone(&self.sink) as Arc<dyn MessageSink>
    }

    pub fn cancel_rx(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    /// A well-formed delivery for the given video and object key.
    pub fn delivery(&self, video_id: &str, filename: &str) -> Delivery {
        let body = VideoUploadedMessage::new(video_id, filename)
            .encode()
            .unwrap();
        Delivery {
            message_id: format!("{}-0", video_id),
            body,
            delivery_count: 1,
        }
    }

    /// A delivery with an arbitrary raw body.
    pub fn raw_delivery(&self, message_id: &str, body: &str) -> Delivery {
        Delivery {
            message_id: message_id.to_string(),
            body: body.to_string(),
            delivery_count: 1,
        }
    }
}
