//! Queue-driven video processing worker.
//!
//! This crate provides:
//! - The poll loop consuming uploaded-video messages
//! - A bounded pool of concurrent message handlers
//! - The fetch/transcode/analyze/persist/cleanup pipeline
//! - Retry tracking with a dead-letter destination for poison messages
//! - Worker metrics and graceful shutdown

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod handler;
pub mod metrics;
pub mod pipeline;
pub mod scratch;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::WorkerConfig;
pub use context::{
    BlobStore, MessageSink, ProcessingContext, QueueDriver, Transcoder, VideoAnalyzer,
    VideoMetadataStore,
};
pub use error::{WorkerError, WorkerResult};
pub use executor::WorkerExecutor;
