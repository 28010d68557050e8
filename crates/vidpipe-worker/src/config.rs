//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrently running pipelines
    pub max_concurrent: usize,
    /// Maximum messages requested per poll
    pub batch_size: usize,
    /// Long-poll block duration for an empty stream
    pub receive_block: Duration,
    /// Delay between iterations when the queue is empty or errored
    pub idle_delay: Duration,
    /// Per-message processing timeout (bounds the whole pipeline)
    pub message_timeout: Duration,
    /// Timeout for a single transcoder invocation
    pub transcode_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Work directory for scratch files
    pub work_dir: String,
    /// How often to scan for messages orphaned by crashed consumers
    pub claim_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            batch_size: 5,
            receive_block: Duration::from_secs(10),
            idle_delay: Duration::from_secs(5),
            message_timeout: Duration::from_secs(1800),
            transcode_timeout: Duration::from_secs(1500),
            shutdown_timeout: Duration::from_secs(60),
            work_dir: "/tmp/vidpipe".to_string(),
            claim_interval: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent: std::env::var("WORKER_MAX_CONCURRENT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8),
            batch_size: std::env::var("WORKER_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            receive_block: Duration::from_secs(
                std::env::var("WORKER_RECEIVE_BLOCK_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            idle_delay: Duration::from_secs(
                std::env::var("WORKER_IDLE_DELAY_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            message_timeout: Duration::from_secs(
                std::env::var("WORKER_MESSAGE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            transcode_timeout: Duration::from_secs(
                std::env::var("WORKER_TRANSCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1500),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/vidpipe".to_string()),
            claim_interval: Duration::from_secs(
                std::env::var("WORKER_CLAIM_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}
