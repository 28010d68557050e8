//! Message queue using Redis Streams.

use std::time::Duration;

use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};
use crate::message::{Delivery, VideoUploadedMessage};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for video messages
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Dead letter queue stream name
    pub dlq_stream_name: String,
    /// Max failed deliveries before DLQ
    pub max_retries: u32,
    /// Message visibility timeout; unacked messages older than this are
    /// re-offered to another consumer
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "vidpipe:videos".to_string(),
            consumer_group: "vidpipe:workers".to_string(),
            dlq_stream_name: "vidpipe:dlq".to_string(),
            max_retries: 3,
            visibility_timeout: Duration::from_secs(600),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            stream_name: std::env::var("QUEUE_STREAM")
                .unwrap_or_else(|_| "vidpipe:videos".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "vidpipe:workers".to_string()),
            dlq_stream_name: std::env::var("QUEUE_DLQ_STREAM")
                .unwrap_or_else(|_| "vidpipe:dlq".to_string()),
            max_retries: std::env::var("QUEUE_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }
}

/// Message queue client.
pub struct MessageQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl MessageQueue {
    /// Create a new queue client.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Enqueue an uploaded-video message.
    pub async fn enqueue(&self, message: &VideoUploadedMessage) -> QueueResult<String> {
        message.validate()?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = message.encode()?;

        let message_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("body")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        info!(
            video_id = %message.video_id,
            message_id = %message_id,
            "Enqueued video message"
        );

        Ok(message_id)
    }

    /// Receive a batch of new messages.
    ///
    /// Blocks for up to `block_ms` when the stream is empty and returns at
    /// most `count` deliveries. Entries returned here are first deliveries;
    /// redeliveries come back through [`MessageQueue::claim_pending`].
    pub async fn receive(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: redis::streams::StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">") // Only new messages
            .query_async(&mut conn)
            .await?;

        let mut deliveries = Vec::new();

        for stream_key in result.keys {
            for entry in stream_key.ids {
                if let Some(redis::Value::BulkString(payload)) = entry.map.get("body") {
                    deliveries.push(Delivery {
                        message_id: entry.id.clone(),
                        body: String::from_utf8_lossy(payload).into_owned(),
                        delivery_count: 1,
                    });
                } else {
                    warn!(message_id = %entry.id, "Stream entry without body field");
                }
            }
        }

        Ok(deliveries)
    }

    /// Acknowledge (delete) a message by its stream id.
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!(message_id = %message_id, "Acknowledged message");
        Ok(())
    }

    /// Move a message to the dead letter stream and ack the original.
    pub async fn dlq(&self, message_id: &str, body: &str, error: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XADD")
            .arg(&self.config.dlq_stream_name)
            .arg("*")
            .arg("body")
            .arg(body)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(message_id).await?;

        warn!(message_id = %message_id, "Moved message to DLQ: {}", error);
        Ok(())
    }

    /// Claim messages that have been pending longer than the visibility
    /// timeout (redelivery from crashed or hung consumers).
    ///
    /// The returned delivery count includes the claim itself, so a message
    /// delivered once and then claimed reports a count of 2.
    pub async fn claim_pending(
        &self,
        consumer_name: &str,
        count: usize,
    ) -> QueueResult<Vec<Delivery>> {
        let min_idle_ms = self.config.visibility_timeout.as_millis() as u64;
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let pending: redis::streams::StreamPendingCountReply = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("IDLE")
            .arg(min_idle_ms)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        if pending.ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut claim_cmd = redis::cmd("XCLAIM");
        claim_cmd
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg(min_idle_ms);
        for entry in &pending.ids {
            claim_cmd.arg(&entry.id);
        }

        let result: redis::streams::StreamClaimReply = claim_cmd.query_async(&mut conn).await?;

        let mut deliveries = Vec::new();

        for entry in result.ids {
            let delivery_count = pending
                .ids
                .iter()
                .find(|p| p.id == entry.id)
                .map(|p| p.times_delivered as u64 + 1)
                .unwrap_or(2);

            if let Some(redis::Value::BulkString(payload)) = entry.map.get("body") {
                info!(
                    message_id = %entry.id,
                    delivery_count,
                    "Claimed pending message"
                );
                deliveries.push(Delivery {
                    message_id: entry.id.clone(),
                    body: String::from_utf8_lossy(payload).into_owned(),
                    delivery_count,
                });
            }
        }

        Ok(deliveries)
    }

    /// Get the failed-delivery count recorded for a message.
    pub async fn get_retry_count(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let key = format!("vidpipe:retry:{}", message_id);
        let count: Option<u32> = conn.get(&key).await?;
        Ok(count.unwrap_or(0))
    }

    /// Increment the failed-delivery count for a message.
    pub async fn increment_retry(&self, message_id: &str) -> QueueResult<u32> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let key = format!("vidpipe:retry:{}", message_id);
        let count: u32 = conn.incr(&key, 1).await?;
        // Retry bookkeeping expires after 24 hours
        conn.expire::<_, ()>(&key, 86400).await?;
        Ok(count)
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }

    /// Get DLQ length.
    pub async fn dlq_len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(&self.config.dlq_stream_name).await?;
        Ok(len)
    }

    /// Get max retries from config.
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}
