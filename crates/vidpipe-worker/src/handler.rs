//! Message handler: one queue message, end to end.
//!
//! Acknowledges the message if and only if every pipeline stage succeeded.
//! Anything else leaves the message for redelivery, with retry bookkeeping
//! that moves poison messages to the dead-letter stream.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use vidpipe_metadata::MetadataError;
use vidpipe_models::{VideoId, VideoStatus};
use vidpipe_queue::{Delivery, VideoUploadedMessage};

use crate::context::{MessageSink, ProcessingContext};
use crate::metrics;
use crate::pipeline;

/// Handle one delivery.
///
/// `cancel` carries the executor's shutdown signal into the transcoder
/// subprocess so a shutdown does not strand a running FFmpeg.
pub async fn handle_message(
    ctx: Arc<ProcessingContext>,
    queue: Arc<dyn MessageSink>,
    delivery: Delivery,
    cancel: watch::Receiver<bool>,
) {
    let message = match VideoUploadedMessage::decode(&delivery.body) {
        Ok(message) => message,
        Err(e) => {
            error!(
                message_id = %delivery.message_id,
                "Failed to decode message body: {}", e
            );
            metrics::record_message("invalid");
            track_failure(queue.as_ref(), &delivery, &e.to_string()).await;
            return;
        }
    };

    info!(
        video_id = %message.video_id,
        filename = %message.filename,
        message_id = %delivery.message_id,
        delivery_count = delivery.delivery_count,
        event_type = message.event_type.as_deref().unwrap_or("-"),
        "Processing message"
    );

    let video_id = VideoId::from_string(message.video_id.clone());

    let result = pipeline::process_video(&ctx, &video_id, &message.filename, Some(cancel)).await;

    match result {
        Ok(()) => {
            match queue.ack(&delivery.message_id).await {
                Ok(()) => {
                    info!(
                        video_id = %video_id,
                        message_id = %delivery.message_id,
                        "Message processed and acked"
                    );
                }
                Err(e) => {
                    // Tolerated: the persist stage converges on redelivery,
                    // so a reprocessed video still ends well-formed.
                    error!(
                        video_id = %video_id,
                        message_id = %delivery.message_id,
                        "Failed to ack message: {}", e
                    );
                }
            }
            metrics::record_message("ok");
        }
        Err(e) => {
            error!(
                video_id = %video_id,
                message_id = %delivery.message_id,
                "Pipeline failed: {}", e
            );
            if let Some(stage) = e.stage() {
                metrics::record_pipeline_failure(stage);
            }
            metrics::record_message("error");
            let exhausted = track_failure(queue.as_ref(), &delivery, &e.to_string()).await;
            if exhausted {
                mark_failed(&ctx, &video_id).await;
            }
        }
    }
}

/// Record a failed delivery and move the message to the DLQ once it has
/// exhausted its retries. Returns whether the retries are exhausted.
async fn track_failure(queue: &dyn MessageSink, delivery: &Delivery, error_text: &str) -> bool {
    match queue.increment_retry(&delivery.message_id).await {
        Ok(count) if count >= queue.max_retries() => {
            warn!(
                message_id = %delivery.message_id,
                retries = count,
                "Max retries exhausted, moving message to DLQ"
            );
            if let Err(e) = queue.dlq(&delivery.message_id, &delivery.body, error_text).await {
                error!(
                    message_id = %delivery.message_id,
                    "Failed to move message to DLQ: {}", e
                );
            }
            true
        }
        Ok(count) => {
            info!(
                message_id = %delivery.message_id,
                attempt = count,
                max = queue.max_retries(),
                "Message left for redelivery"
            );
            false
        }
        Err(e) => {
            warn!(
                message_id = %delivery.message_id,
                "Failed to record retry: {}", e
            );
            false
        }
    }
}

/// Best-effort terminal-status write once a video's message is dead.
///
/// A video whose message has moved to the DLQ will never be redelivered,
/// so its record is marked failed to make "stuck" directly queryable.
/// A missing intake record is left alone.
async fn mark_failed(ctx: &ProcessingContext, video_id: &VideoId) {
    match ctx.metadata.get_video(video_id).await {
        Ok(mut record) => {
            record.status = VideoStatus::Failed;
            if let Err(e) = ctx.metadata.put_video(&record).await {
                warn!(video_id = %video_id, "Failed to mark video as failed: {}", e);
            } else {
                info!(video_id = %video_id, "Marked video as failed");
            }
        }
        Err(MetadataError::NotFound(_)) => {}
        Err(e) => {
            warn!(video_id = %video_id, "Failed to load record for failure mark: {}", e);
        }
    }
}
