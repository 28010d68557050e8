//! Redis Streams message queue.
//!
//! This crate provides:
//! - Message enqueueing from the upload path
//! - Batched consumer-group receive with long-poll blocking
//! - Ack (delete) by per-message stream id
//! - Pending-claim redelivery and a dead-letter stream for poison messages

pub mod error;
pub mod message;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use message::{Delivery, VideoUploadedMessage};
pub use queue::{MessageQueue, QueueConfig};
