//! DynamoDB metadata store client.
//!
//! This crate provides:
//! - Put/get of [`vidpipe_models::VideoRecord`] by identifier
//! - Attribute-value marshaling for the record shape
//! - Retry with exponential backoff and jitter

pub mod client;
pub mod error;
pub mod marshal;
pub mod metrics;
pub mod retry;

pub use client::{MetadataClient, MetadataConfig};
pub use error::{MetadataError, MetadataResult};
pub use retry::{with_retry, RetryConfig};
