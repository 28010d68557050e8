//! S3 blob store client.
//!
//! This crate provides:
//! - Uploading original and processed video objects
//! - Downloading objects to local scratch files
//! - Public object URL computation

pub mod client;
pub mod error;

pub use client::{object_url_for, S3Client, S3Config};
pub use error::{StorageError, StorageResult};
