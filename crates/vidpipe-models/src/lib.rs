//! Shared data models for the vidpipe backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video identifiers and processing status
//! - The persisted video record
//! - API response DTOs

pub mod video;

pub use video::{VideoId, VideoRecord, VideoResponse, VideoStatus, PROCESSED_TAGS};
