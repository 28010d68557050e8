//! FFmpeg CLI wrapper for video transcoding.
//!
//! This crate provides:
//! - An FFmpeg command builder
//! - A runner with captured stderr, timeout and cancellation
//! - The fixed H.264/AAC transcode profile used by the worker

pub mod command;
pub mod error;
pub mod transcode;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use transcode::FfmpegTranscoder;
