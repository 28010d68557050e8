//! Video analysis client.
//!
//! The analyze stage of the pipeline runs through this crate. The default
//! stub mode simulates a long-running model call (fixed delay, fixed
//! classification); remote mode calls an external analysis service over
//! HTTP and must be treated as fallible and potentially slow.

pub mod client;
pub mod error;

pub use client::{InferenceClient, InferenceConfig, InferenceMode};
pub use error::{InferenceError, InferenceResult};
