//! Axum HTTP API server.
//!
//! This crate provides:
//! - Multipart video upload (blob put + intake record + queue message)
//! - Video record retrieval
//! - Health/readiness probes and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
