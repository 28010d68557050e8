//! Inference error types.

use thiserror::Error;

pub type InferenceResult<T> = Result<T, InferenceError>;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Failed to configure inference client: {0}")]
    ConfigError(String),

    #[error("Analysis request failed: {0}")]
    RequestFailed(String),

    #[error("Malformed analysis response: {0}")]
    BadResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl InferenceError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn bad_response(msg: impl Into<String>) -> Self {
        Self::BadResponse(msg.into())
    }
}
