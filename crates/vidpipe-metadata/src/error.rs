//! Metadata store error types.

use thiserror::Error;

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors that can occur against the metadata store.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Failed to configure metadata client: {0}")]
    ConfigError(String),

    #[error("Video not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to marshal record: {0}")]
    Marshal(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),
}

impl MetadataError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn marshal(msg: impl Into<String>) -> Self {
        Self::Marshal(msg.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    /// Check if the error is worth retrying.
    ///
    /// Transport-level failures are retryable; not-found, validation and
    /// marshaling errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MetadataError::RequestFailed(_))
    }
}
