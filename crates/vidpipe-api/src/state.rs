//! Application state.

use std::sync::Arc;

use vidpipe_metadata::MetadataClient;
use vidpipe_queue::MessageQueue;
use vidpipe_storage::S3Client;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<S3Client>,
    pub metadata: Arc<MetadataClient>,
    pub queue: Arc<MessageQueue>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let storage = S3Client::from_env().await?;
        let metadata = MetadataClient::from_env().await?;
        let queue = MessageQueue::from_env()?;

        Ok(Self {
            config,
            storage: Arc::new(storage),
            metadata: Arc::new(metadata),
            queue: Arc::new(queue),
        })
    }
}
