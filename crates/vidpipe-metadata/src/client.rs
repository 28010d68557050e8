//! DynamoDB client implementation.

use std::time::Instant;

use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use tracing::debug;

use vidpipe_models::{VideoId, VideoRecord};

use crate::error::{MetadataError, MetadataResult};
use crate::marshal;
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};

/// Configuration for the metadata client.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// DynamoDB table name
    pub table_name: String,
    /// Optional custom endpoint (localstack)
    pub endpoint_url: Option<String>,
    /// Retry policy
    pub retry: RetryConfig,
}

impl MetadataConfig {
    /// Create config from environment variables.
    pub fn from_env() -> MetadataResult<Self> {
        Ok(Self {
            table_name: std::env::var("DYNAMODB_TABLE")
                .map_err(|_| MetadataError::config_error("DYNAMODB_TABLE not set"))?,
            endpoint_url: std::env::var("DYNAMODB_ENDPOINT_URL").ok(),
            retry: RetryConfig::from_env(),
        })
    }
}

/// Metadata store client for video records.
#[derive(Clone)]
pub struct MetadataClient {
    client: Client,
    table: String,
    retry: RetryConfig,
}

impl MetadataClient {
    /// Create a new client from configuration.
    pub async fn new(config: MetadataConfig) -> MetadataResult<Self> {
        if config.table_name.is_empty() {
            return Err(MetadataError::invalid_input("table name cannot be empty"));
        }

        let sdk_config = aws_config::load_from_env().await;
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
        if let Some(ref endpoint) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        let client = Client::from_conf(builder.build());

        Ok(Self {
            client,
            table: config.table_name,
            retry: config.retry,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> MetadataResult<Self> {
        Self::new(MetadataConfig::from_env()?).await
    }

    /// Write a video record, replacing any existing item with the same id.
    pub async fn put_video(&self, record: &VideoRecord) -> MetadataResult<()> {
        if !record.video_id.is_valid() {
            return Err(MetadataError::invalid_input("video ID cannot be empty"));
        }

        let start = Instant::now();
        let item = marshal::to_item(record);

        let result = with_retry(&self.retry, "put_video", || {
            let item = item.clone();
            async move {
                self.client
                    .put_item()
                    .table_name(&self.table)
                    .set_item(Some(item))
                    .send()
                    .await
                    .map_err(|e| MetadataError::request_failed(e.to_string()))?;
                Ok(())
            }
        })
        .await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        record_request("put_video", outcome, start.elapsed().as_secs_f64());

        if result.is_ok() {
            debug!(video_id = %record.video_id, "Stored video record");
        }
        result
    }

    /// Fetch a video record by id.
    ///
    /// Returns [`MetadataError::NotFound`] when no item exists for the id.
    pub async fn get_video(&self, video_id: &VideoId) -> MetadataResult<VideoRecord> {
        if !video_id.is_valid() {
            return Err(MetadataError::invalid_input("video ID cannot be empty"));
        }

        let start = Instant::now();

        let result = with_retry(&self.retry, "get_video", || async {
            let output = self
                .client
                .get_item()
                .table_name(&self.table)
                .key("video_id", AttributeValue::S(video_id.to_string()))
                .send()
                .await
                .map_err(|e| MetadataError::request_failed(e.to_string()))?;

            match output.item() {
                Some(item) if !item.is_empty() => marshal::from_item(item),
                _ => Err(MetadataError::not_found(video_id.to_string())),
            }
        })
        .await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(MetadataError::NotFound(_)) => "not_found",
            Err(_) => "error",
        };
        record_request("get_video", outcome, start.elapsed().as_secs_f64());

        result
    }
}
