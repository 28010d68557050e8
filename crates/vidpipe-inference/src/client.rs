//! Analysis client with stub and remote modes.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{InferenceError, InferenceResult};

/// Default simulated model latency for stub mode.
const DEFAULT_STUB_DELAY_MS: u64 = 2000;

/// Classification returned by the stub model.
const STUB_LABEL: &str = "This video appears to contain outdoor sports action.";

/// Which backend performs the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceMode {
    /// Fixed delay, fixed classification. No external calls.
    Stub,
    /// HTTP call to an external analysis service.
    Remote,
}

/// Inference client configuration.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub mode: InferenceMode,
    /// Simulated latency in stub mode
    pub stub_delay_ms: u64,
    /// Base URL of the remote service (remote mode only)
    pub remote_url: Option<String>,
    /// Request timeout for remote calls in seconds
    pub request_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            mode: InferenceMode::Stub,
            stub_delay_ms: DEFAULT_STUB_DELAY_MS,
            remote_url: None,
            request_timeout_secs: 300,
        }
    }
}

impl InferenceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> InferenceResult<Self> {
        let mode = match std::env::var("INFERENCE_MODE").as_deref() {
            Ok("remote") => InferenceMode::Remote,
            Ok("stub") | Err(_) => InferenceMode::Stub,
            Ok(other) => {
                return Err(InferenceError::config_error(format!(
                    "Unknown INFERENCE_MODE: {other}"
                )))
            }
        };

        let remote_url = std::env::var("INFERENCE_URL").ok();
        if mode == InferenceMode::Remote && remote_url.is_none() {
            return Err(InferenceError::config_error(
                "INFERENCE_URL is required when INFERENCE_MODE=remote",
            ));
        }

        let stub_delay_ms = std::env::var("INFERENCE_STUB_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_STUB_DELAY_MS);

        let request_timeout_secs = std::env::var("INFERENCE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        Ok(Self {
            mode,
            stub_delay_ms,
            remote_url,
            request_timeout_secs,
        })
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    video_path: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    label: String,
}

/// Client for the analysis stage of the pipeline.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    config: InferenceConfig,
    http: reqwest::Client,
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> InferenceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn from_env() -> InferenceResult<Self> {
        Self::new(InferenceConfig::from_env()?)
    }

    /// Analyze a transcoded video file and return a classification label.
    pub async fn analyze(&self, video_path: impl AsRef<Path>) -> InferenceResult<String> {
        let video_path = video_path.as_ref();
        match self.config.mode {
            InferenceMode::Stub => self.analyze_stub(video_path).await,
            InferenceMode::Remote => self.analyze_remote(video_path).await,
        }
    }

    async fn analyze_stub(&self, video_path: &Path) -> InferenceResult<String> {
        debug!(
            path = %video_path.display(),
            delay_ms = self.config.stub_delay_ms,
            "Running stub analysis"
        );
        tokio::time::sleep(Duration::from_millis(self.config.stub_delay_ms)).await;
        Ok(STUB_LABEL.to_string())
    }

    async fn analyze_remote(&self, video_path: &Path) -> InferenceResult<String> {
        let base = self
            .config
            .remote_url
            .as_deref()
            .ok_or_else(|| InferenceError::config_error("remote URL not configured"))?;
        let url = format!("{}/analyze", base.trim_end_matches('/'));

        info!(path = %video_path.display(), url = %url, "Requesting remote analysis");

        let response = self
            .http
            .post(&url)
            .json(&AnalyzeRequest {
                video_path: &video_path.to_string_lossy(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(InferenceError::request_failed(format!(
                "analysis service returned {}",
                response.status()
            )));
        }

        let body: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::bad_response(e.to_string()))?;

        if body.label.trim().is_empty() {
            return Err(InferenceError::bad_response("empty label"));
        }
        Ok(body.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_mode_returns_fixed_label() {
        let client = InferenceClient::new(InferenceConfig {
            stub_delay_ms: 0,
            ..Default::default()
        })
        .unwrap();

        let label = client.analyze("/tmp/some-video.mp4").await.unwrap();
        assert_eq!(label, STUB_LABEL);
    }

    #[tokio::test]
    async fn stub_mode_waits_configured_delay() {
        let client = InferenceClient::new(InferenceConfig {
            stub_delay_ms: 50,
            ..Default::default()
        })
        .unwrap();

        let start = std::time::Instant::now();
        client.analyze("/tmp/some-video.mp4").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn remote_mode_requires_url() {
        let config = InferenceConfig {
            mode: InferenceMode::Remote,
            remote_url: None,
            ..Default::default()
        };
        // from_env enforces this pairing; new() defers to call time.
        let client = InferenceClient::new(config).unwrap();
        let err = tokio_test::block_on(client.analyze("/tmp/v.mp4")).unwrap_err();
        assert!(matches!(err, InferenceError::ConfigError(_)));
    }
}
