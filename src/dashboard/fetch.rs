use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::error::{DevOpsLabError, Result};
use crate::pipeline::PipelineStatusResponse;

pub const STATUS_PATH: &str = "api/pipelines/status";

/// Why a poll of the status endpoint produced no snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Cannot connect to backend server at {0}. Is it running?")]
    Unreachable(String),

    #[error("Backend server error ({0}). Check the server logs.")]
    ServerError(u16),

    #[error("Pipeline status endpoint not found (404). Check the API URL.")]
    NotFound,

    #[error("Failed to fetch pipeline status: {0}")]
    Other(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP client for the API service's pipeline status endpoint.
#[derive(Clone)]
pub struct StatusFetcher {
    client: Client,
    endpoint: Url,
    api_url: String,
}

impl StatusFetcher {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("DevOpsLab/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| DevOpsLabError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base = if api_url.ends_with('/') {
            api_url.to_string()
        } else {
            format!("{api_url}/")
        };
        let endpoint = Url::parse(&base)
            .and_then(|url| url.join(STATUS_PATH))
            .map_err(|e| DevOpsLabError::Config(format!("Invalid API URL: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Performs one GET of the status endpoint, converting every failure into a
    /// [`FetchError`].
    pub async fn fetch(&self) -> std::result::Result<PipelineStatusResponse, FetchError> {
        debug!("Polling {}", self.endpoint);

        let response = self.client.get(self.endpoint.clone()).send().await.map_err(|e| {
            warn!("Status poll failed: {e}");
            if e.is_connect() || e.is_timeout() {
                FetchError::Unreachable(self.api_url.clone())
            } else {
                FetchError::Other(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if status.is_server_error() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Other(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(FetchError::Other(message));
        }

        let parsed: PipelineStatusResponse = serde_json::from_str(&body).map_err(|e| {
            // A `success: false` envelope carries its own message
            serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .map_or_else(|| FetchError::Other(format!("malformed response: {e}")), FetchError::Other)
        })?;

        if !parsed.success {
            return Err(FetchError::Other("backend reported failure".to_string()));
        }

        Ok(parsed)
    }
}
