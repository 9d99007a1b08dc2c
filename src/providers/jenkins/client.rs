use std::error::Error as StdError;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::auth::Credentials;
use crate::error::{DevOpsLabError, Result};
use crate::pipeline::ErrorType;

use super::links::job_path;
use super::types::{JenkinsJob, WorkflowRun, JOB_TREE};

/// A Jenkins request that did not produce a usable body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct JenkinsFailure {
    pub error_type: ErrorType,
    pub message: String,
}

impl JenkinsFailure {
    fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
        }
    }
}

/// Which run of a job to describe.
#[derive(Debug, Clone, Copy)]
pub enum BuildRef {
    Number(u64),
    LastSuccessful,
}

impl BuildRef {
    fn path(self) -> String {
        match self {
            Self::Number(number) => format!("{number}/"),
            Self::LastSuccessful => "lastSuccessfulBuild/".to_string(),
        }
    }
}

pub struct JenkinsClient {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl JenkinsClient {
    pub fn new(base_url: &str, credentials: Option<Credentials>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("DevOpsLab/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| DevOpsLabError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Url::join drops the last path segment unless it ends with a slash
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| DevOpsLabError::Config(format!("Invalid Jenkins URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(credentials) = &self.credentials {
            request.basic_auth(&credentials.user, Some(credentials.token.as_str()))
        } else {
            request
        }
    }

    fn job_endpoint(&self, job: &str, rest: &str) -> std::result::Result<Url, JenkinsFailure> {
        self.base_url
            .join(&format!("{}{rest}", job_path(job)))
            .map_err(|e| JenkinsFailure::new(ErrorType::Unknown, format!("Invalid job URL: {e}")))
    }

    /// Fetches the job summary including its last build.
    pub async fn fetch_job(&self, job: &str) -> std::result::Result<JenkinsJob, JenkinsFailure> {
        let mut url = self.job_endpoint(job, "api/json")?;
        url.query_pairs_mut().append_pair("tree", JOB_TREE);
        self.get_json(url).await
    }

    /// Fetches the stage breakdown of one run.
    pub async fn fetch_run(&self, job: &str, build: BuildRef) -> std::result::Result<WorkflowRun, JenkinsFailure> {
        let url = self.job_endpoint(job, &format!("{}wfapi/describe", build.path()))?;
        self.get_json(url).await
    }

    async fn get_json<T>(&self, url: Url) -> std::result::Result<T, JenkinsFailure>
    where
        T: DeserializeOwned,
    {
        debug!("GET {url}");

        let response = self
            .auth_request(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|e| {
                warn!("Jenkins request to {url} failed: {e}");
                JenkinsFailure::new(classify_transport_error(&e), e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_type = classify_http_status(status, self.has_credentials());
            debug!("Jenkins responded {status} for {url}");
            return Err(JenkinsFailure::new(
                error_type,
                format!("Jenkins responded with HTTP {}", status.as_u16()),
            ));
        }

        // Any body that does not match the expected shape fails closed
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                warn!("Jenkins response from {url} timed out: {e}");
                return JenkinsFailure::new(ErrorType::Timeout, e.to_string());
            }
            warn!("Unexpected Jenkins payload from {url}: {e}");
            JenkinsFailure::new(ErrorType::Unknown, format!("Malformed Jenkins response: {e}"))
        })
    }
}

pub fn classify_http_status(status: StatusCode, has_credentials: bool) -> ErrorType {
    match status {
        StatusCode::UNAUTHORIZED if has_credentials => ErrorType::AuthInvalid,
        StatusCode::UNAUTHORIZED => ErrorType::AuthRequired,
        StatusCode::FORBIDDEN => ErrorType::AuthInvalid,
        StatusCode::NOT_FOUND => ErrorType::NotFound,
        s if s.is_server_error() => ErrorType::ServerError,
        _ => ErrorType::Unknown,
    }
}

pub fn classify_transport_error(error: &reqwest::Error) -> ErrorType {
    if error.is_timeout() {
        ErrorType::Timeout
    } else if is_dns_failure(error) {
        ErrorType::HostNotFound
    } else if error.is_connect() {
        ErrorType::ConnectionFailed
    } else {
        ErrorType::Unknown
    }
}

/// Walks the source chain looking for a resolver failure.
pub(crate) fn is_dns_failure(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        let text = err.to_string().to_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        current = err.source();
    }
    false
}
