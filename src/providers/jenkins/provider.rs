use std::time::Duration;

use log::{debug, info, warn};

use crate::auth::Credentials;
use crate::error::Result;
use crate::pipeline::{ErrorType, PipelineStages, PipelineState, PipelineStatus};

use super::client::{BuildRef, JenkinsClient};
use super::types::{JenkinsBuild, JenkinsJob};

/// Jenkins pipeline status provider.
///
/// Queries the Jenkins JSON API for each monitored job and turns the raw job,
/// build and workflow payloads into typed [`PipelineStatus`] snapshots. Every
/// failure is captured on the snapshot of the job it belongs to; collecting
/// statuses never fails as a whole.
pub struct JenkinsProvider {
    client: JenkinsClient,
}

impl JenkinsProvider {
    /// Creates a provider for the Jenkins instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed or the HTTP client cannot be built.
    pub fn new(base_url: &str, credentials: Option<Credentials>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: JenkinsClient::new(base_url, credentials, timeout)?,
        })
    }

    /// Jenkins root URL without a trailing slash.
    pub fn host(&self) -> String {
        self.client.base_url().as_str().trim_end_matches('/').to_string()
    }

    /// Fetches every job concurrently, preserving the order of `jobs`.
    pub async fn collect_statuses(&self, jobs: &[String]) -> Vec<PipelineStatus> {
        info!("Fetching status for {} Jenkins jobs from {}", jobs.len(), self.host());

        let futures: Vec<_> = jobs.iter().map(|job| self.fetch_pipeline(job)).collect();
        let pipelines = futures::future::join_all(futures).await;

        let failures = pipelines.iter().filter(|p| crate::pipeline::is_pipeline_error(p)).count();
        if failures > 0 {
            warn!("{failures} of {} Jenkins jobs could not be read", pipelines.len());
        }

        pipelines
    }

    async fn fetch_pipeline(&self, name: &str) -> PipelineStatus {
        let job = match self.client.fetch_job(name).await {
            Ok(job) => job,
            Err(failure) if failure.error_type == ErrorType::NotFound => {
                debug!("Job {name} not found, treating as never built");
                return PipelineStatus::failed(name, ErrorType::NotFound, ErrorType::NotFound.describe());
            }
            Err(failure) => return PipelineStatus::failed(name, failure.error_type, failure.message),
        };

        let mut pipeline = PipelineStatus {
            url: job.url.clone(),
            ..PipelineStatus::new(name, classify_job(&job))
        };

        if let Some(build) = &job.last_build {
            pipeline.building = build.building;
            pipeline.result = build.result.clone();
            pipeline.timestamp = build.timestamp;
            pipeline.duration = build.duration.filter(|_| !build.building);
            pipeline.last_build_number = Some(build.number);
            pipeline.estimated_duration = build.estimate();
            pipeline.stages = self.fetch_stages(name, build).await;
        }

        pipeline
    }

    /// Stage data is optional: freestyle jobs have no workflow API, and a failed
    /// lookup here never turns the job into an error.
    async fn fetch_stages(&self, name: &str, build: &JenkinsBuild) -> Option<PipelineStages> {
        let current = self.client.fetch_run(name, BuildRef::Number(build.number)).await;

        let completed_successfully = !build.building && build.result.as_deref() == Some("SUCCESS");
        let last_successful = match &current {
            Ok(run) if completed_successfully => Some(run.to_reference()),
            _ => self
                .client
                .fetch_run(name, BuildRef::LastSuccessful)
                .await
                .map(|run| run.to_reference())
                .inspect_err(|e| debug!("No successful reference run for {name}: {e}"))
                .ok(),
        };

        match current {
            Ok(run) => Some(PipelineStages {
                stages: run.stage_infos(),
                last_successful,
            }),
            Err(e) => {
                debug!("No stage data for {name} #{}: {e}", build.number);
                last_successful.map(|reference| PipelineStages {
                    stages: Vec::new(),
                    last_successful: Some(reference),
                })
            }
        }
    }
}

/// Maps a job's last build onto the closed status classification.
pub fn classify_job(job: &JenkinsJob) -> PipelineState {
    let Some(build) = &job.last_build else {
        return if job.in_queue {
            PipelineState::Pending
        } else {
            PipelineState::NeverBuilt
        };
    };

    if build.building {
        return PipelineState::Running;
    }
    if job.in_queue {
        return PipelineState::Pending;
    }

    match build.result.as_deref() {
        Some("SUCCESS") => PipelineState::Success,
        Some("FAILURE") => PipelineState::Failure,
        Some("ABORTED") => PipelineState::Aborted,
        Some("UNSTABLE") => PipelineState::Unstable,
        Some("NOT_BUILT") => PipelineState::NeverBuilt,
        None => PipelineState::Pending,
        Some(_) => PipelineState::Unknown,
    }
}
