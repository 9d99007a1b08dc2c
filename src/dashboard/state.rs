use chrono::{DateTime, Utc};
use log::debug;

use crate::pipeline::{PipelineStatus, PipelineStatusResponse, StatusSummary};

use super::fetch::FetchError;

/// What the dashboard currently shows. Owned by a single poller; every applied
/// poll replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub pipelines: Vec<PipelineStatus>,
    pub summary: Option<StatusSummary>,
    pub jenkins_host: Option<String>,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Sequence number of the response currently on screen, 0 before the first.
    latest_applied: u64,
}

impl DashboardState {
    /// True until the first response, success or failure, has been applied.
    pub fn is_loading(&self) -> bool {
        self.latest_applied == 0
    }

    pub fn latest_applied(&self) -> u64 {
        self.latest_applied
    }

    /// Applies the outcome of request `seq`. Returns false, leaving the state
    /// untouched, when a newer response has already been applied.
    pub fn apply(
        &mut self,
        seq: u64,
        outcome: Result<PipelineStatusResponse, FetchError>,
        now: DateTime<Utc>,
    ) -> bool {
        if seq <= self.latest_applied {
            debug!("Discarding stale response #{seq}, #{} already applied", self.latest_applied);
            return false;
        }
        self.latest_applied = seq;

        match outcome {
            Ok(response) => {
                self.pipelines = response.pipelines;
                self.summary = Some(response.summary);
                self.jenkins_host = Some(response.jenkins_host);
                self.error = None;
                self.last_updated = Some(now);
            }
            Err(error) => {
                // No stale cards next to a connectivity error
                self.pipelines.clear();
                self.summary = None;
                self.error = Some(error.to_string());
            }
        }

        true
    }
}
