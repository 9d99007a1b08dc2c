use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Classification of a monitored job's last or current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Running,
    Success,
    Failure,
    Pending,
    Error,
    Aborted,
    Unstable,
    NeverBuilt,
    #[serde(other)]
    Unknown,
}

impl PipelineState {
    /// `running` and `pending` keep changing between polls; every other state
    /// only moves when a new build starts.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Running | Self::Pending)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Pending => "pending",
            Self::Error => "error",
            Self::Aborted => "aborted",
            Self::Unstable => "unstable",
            Self::Unknown => "unknown",
            Self::NeverBuilt => "never built",
        }
    }
}

/// Why the status of a job could not be determined cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    AuthRequired,
    AuthInvalid,
    /// The job has never run. Not a fault.
    NotFound,
    ServerError,
    ConnectionFailed,
    HostNotFound,
    Timeout,
    #[serde(other)]
    Unknown,
}

impl ErrorType {
    pub fn describe(self) -> &'static str {
        match self {
            Self::AuthRequired => "Jenkins requires authentication",
            Self::AuthInvalid => "Jenkins rejected the configured credentials",
            Self::NotFound => "Job has never been built",
            Self::ServerError => "Jenkins returned a server error",
            Self::ConnectionFailed => "Cannot connect to Jenkins",
            Self::HostNotFound => "Jenkins host could not be resolved",
            Self::Timeout => "Jenkins did not respond in time",
            Self::Unknown => "Unexpected response from Jenkins",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Success,
    Failed,
    InProgress,
    NotExecuted,
    Aborted,
    Unstable,
    PausedPendingInput,
    #[serde(other)]
    Unknown,
}

/// A named sub-step of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInfo {
    pub name: String,
    pub status: StageState,
    /// Epoch milliseconds
    pub start_time: Option<i64>,
    /// Milliseconds
    pub duration: Option<u64>,
}

/// Per-stage durations of the last successful run, keyed by stage name in run order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReference {
    pub build_number: Option<u64>,
    pub total_duration: Option<u64>,
    #[serde(default)]
    pub stage_durations: IndexMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStages {
    #[serde(default)]
    pub stages: Vec<StageInfo>,
    pub last_successful: Option<StageReference>,
}

/// Snapshot of one monitored CI job, rebuilt on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub name: String,
    pub status: PipelineState,
    #[serde(default)]
    pub building: bool,
    pub result: Option<String>,
    /// Start of the last build, epoch milliseconds
    pub timestamp: Option<i64>,
    pub duration: Option<u64>,
    pub last_build_number: Option<u64>,
    pub estimated_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<PipelineStages>,
}

impl PipelineStatus {
    /// A status with no build facts attached.
    pub fn new(name: impl Into<String>, status: PipelineState) -> Self {
        Self {
            name: name.into(),
            status,
            building: false,
            result: None,
            timestamp: None,
            duration: None,
            last_build_number: None,
            estimated_duration: None,
            url: None,
            error: false,
            error_type: None,
            error_message: None,
            stages: None,
        }
    }

    /// A job whose status could not be fetched. `not_found` maps to `never_built`.
    pub fn failed(name: impl Into<String>, error_type: ErrorType, message: impl Into<String>) -> Self {
        let status = if error_type == ErrorType::NotFound {
            PipelineState::NeverBuilt
        } else {
            PipelineState::Error
        };

        Self {
            error: true,
            error_type: Some(error_type),
            error_message: Some(message.into()),
            ..Self::new(name, status)
        }
    }

    fn reference(&self) -> Option<&StageReference> {
        self.stages.as_ref()?.last_successful.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub total: usize,
    pub running: usize,
    pub success: usize,
    pub failed: usize,
    pub pending: usize,
    pub error: usize,
    #[serde(default)]
    pub never_built: Option<usize>,
}

impl StatusSummary {
    pub fn from_pipelines(pipelines: &[PipelineStatus]) -> Self {
        let mut summary = Self {
            total: pipelines.len(),
            ..Self::default()
        };
        let mut never_built = 0;

        for pipeline in pipelines {
            if is_pipeline_error(pipeline) {
                summary.error += 1;
                continue;
            }
            match pipeline.status {
                PipelineState::Running => summary.running += 1,
                PipelineState::Success => summary.success += 1,
                PipelineState::Failure | PipelineState::Aborted | PipelineState::Unstable => {
                    summary.failed += 1;
                }
                PipelineState::Pending => summary.pending += 1,
                PipelineState::NeverBuilt => never_built += 1,
                PipelineState::Error | PipelineState::Unknown => summary.error += 1,
            }
        }

        summary.never_built = Some(never_built);
        summary
    }
}

/// Body of `GET /api/pipelines/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatusResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub jenkins_host: String,
    pub pipelines: Vec<PipelineStatus>,
    pub summary: StatusSummary,
}

/// True for genuine connectivity, auth or server faults. A job that was never
/// built reports `not_found` and is not an error.
pub fn is_pipeline_error(pipeline: &PipelineStatus) -> bool {
    pipeline.error && pipeline.error_type != Some(ErrorType::NotFound)
}

/// Estimated completion of an in-flight run, 0..=100.
///
/// The reference is the last successful run's total duration, or Jenkins'
/// own estimate when no successful run is on record.
pub fn calculate_pipeline_progress(pipeline: &PipelineStatus, now: DateTime<Utc>) -> u8 {
    if !pipeline.building {
        return 0;
    }

    let reference = pipeline
        .reference()
        .and_then(|r| r.total_duration)
        .or(pipeline.estimated_duration);

    match (pipeline.timestamp, reference) {
        (Some(start), Some(reference)) => progress_percent(now.timestamp_millis() - start, reference),
        _ => 0,
    }
}

/// Estimated completion of a running stage, using the duration the stage with
/// the same name took in the last successful run.
pub fn calculate_stage_progress(pipeline: &PipelineStatus, stage: &StageInfo, now: DateTime<Utc>) -> u8 {
    if stage.status != StageState::InProgress {
        return 0;
    }

    let reference = pipeline
        .reference()
        .and_then(|r| r.stage_durations.get(&stage.name).copied());

    match (stage.start_time, reference) {
        (Some(start), Some(reference)) => progress_percent(now.timestamp_millis() - start, reference),
        _ => 0,
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn progress_percent(elapsed_ms: i64, reference_ms: u64) -> u8 {
    if reference_ms == 0 {
        return 0;
    }
    let percent = (elapsed_ms as f64 / reference_ms as f64) * 100.0;
    percent.clamp(0.0, 100.0).round() as u8
}

/// URL a pipeline card opens when selected.
pub fn navigation_target(pipeline: &PipelineStatus, jenkins_host: &str) -> String {
    let host = jenkins_host.trim_end_matches('/');

    if is_pipeline_error(pipeline) {
        return format!("{host}/");
    }

    let job_url = crate::providers::jenkins::links::job_url(host, &pipeline.name);
    if pipeline.building {
        crate::providers::jenkins::links::console_url(&job_url, pipeline.last_build_number)
    } else {
        job_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ALL_FAULTS: [ErrorType; 7] = [
        ErrorType::AuthRequired,
        ErrorType::AuthInvalid,
        ErrorType::ServerError,
        ErrorType::ConnectionFailed,
        ErrorType::HostNotFound,
        ErrorType::Timeout,
        ErrorType::Unknown,
    ];

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_600_000).unwrap()
    }

    fn building_pipeline(started_ms_ago: i64, reference_ms: Option<u64>) -> PipelineStatus {
        PipelineStatus {
            building: true,
            timestamp: Some(now().timestamp_millis() - started_ms_ago),
            last_build_number: Some(42),
            stages: Some(PipelineStages {
                stages: vec![],
                last_successful: Some(StageReference {
                    build_number: Some(41),
                    total_duration: reference_ms,
                    stage_durations: IndexMap::new(),
                }),
            }),
            ..PipelineStatus::new("backend-ci", PipelineState::Running)
        }
    }

    #[test]
    fn test_live_states() {
        let live = [PipelineState::Running, PipelineState::Pending];
        let settled = [
            PipelineState::Success,
            PipelineState::Failure,
            PipelineState::Aborted,
            PipelineState::Unstable,
            PipelineState::Error,
            PipelineState::NeverBuilt,
            PipelineState::Unknown,
        ];

        for state in live {
            assert!(state.is_live(), "{state:?}");
        }
        for state in settled {
            assert!(!state.is_live(), "{state:?}");
        }
    }

    #[test]
    fn test_not_found_is_never_an_error() {
        let pipeline = PipelineStatus::failed("frontend-ci", ErrorType::NotFound, "404");
        assert!(!is_pipeline_error(&pipeline));
        assert_eq!(pipeline.status, PipelineState::NeverBuilt);
    }

    #[test]
    fn test_faults_are_errors() {
        for error_type in ALL_FAULTS {
            let pipeline = PipelineStatus::failed("backend-ci", error_type, "boom");
            assert!(is_pipeline_error(&pipeline), "{error_type:?}");
            assert_eq!(pipeline.status, PipelineState::Error);
        }
    }

    #[test]
    fn test_error_type_without_error_flag_is_not_an_error() {
        let mut pipeline = PipelineStatus::new("backend-ci", PipelineState::Success);
        pipeline.error_type = Some(ErrorType::Timeout);
        assert!(!is_pipeline_error(&pipeline));
    }

    #[test]
    fn test_progress_is_zero_when_not_building() {
        let mut pipeline = building_pipeline(60_000, Some(120_000));
        pipeline.building = false;
        pipeline.status = PipelineState::Success;
        assert_eq!(calculate_pipeline_progress(&pipeline, now()), 0);
    }

    #[test]
    fn test_progress_halfway() {
        let pipeline = building_pipeline(60_000, Some(120_000));
        assert_eq!(calculate_pipeline_progress(&pipeline, now()), 50);
    }

    #[test]
    fn test_progress_caps_at_one_hundred() {
        assert_eq!(calculate_pipeline_progress(&building_pipeline(120_000, Some(120_000)), now()), 100);
        assert_eq!(calculate_pipeline_progress(&building_pipeline(500_000, Some(120_000)), now()), 100);
    }

    #[test]
    fn test_progress_stays_in_range() {
        for (elapsed, reference) in [(1, 3), (10, 7), (999, 1000), (33_333, 100_000)] {
            let progress = calculate_pipeline_progress(&building_pipeline(elapsed, Some(reference)), now());
            assert!(progress <= 100);
        }
    }

    #[test]
    fn test_progress_clamps_future_start() {
        let pipeline = building_pipeline(-5_000, Some(120_000));
        assert_eq!(calculate_pipeline_progress(&pipeline, now()), 0);
    }

    #[test]
    fn test_progress_without_reference_is_zero() {
        let mut pipeline = building_pipeline(60_000, None);
        assert_eq!(calculate_pipeline_progress(&pipeline, now()), 0);

        pipeline.stages = None;
        assert_eq!(calculate_pipeline_progress(&pipeline, now()), 0);
    }

    #[test]
    fn test_progress_falls_back_to_estimated_duration() {
        let mut pipeline = building_pipeline(30_000, None);
        pipeline.estimated_duration = Some(120_000);
        assert_eq!(calculate_pipeline_progress(&pipeline, now()), 25);
    }

    #[test]
    fn test_stage_progress_matches_reference_by_name() {
        let mut pipeline = building_pipeline(90_000, Some(300_000));
        if let Some(reference) = pipeline.stages.as_mut().and_then(|s| s.last_successful.as_mut()) {
            reference.stage_durations.insert("Checkout".to_string(), 10_000);
            reference.stage_durations.insert("Test".to_string(), 80_000);
        }

        let stage = StageInfo {
            name: "Test".to_string(),
            status: StageState::InProgress,
            start_time: Some(now().timestamp_millis() - 20_000),
            duration: None,
        };
        assert_eq!(calculate_stage_progress(&pipeline, &stage, now()), 25);

        let unknown = StageInfo {
            name: "Deploy".to_string(),
            ..stage.clone()
        };
        assert_eq!(calculate_stage_progress(&pipeline, &unknown, now()), 0);

        let finished = StageInfo {
            status: StageState::Success,
            ..stage
        };
        assert_eq!(calculate_stage_progress(&pipeline, &finished, now()), 0);
    }

    #[test]
    fn test_summary_counts() {
        let pipelines = vec![
            PipelineStatus::new("a", PipelineState::Running),
            PipelineStatus::new("b", PipelineState::Success),
            PipelineStatus::new("c", PipelineState::Failure),
            PipelineStatus::new("d", PipelineState::Unstable),
            PipelineStatus::new("e", PipelineState::Pending),
            PipelineStatus::failed("f", ErrorType::NotFound, "never built"),
            PipelineStatus::failed("g", ErrorType::Timeout, "slow"),
        ];

        let summary = StatusSummary::from_pipelines(&pipelines);
        assert_eq!(summary.total, 7);
        assert_eq!(summary.running, 1);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.error, 1);
        assert_eq!(summary.never_built, Some(1));
    }

    #[test]
    fn test_navigation_targets() {
        let host = "http://jenkins.local:8080/";

        let idle = PipelineStatus::new("backend ci", PipelineState::Success);
        assert_eq!(navigation_target(&idle, host), "http://jenkins.local:8080/job/backend%20ci/");

        let running = building_pipeline(1_000, None);
        assert_eq!(
            navigation_target(&running, host),
            "http://jenkins.local:8080/job/backend-ci/42/console"
        );

        let broken = PipelineStatus::failed("backend-ci", ErrorType::AuthInvalid, "401");
        assert_eq!(navigation_target(&broken, host), "http://jenkins.local:8080/");
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{
            "name": "backend-ci",
            "status": "never_built",
            "building": false,
            "result": null,
            "timestamp": null,
            "duration": null,
            "lastBuildNumber": null,
            "estimatedDuration": null,
            "error": true,
            "errorType": "not_found"
        }"#;
        let pipeline: PipelineStatus = serde_json::from_str(json).unwrap();
        assert_eq!(pipeline.status, PipelineState::NeverBuilt);
        assert_eq!(pipeline.error_type, Some(ErrorType::NotFound));

        let value = serde_json::to_value(PipelineStatus::new("x", PipelineState::Running)).unwrap();
        assert_eq!(value["status"], "running");
        assert!(value.get("lastBuildNumber").is_some());
        assert!(value.get("errorType").is_none());
    }

    #[test]
    fn test_unrecognised_states_fail_closed() {
        let state: PipelineState = serde_json::from_str("\"exploded\"").unwrap();
        assert_eq!(state, PipelineState::Unknown);
        let error_type: ErrorType = serde_json::from_str("\"gremlins\"").unwrap();
        assert_eq!(error_type, ErrorType::Unknown);
    }
}
