use serde::Deserialize;

use crate::pipeline::{StageInfo, StageReference, StageState};

/// Query string limiting `job/<name>/api/json` to the fields we read.
pub const JOB_TREE: &str =
    "url,inQueue,lastBuild[number,building,result,timestamp,duration,estimatedDuration]";

/// A Jenkins job as returned by `job/<name>/api/json`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsJob {
    pub url: Option<String>,
    #[serde(default)]
    pub in_queue: bool,
    pub last_build: Option<JenkinsBuild>,
}

/// A single build of a job.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsBuild {
    pub number: u64,
    #[serde(default)]
    pub building: bool,
    /// `SUCCESS`, `FAILURE`, `ABORTED`, `UNSTABLE`, `NOT_BUILT`, or null while running
    pub result: Option<String>,
    /// Build start, epoch milliseconds
    pub timestamp: Option<i64>,
    pub duration: Option<u64>,
    /// Jenkins reports -1 when it has no estimate
    pub estimated_duration: Option<i64>,
}

impl JenkinsBuild {
    pub fn estimate(&self) -> Option<u64> {
        self.estimated_duration
            .and_then(|ms| u64::try_from(ms).ok())
            .filter(|ms| *ms > 0)
    }
}

/// A pipeline run as described by the workflow REST API (`wfapi/describe`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub id: Option<String>,
    pub duration_millis: Option<u64>,
    #[serde(default)]
    pub stages: Vec<WorkflowStage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStage {
    pub name: String,
    pub status: String,
    pub start_time_millis: Option<i64>,
    pub duration_millis: Option<u64>,
}

pub fn stage_state(status: &str) -> StageState {
    match status {
        "SUCCESS" => StageState::Success,
        "FAILED" | "FAILURE" => StageState::Failed,
        "IN_PROGRESS" => StageState::InProgress,
        "NOT_EXECUTED" => StageState::NotExecuted,
        "ABORTED" => StageState::Aborted,
        "UNSTABLE" => StageState::Unstable,
        "PAUSED_PENDING_INPUT" => StageState::PausedPendingInput,
        _ => StageState::Unknown,
    }
}

impl WorkflowRun {
    pub fn stage_infos(&self) -> Vec<StageInfo> {
        self.stages
            .iter()
            .map(|stage| {
                let status = stage_state(&stage.status);
                StageInfo {
                    name: stage.name.clone(),
                    status,
                    start_time: stage.start_time_millis,
                    // Jenkins reports elapsed-so-far for running stages
                    duration: stage
                        .duration_millis
                        .filter(|_| status != StageState::InProgress),
                }
            })
            .collect()
    }

    /// Durations of this run used as the yardstick for a later run.
    pub fn to_reference(&self) -> StageReference {
        StageReference {
            build_number: self.id.as_deref().and_then(|id| id.parse().ok()),
            total_duration: self.duration_millis.filter(|ms| *ms > 0),
            stage_durations: self
                .stages
                .iter()
                .filter_map(|stage| Some((stage.name.clone(), stage.duration_millis?)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIBE: &str = r##"{
        "id": "41",
        "name": "#41",
        "status": "SUCCESS",
        "startTimeMillis": 1700000000000,
        "durationMillis": 95000,
        "stages": [
            {"id": "6", "name": "Checkout", "status": "SUCCESS", "startTimeMillis": 1700000000100, "durationMillis": 5000},
            {"id": "12", "name": "Test", "status": "SUCCESS", "startTimeMillis": 1700000005100, "durationMillis": 60000},
            {"id": "20", "name": "Deploy", "status": "IN_PROGRESS", "startTimeMillis": 1700000065100, "durationMillis": 30000}
        ]
    }"##;

    #[test]
    fn test_parse_workflow_run() {
        let run: WorkflowRun = serde_json::from_str(DESCRIBE).unwrap();
        let stages = run.stage_infos();

        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0].status, StageState::Success);
        assert_eq!(stages[1].duration, Some(60_000));
        assert_eq!(stages[2].status, StageState::InProgress);
        assert_eq!(stages[2].duration, None);
    }

    #[test]
    fn test_reference_keeps_stage_order() {
        let run: WorkflowRun = serde_json::from_str(DESCRIBE).unwrap();
        let reference = run.to_reference();

        assert_eq!(reference.build_number, Some(41));
        assert_eq!(reference.total_duration, Some(95_000));
        let names: Vec<_> = reference.stage_durations.keys().cloned().collect();
        assert_eq!(names, vec!["Checkout", "Test", "Deploy"]);
    }

    #[test]
    fn test_parse_job_from_tree_query() {
        let job: JenkinsJob = serde_json::from_str(
            r#"{"_class": "org.jenkinsci.plugins.workflow.job.WorkflowJob",
                "url": "http://jenkins:8080/job/backend-ci/", "inQueue": false,
                "lastBuild": {"number": 7, "building": false, "result": "SUCCESS"}}"#,
        )
        .unwrap();

        assert_eq!(job.url.as_deref(), Some("http://jenkins:8080/job/backend-ci/"));
        assert!(!job.in_queue);
        assert_eq!(job.last_build.map(|b| b.number), Some(7));
        assert!(!JOB_TREE.contains("name"));
    }

    #[test]
    fn test_missing_estimate() {
        let build: JenkinsBuild =
            serde_json::from_str(r#"{"number": 3, "building": true, "estimatedDuration": -1}"#).unwrap();
        assert_eq!(build.estimate(), None);
    }

    #[test]
    fn test_stage_state_mapping() {
        assert_eq!(stage_state("PAUSED_PENDING_INPUT"), StageState::PausedPendingInput);
        assert_eq!(stage_state("SOMETHING_NEW"), StageState::Unknown);
    }
}
