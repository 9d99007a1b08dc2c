use chrono::{DateTime, Utc};

use crate::pipeline::{
    calculate_pipeline_progress, calculate_stage_progress, is_pipeline_error, ErrorType,
    PipelineStatus, StageInfo,
};

use super::state::DashboardState;

/// A stage row with its estimated progress.
#[derive(Debug)]
pub struct StageLine<'a> {
    pub stage: &'a StageInfo,
    pub progress: u8,
}

#[derive(Debug)]
pub enum PipelineCard<'a> {
    /// Genuine fault reading this job from Jenkins.
    Failed(&'a PipelineStatus),
    /// Everything else, never-built jobs included.
    Normal {
        pipeline: &'a PipelineStatus,
        progress: u8,
        stages: Vec<StageLine<'a>>,
    },
}

impl PipelineCard<'_> {
    pub fn pipeline(&self) -> &PipelineStatus {
        match self {
            Self::Failed(pipeline) | Self::Normal { pipeline, .. } => pipeline,
        }
    }
}

/// Render model derived from a [`DashboardState`].
#[derive(Debug)]
pub enum DashboardView<'a> {
    Loading,
    FetchFailed(&'a str),
    /// Every pipeline failed for the same reason: one banner instead of N cards.
    ConnectionIssue {
        error_type: ErrorType,
        message: Option<&'a str>,
        affected: usize,
    },
    Empty,
    Cards(Vec<PipelineCard<'a>>),
}

impl<'a> DashboardView<'a> {
    pub fn build(state: &'a DashboardState, now: DateTime<Utc>) -> Self {
        if let Some(error) = &state.error {
            return Self::FetchFailed(error);
        }
        if state.is_loading() {
            return Self::Loading;
        }
        if state.pipelines.is_empty() {
            return Self::Empty;
        }

        if let Some(error_type) = shared_error_type(&state.pipelines) {
            return Self::ConnectionIssue {
                error_type,
                message: state.pipelines[0].error_message.as_deref(),
                affected: state.pipelines.len(),
            };
        }

        Self::Cards(state.pipelines.iter().map(|p| card(p, now)).collect())
    }
}

/// The error type shared by all pipelines, when every one is a genuine fault of the same kind.
pub fn shared_error_type(pipelines: &[PipelineStatus]) -> Option<ErrorType> {
    let first = pipelines.first()?;
    if !is_pipeline_error(first) {
        return None;
    }
    let error_type = first.error_type?;

    pipelines
        .iter()
        .all(|p| is_pipeline_error(p) && p.error_type == Some(error_type))
        .then_some(error_type)
}

fn card(pipeline: &PipelineStatus, now: DateTime<Utc>) -> PipelineCard<'_> {
    if is_pipeline_error(pipeline) {
        return PipelineCard::Failed(pipeline);
    }

    let stages = pipeline
        .stages
        .iter()
        .flat_map(|s| &s.stages)
        .map(|stage| StageLine {
            stage,
            progress: calculate_stage_progress(pipeline, stage, now),
        })
        .collect();

    PipelineCard::Normal {
        pipeline,
        progress: calculate_pipeline_progress(pipeline, now),
        stages,
    }
}
