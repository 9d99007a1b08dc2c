use std::fmt::Write;

use chrono::{DateTime, TimeZone, Utc};
use comfy_table::Cell;

use crate::dashboard::{DashboardState, DashboardView, PipelineCard};
use crate::pipeline::{ErrorType, PipelineStatus, StatusSummary};

use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim, state_styled};
use super::tables::{
    color_coded_stage_cell, color_coded_state_cell, create_table, format_duration, header,
    progress_bar,
};

/// Prints the dashboard for the current state to stdout.
pub fn print_dashboard(state: &DashboardState) {
    println!("{}", render_dashboard(state, Utc::now()));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn format_started(timestamp: Option<i64>, now: DateTime<Utc>) -> String {
    let Some(started) = timestamp.and_then(|ms| Utc.timestamp_millis_opt(ms).single()) else {
        return "-".to_string();
    };
    let ago = now.signed_duration_since(started);
    if ago.num_minutes() < 1 {
        "just now".to_string()
    } else if ago.num_hours() < 1 {
        format!("{}m ago", ago.num_minutes())
    } else if ago.num_days() < 1 {
        format!("{}h ago", ago.num_hours())
    } else {
        started.format("%Y-%m-%d %H:%M").to_string()
    }
}

fn render_summary_line(output: &mut String, summary: &StatusSummary) {
    let _ = writeln!(
        output,
        "  {} {}  {} {}  {} {}  {} {}  {} {}  {} {}  {} {}\n",
        dim("Total:"),
        bright(summary.total),
        dim("Running:"),
        bright_yellow(summary.running),
        dim("Success:"),
        bright_green(summary.success),
        dim("Failed:"),
        bright_red(summary.failed),
        dim("Pending:"),
        bright_yellow(summary.pending),
        dim("Errors:"),
        bright_red(summary.error),
        dim("Never built:"),
        dim(summary.never_built.unwrap_or(0)),
    );
}

fn render_connection_issue(
    output: &mut String,
    error_type: ErrorType,
    message: Option<&str>,
    affected: usize,
    jenkins_host: Option<&str>,
) {
    let _ = writeln!(output, "{}", bright_red("⚠ Jenkins Connection Issue").bold());
    let _ = writeln!(output, "  {}", error_type.describe());
    if let Some(message) = message {
        let _ = writeln!(output, "  {} {}", dim("Details:"), message);
    }
    let _ = writeln!(output, "  {} {affected}", dim("Pipelines affected:"));
    if let Some(host) = jenkins_host {
        let _ = writeln!(output, "  {} {}", dim("Check Jenkins at"), cyan(host));
    }
}

fn render_failed_card(output: &mut String, pipeline: &PipelineStatus) {
    let description = pipeline
        .error_type
        .map_or("Status unavailable", ErrorType::describe);
    let _ = write!(
        output,
        "  {} {} {}",
        bright_red("✖"),
        bright(&pipeline.name),
        dim(description)
    );
    if let Some(message) = &pipeline.error_message {
        let _ = write!(output, " {}", dim(format!("({message})")));
    }
    output.push('\n');
}

#[allow(clippy::too_many_lines)]
pub fn render_dashboard(state: &DashboardState, now: DateTime<Utc>) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "🚦", "Pipeline Status");

    if let Some(host) = &state.jenkins_host {
        let _ = write!(output, "  {} {}", dim("Jenkins:"), cyan(host));
    }
    if let Some(updated) = state.last_updated {
        let _ = write!(output, "  {} {}", dim("Last updated:"), dim(updated.format("%H:%M:%S UTC")));
    }
    output.push_str("\n\n");

    let view = DashboardView::build(state, now);

    let cards = match view {
        DashboardView::Loading => {
            let _ = writeln!(output, "{}", bright_yellow("Loading pipeline status..."));
            return output;
        }
        DashboardView::FetchFailed(message) => {
            let _ = writeln!(output, "{} {}", bright_red("✖"), bright_red(message));
            return output;
        }
        DashboardView::Empty => {
            let _ = writeln!(output, "{}", bright_yellow("No pipelines are being monitored."));
            return output;
        }
        DashboardView::ConnectionIssue {
            error_type,
            message,
            affected,
        } => {
            render_connection_issue(&mut output, error_type, message, affected, state.jenkins_host.as_deref());
            return output;
        }
        DashboardView::Cards(cards) => cards,
    };

    if let Some(summary) = &state.summary {
        render_summary_line(&mut output, summary);
    }

    let mut table = create_table();
    table.set_header(header(&["Pipeline", "Status", "Build", "Progress", "Started", "Duration"]));

    let mut failed = Vec::new();
    let mut live = Vec::new();

    for card in &cards {
        let pipeline = card.pipeline();
        match card {
            PipelineCard::Failed(_) => {
                failed.push(pipeline);
                table.add_row(vec![
                    Cell::new(&pipeline.name),
                    color_coded_state_cell(pipeline.status),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                ]);
            }
            PipelineCard::Normal { progress, stages, .. } => {
                let progress_text = if pipeline.building {
                    progress_bar(*progress)
                } else {
                    "-".to_string()
                };
                table.add_row(vec![
                    Cell::new(&pipeline.name),
                    color_coded_state_cell(pipeline.status),
                    Cell::new(pipeline.last_build_number.map_or_else(|| "-".to_string(), |n| format!("#{n}"))),
                    Cell::new(progress_text),
                    Cell::new(format_started(pipeline.timestamp, now)),
                    Cell::new(pipeline.duration.map_or_else(|| "-".to_string(), format_duration)),
                ]);
                if pipeline.status.is_live() && !stages.is_empty() {
                    live.push((pipeline, stages));
                }
            }
        }
    }

    let _ = writeln!(output, "{table}\n");

    for (pipeline, stages) in live {
        let _ = writeln!(
            output,
            "{} {} {}",
            bright("▶"),
            bright(&pipeline.name),
            state_styled(pipeline.status)
        );

        let mut stage_table = create_table();
        stage_table.set_header(header(&["Stage", "Status", "Progress", "Duration"]));
        for line in stages {
            stage_table.add_row(vec![
                Cell::new(&line.stage.name),
                color_coded_stage_cell(line.stage.status),
                Cell::new(progress_bar(line.progress)),
                Cell::new(line.stage.duration.map_or_else(|| "-".to_string(), format_duration)),
            ]);
        }
        let _ = writeln!(output, "{stage_table}\n");
    }

    if !failed.is_empty() {
        add_section_header(&mut output, "⚠️", "Unavailable Pipelines");
        for pipeline in failed {
            render_failed_card(&mut output, pipeline);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::fetch::FetchError;
    use crate::pipeline::{PipelineState, PipelineStatusResponse, PipelineStages, StageInfo, StageReference, StageState};

    fn state_with(pipelines: Vec<PipelineStatus>) -> DashboardState {
        let mut state = DashboardState::default();
        state.apply(
            1,
            Ok(PipelineStatusResponse {
                success: true,
                timestamp: Utc::now(),
                jenkins_host: "http://jenkins:8080".to_string(),
                summary: StatusSummary::from_pipelines(&pipelines),
                pipelines,
            }),
            Utc::now(),
        );
        state
    }

    #[test]
    fn test_render_loading() {
        let output = render_dashboard(&DashboardState::default(), Utc::now());
        assert!(output.contains("Loading pipeline status"));
    }

    #[test]
    fn test_render_fetch_failure() {
        let mut state = DashboardState::default();
        state.apply(1, Err(FetchError::Unreachable("http://localhost:5000".into())), Utc::now());

        let output = render_dashboard(&state, Utc::now());
        assert!(output.contains("Cannot connect to backend server at http://localhost:5000"));
    }

    #[test]
    fn test_render_aggregate_banner() {
        let state = state_with(vec![
            PipelineStatus::failed("backend-ci", ErrorType::ConnectionFailed, "connection refused"),
            PipelineStatus::failed("frontend-ci", ErrorType::ConnectionFailed, "connection refused"),
        ]);

        let output = render_dashboard(&state, Utc::now());
        assert_eq!(output.matches("Jenkins Connection Issue").count(), 1);
        assert!(output.contains("Pipelines affected: 2"));
        assert!(!output.contains("Unavailable Pipelines"));
    }

    #[test]
    fn test_render_mixed_cards() {
        let state = state_with(vec![
            PipelineStatus::failed("backend-ci", ErrorType::AuthInvalid, "HTTP 401"),
            PipelineStatus::failed("frontend-ci", ErrorType::AuthInvalid, "HTTP 401"),
            PipelineStatus::failed("infra-ci", ErrorType::NotFound, "never built"),
        ]);

        let output = render_dashboard(&state, Utc::now());
        assert!(!output.contains("Jenkins Connection Issue"));
        assert!(output.contains("Unavailable Pipelines"));
        assert!(output.contains("never built"));
        assert_eq!(output.matches("Jenkins rejected the configured credentials").count(), 2);
    }

    #[test]
    fn test_render_running_pipeline_with_stages() {
        let now = Utc::now();
        let started = now.timestamp_millis() - 30_000;
        let pipeline = PipelineStatus {
            building: true,
            timestamp: Some(started),
            last_build_number: Some(9),
            stages: Some(PipelineStages {
                stages: vec![StageInfo {
                    name: "Build".to_string(),
                    status: StageState::InProgress,
                    start_time: Some(started),
                    duration: None,
                }],
                last_successful: Some(StageReference {
                    build_number: Some(8),
                    total_duration: Some(60_000),
                    stage_durations: [("Build".to_string(), 60_000)].into_iter().collect(),
                }),
            }),
            ..PipelineStatus::new("backend-ci", PipelineState::Running)
        };

        let output = render_dashboard(&state_with(vec![pipeline]), now);
        assert!(output.contains("#9"));
        assert!(output.contains("50%"));
        assert!(output.contains("▶"));
        assert!(output.contains("in progress"));
    }

    #[test]
    fn test_settled_pipeline_has_no_stage_table() {
        let pipeline = PipelineStatus {
            result: Some("SUCCESS".to_string()),
            last_build_number: Some(12),
            duration: Some(61_000),
            stages: Some(PipelineStages {
                stages: vec![StageInfo {
                    name: "Build".to_string(),
                    status: StageState::Success,
                    start_time: Some(1_700_000_000_000),
                    duration: Some(61_000),
                }],
                last_successful: None,
            }),
            ..PipelineStatus::new("backend-ci", PipelineState::Success)
        };

        let output = render_dashboard(&state_with(vec![pipeline]), Utc::now());
        assert!(output.contains("#12"));
        assert!(!output.contains("▶"));
    }

    #[test]
    fn test_format_started() {
        let now = Utc::now();
        assert_eq!(format_started(None, now), "-");
        assert_eq!(format_started(Some(now.timestamp_millis() - 5 * 60_000), now), "5m ago");
        assert_eq!(format_started(Some(now.timestamp_millis() - 3 * 3_600_000), now), "3h ago");
    }
}
