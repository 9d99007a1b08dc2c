use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::pipeline::{PipelineState, StageState};

const BAR_WIDTH: usize = 20;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn color_coded_state_cell(state: PipelineState) -> Cell {
    let cell = Cell::new(state.label());
    match state {
        PipelineState::Success => cell.fg(TableColor::Green),
        PipelineState::Running | PipelineState::Pending | PipelineState::Unstable => {
            cell.fg(TableColor::Yellow)
        }
        PipelineState::Failure | PipelineState::Error => cell.fg(TableColor::Red),
        PipelineState::Aborted | PipelineState::Unknown | PipelineState::NeverBuilt => {
            cell.fg(TableColor::DarkGrey)
        }
    }
}

pub fn color_coded_stage_cell(state: StageState) -> Cell {
    let (text, color) = match state {
        StageState::Success => ("success", TableColor::Green),
        StageState::Failed => ("failed", TableColor::Red),
        StageState::InProgress => ("in progress", TableColor::Yellow),
        StageState::PausedPendingInput => ("waiting for input", TableColor::Yellow),
        StageState::Unstable => ("unstable", TableColor::Yellow),
        StageState::Aborted => ("aborted", TableColor::DarkGrey),
        StageState::NotExecuted => ("skipped", TableColor::DarkGrey),
        StageState::Unknown => ("unknown", TableColor::DarkGrey),
    };
    Cell::new(text).fg(color)
}

/// Text progress bar, e.g. `██████████░░░░░░░░░░  50%`.
pub fn progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = usize::from(percent) * BAR_WIDTH / 100;
    format!(
        "{}{} {percent:>3}%",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled)
    )
}

/// Milliseconds as `1h 02m`, `3m 07s` or `42s`.
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1000;
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}h {m:02}m")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}
