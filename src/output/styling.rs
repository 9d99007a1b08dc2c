use console::{style, StyledObject};

use crate::pipeline::PipelineState;

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Colour for a pipeline state: green good, yellow live or degraded, red bad.
pub fn state_styled(state: PipelineState) -> StyledObject<String> {
    match state {
        PipelineState::Success => bright_green(state.label()),
        PipelineState::Running | PipelineState::Pending | PipelineState::Unstable => {
            bright_yellow(state.label())
        }
        PipelineState::Failure | PipelineState::Error => bright_red(state.label()),
        PipelineState::Aborted | PipelineState::Unknown | PipelineState::NeverBuilt => dim(state.label()),
    }
}
