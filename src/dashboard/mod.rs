//! Client side of the pipeline status widget: fetch, apply, derive, poll.

pub(crate) mod fetch;
mod poller;
mod state;
mod view;

pub use fetch::StatusFetcher;
pub use poller::Poller;
pub use state::DashboardState;
pub use view::{DashboardView, PipelineCard};
