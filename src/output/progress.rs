use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_green, bright_red, bright_yellow};

/// Spinner shown on stderr while a one-shot status fetch is in flight
pub struct FetchProgress {
    pb: ProgressBar,
}

impl FetchProgress {
    pub fn start(endpoint: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("  {msg} {spinner}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(bright_yellow(format!("Fetching pipeline status from {endpoint}")).to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(self, ok: bool) {
        if ok {
            self.pb
                .finish_with_message(bright_green("Pipeline status fetched ✓").to_string());
        } else {
            self.pb
                .finish_with_message(bright_red("Pipeline status unavailable ✗").to_string());
        }
        eprintln!();
    }
}
