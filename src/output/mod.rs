mod dashboard;
mod progress;
mod styling;
mod tables;

pub use dashboard::print_dashboard;
pub use progress::FetchProgress;
pub use styling::dim;

use styling::magenta_bold;

/// Prints the `DevOpsLab` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🚀 DevOpsLab"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Deployment patterns lab and Jenkins pipeline dashboard")
    );
}
