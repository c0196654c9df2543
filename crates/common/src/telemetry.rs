//! Tracing subscriber setup shared by the binaries

use crate::config::ObservabilityConfig;
use tracing_subscriber::EnvFilter;

/// Where formatted log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    /// Keeps stdout free for interactive output
    Stderr,
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_tracing(config: &ObservabilityConfig, target: LogTarget) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match (config.json_logging, target) {
        (true, LogTarget::Stdout) => builder.json().init(),
        (true, LogTarget::Stderr) => builder.json().with_writer(std::io::stderr).init(),
        (false, LogTarget::Stdout) => builder.init(),
        (false, LogTarget::Stderr) => builder.with_writer(std::io::stderr).init(),
    }
}
