//! Diagnostic logging setup.

use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Install the global subscriber. Logs go to stderr so they never mix with
/// session output on stdout.
///
/// # Errors
/// Returns error if a global subscriber is already installed.
pub fn init(level: LogLevel) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.to_filter().into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(level >= LogLevel::Debug)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to configure logger: {e}"))
}
