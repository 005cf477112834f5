//! Command-line arguments.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use remote_console_session::{ClientConfig, config::DEFAULT_SERVER_URL};
use tracing::level_filters::LevelFilter;

/// Operator console for a remote command session.
#[derive(Parser, Debug)]
#[command(name = "remote-console", version)]
pub struct Cli {
    /// WebSocket endpoint of the control server.
    #[arg(long, short = 's', env = "REMOTE_CONSOLE_SERVER", default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Seconds to wait before re-dialing an unreachable server.
    #[arg(long, env = "REMOTE_CONSOLE_RETRY_SECS", default_value_t = 10)]
    pub retry_secs: u64,

    /// Diagnostic log level (written to stderr). `RUST_LOG` takes precedence.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

impl Cli {
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.server.clone())
            .with_retry_interval(Duration::from_secs(self.retry_secs))
    }
}

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    #[must_use]
    pub const fn to_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}
