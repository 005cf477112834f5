//! Client configuration.

use std::time::Duration;

/// Control server endpoint used when none is configured.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:22233/ws";

/// Pause between failed dial attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Settings for the reconnect loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket endpoint of the control server.
    pub server_url: String,
    /// Fixed backoff before re-dialing after a failed connect.
    pub retry_interval: Duration,
}

impl ClientConfig {
    /// Configuration for the given endpoint with the default backoff.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Override the retry interval.
    #[must_use]
    pub const fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}
