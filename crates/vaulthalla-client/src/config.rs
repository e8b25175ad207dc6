//! Channel configuration.
//!
//! Loads the backend endpoint and timing knobs from environment variables
//! with sensible defaults. All settings can be overridden via the variables
//! listed on [`ChannelConfig::from_env`].

use std::time::Duration;

/// Default WebSocket port of the Vaulthalla backend.
pub const DEFAULT_PORT: u16 = 33369;
/// Default backend host.
pub const DEFAULT_HOST: &str = "localhost";
/// Time a request may wait for its response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Fixed delay before the single reconnect attempt after a close.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2000);
/// Refresh attempts per unauthorized signal before forcing logout.
pub const DEFAULT_MAX_REFRESH_ATTEMPTS: u32 = 3;

/// Channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Full endpoint URL, e.g. `ws://localhost:33369`.
    pub url: String,
    /// How long `send_command` waits for a response. Default: 10 seconds.
    pub request_timeout: Duration,
    /// Delay before reconnecting after an unexpected close. Default: 2 seconds.
    pub reconnect_delay: Duration,
    /// Refresh attempts before the credential source is logged out. Default: 3.
    pub max_refresh_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: endpoint(DEFAULT_HOST, DEFAULT_PORT, false),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_refresh_attempts: DEFAULT_MAX_REFRESH_ATTEMPTS,
        }
    }
}

impl ChannelConfig {
    /// Configuration pointing at `url` with default timings.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `VAULTHALLA_WS_URL`: full endpoint URL (overrides the three below)
    /// - `WEBSOCKET_HOST`: backend host (default: `localhost`)
    /// - `WEBSOCKET_PORT`: backend port (default: `33369`)
    /// - `WEBSOCKET_SECURE`: `true`/`1` selects `wss://` (default: `false`)
    /// - `VAULTHALLA_REQUEST_TIMEOUT_MS`: request timeout (default: `10000`)
    /// - `VAULTHALLA_RECONNECT_DELAY_MS`: reconnect delay (default: `2000`)
    /// - `VAULTHALLA_MAX_REFRESH_ATTEMPTS`: refresh attempts (default: `3`)
    #[must_use]
    pub fn from_env() -> Self {
        let url = std::env::var("VAULTHALLA_WS_URL").unwrap_or_else(|_| {
            let host =
                std::env::var("WEBSOCKET_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned());
            let port = std::env::var("WEBSOCKET_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT);
            let secure = std::env::var("WEBSOCKET_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false);
            endpoint(&host, port, secure)
        });

        let request_timeout = env_millis("VAULTHALLA_REQUEST_TIMEOUT_MS")
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let reconnect_delay = env_millis("VAULTHALLA_RECONNECT_DELAY_MS")
            .unwrap_or(DEFAULT_RECONNECT_DELAY);
        let max_refresh_attempts = std::env::var("VAULTHALLA_MAX_REFRESH_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_REFRESH_ATTEMPTS);

        Self {
            url,
            request_timeout,
            reconnect_delay,
            max_refresh_attempts,
        }
    }
}

/// Build the endpoint URL; `secure` selects `wss` the way an HTTPS page would.
pub fn endpoint(host: &str, port: u16, secure: bool) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    format!("{scheme}://{host}:{port}")
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}
