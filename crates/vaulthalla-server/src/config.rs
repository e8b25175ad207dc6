//! Server configuration for the session probe.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `VAULTHALLA_*` environment variables.

use std::net::SocketAddr;
use std::time::Duration;

/// Default listen port when neither `VAULTHALLA_BIND_ADDR` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 36968;

/// Cookie the dashboard stores its refresh session under.
pub const DEFAULT_SESSION_COOKIE: &str = "refresh";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Origin that validates sessions; the probe calls `{upstream_url}/auth/session`.
    pub upstream_url: String,
    /// Name of the session cookie forwarded upstream.
    pub session_cookie: String,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Upper bound on a single upstream round trip.
    pub probe_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            upstream_url: "http://localhost:36969".to_owned(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_owned(),
            log_level: "info".to_owned(),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on (binds to `0.0.0.0`)
    /// - `VAULTHALLA_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:36968`)
    /// - `VAULTHALLA_UPSTREAM_URL`: session origin (default: `http://localhost:36969`)
    /// - `VAULTHALLA_SESSION_COOKIE`: cookie to forward (default: `refresh`)
    /// - `VAULTHALLA_LOG_LEVEL`: log filter (default: `info`)
    /// - `VAULTHALLA_PROBE_TIMEOUT_MS`: upstream timeout (default: `5000`)
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        // Priority: VAULTHALLA_BIND_ADDR > PORT > default
        let bind_addr = if let Ok(addr) = std::env::var("VAULTHALLA_BIND_ADDR") {
            addr.parse().unwrap_or(defaults.bind_addr)
        } else if let Ok(port_str) = std::env::var("PORT") {
            let port: u16 = port_str.parse().unwrap_or(DEFAULT_PORT);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            defaults.bind_addr
        };

        let upstream_url = std::env::var("VAULTHALLA_UPSTREAM_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or(defaults.upstream_url, |v| v.trim_end_matches('/').to_owned());

        let session_cookie = std::env::var("VAULTHALLA_SESSION_COOKIE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.session_cookie);

        let log_level = std::env::var("VAULTHALLA_LOG_LEVEL").unwrap_or(defaults.log_level);

        let probe_timeout = std::env::var("VAULTHALLA_PROBE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(defaults.probe_timeout, Duration::from_millis);

        Self {
            bind_addr,
            upstream_url,
            session_cookie,
            log_level,
            probe_timeout,
        }
    }

    /// Full URL of the upstream session endpoint.
    pub fn session_endpoint(&self) -> String {
        format!("{}/auth/session", self.upstream_url.trim_end_matches('/'))
    }
}
