//! Shared application state for the session probe.

use crate::config::ServerConfig;

/// Shared state passed to all HTTP handlers via `Arc`.
pub struct AppState {
    /// Full URL of the upstream session endpoint.
    pub session_endpoint: String,
    /// Name of the cookie forwarded upstream.
    pub session_cookie: String,
    /// Pooled HTTP client with the probe timeout applied.
    pub http: reqwest::Client,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed (e.g. the
    /// TLS backend fails to initialize).
    pub fn new(config: &ServerConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.probe_timeout)
            .build()?;
        Ok(Self {
            session_endpoint: config.session_endpoint(),
            session_cookie: config.session_cookie.clone(),
            http,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("session_endpoint", &self.session_endpoint)
            .field("session_cookie", &self.session_cookie)
            .finish_non_exhaustive()
    }
}
