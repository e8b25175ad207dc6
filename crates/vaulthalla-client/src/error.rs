//! Error types for `vaulthalla-client`.
//!
//! [`ChannelError`] is what every caller of the command channel sees. The
//! display strings of the fast-fail variants match the messages the
//! dashboard has always shown, so UI code can surface them verbatim.

use vaulthalla_core::ProtocolError;

/// Errors surfaced to callers of [`Channel::send_command`](crate::Channel::send_command).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// No credential token is available and the command requires one.
    #[error("no auth token (command '{command}' requires authentication)")]
    NoAuthToken { command: String },

    /// The transport is absent or has not finished opening.
    #[error("WebSocket is not connected")]
    NotConnected,

    /// The backend answered with `status: "error"`.
    #[error("{message}")]
    Server { message: String },

    /// No response arrived within the request timeout.
    #[error("Request timed out")]
    Timeout { command: String, request_id: String },

    /// The transport closed while the request was in flight.
    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    /// `disconnect()` was called while the request was in flight.
    #[error("channel disconnected before a response arrived")]
    Disconnected,

    /// The envelope or the typed response could not be (de)serialized.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ChannelError {
    /// Whether the caller may reasonably retry once the channel reconnects.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::Timeout { .. } | Self::ConnectionClosed
        )
    }
}

/// Errors from a [`CredentialSource`](crate::CredentialSource).
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// This source has no way to obtain a fresh token.
    #[error("credential source cannot refresh tokens")]
    Unsupported,

    /// The refresh command failed.
    #[error("credential refresh failed: {0}")]
    Refresh(#[from] ChannelError),
}
