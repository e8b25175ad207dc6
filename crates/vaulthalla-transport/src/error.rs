//! Transport error types.
//!
//! Every error variant carries enough context to diagnose the problem
//! without a debugger. URLs are included; credentials never are.

/// Errors that can occur while opening or using a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint could not be reached or refused the handshake.
    #[error("failed to connect to '{url}': {reason}")]
    Connect { url: String, reason: String },

    /// A frame could not be written.
    #[error("failed to send frame: {reason}")]
    Send { reason: String },

    /// A frame could not be read or decoded.
    #[error("failed to receive frame: {reason}")]
    Receive { reason: String },

    /// The close handshake failed.
    #[error("failed to close transport: {reason}")]
    Close { reason: String },
}
