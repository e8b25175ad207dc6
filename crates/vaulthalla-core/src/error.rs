//! Error types for `vaulthalla-core`.
//!
//! Protocol errors describe frames that cannot be encoded or decoded. They
//! never include the credential token carried by an envelope.

/// Errors from encoding or decoding protocol frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// An outbound envelope could not be serialized.
    #[error("failed to encode '{command}' envelope: {source}")]
    Encode {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// An inbound frame was not valid JSON or did not match the envelope shape.
    #[error("malformed inbound frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    /// A response payload did not match the type the catalog declares for it.
    #[error("unexpected response shape for '{command}': {source}")]
    ResponseShape {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}
