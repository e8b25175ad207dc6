//! Wire envelopes for the command socket.
//!
//! Every outbound frame is a [`CommandEnvelope`] serialized as a single JSON
//! text message. Inbound frames are parsed into [`InboundFrame`], which covers
//! both correlated responses (carrying a `requestId`) and the uncorrelated
//! session-level unauthorized signal.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ProtocolError;

/// Commands in this namespace may be sent without a credential token.
pub const UNAUTHENTICATED_PREFIX: &str = "auth.";

/// Returns `true` if `command` may be sent without a credential token.
pub fn is_unauthenticated_command(command: &str) -> bool {
    command.starts_with(UNAUTHENTICATED_PREFIX)
}

/// Outbound command frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    /// Remote operation name, e.g. `storage.vault.list`.
    pub command: String,
    /// Operation-specific payload; `null` when the command takes none.
    pub payload: Value,
    /// Correlation identifier, unique per request and never persisted.
    pub request_id: String,
    /// Current credential, empty when no token is available.
    pub token: String,
}

impl CommandEnvelope {
    /// Serialize the envelope into a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if the payload cannot be serialized.
    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|source| ProtocolError::Encode {
            command: self.command.clone(),
            source,
        })
    }
}

/// Status field of an inbound frame.
///
/// The backend emits `ok`, `error`, and `unauthorized`; anything else is kept
/// verbatim and treated as success for correlation purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    Error,
    Unauthorized,
    Other(String),
}

impl ResponseStatus {
    fn as_str(&self) -> &str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Unauthorized => "unauthorized",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ResponseStatus {
    fn from(s: &str) -> Self {
        match s {
            "ok" => Self::Ok,
            "error" => Self::Error,
            "unauthorized" => Self::Unauthorized,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl Serialize for ResponseStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResponseStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// Inbound frame from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundFrame {
    /// Identifier of the request this frame answers; absent on session signals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Outcome of the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResponseStatus>,
    /// Response body on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Server-supplied message when `status` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set to `error` on uncorrelated session-level frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl InboundFrame {
    /// Parse a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedFrame`] if the text is not a valid
    /// envelope.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::MalformedFrame)
    }

    /// Whether this frame is the session-level unauthorized signal.
    pub fn is_unauthorized_signal(&self) -> bool {
        self.command.as_deref() == Some("error")
            && self.status == Some(ResponseStatus::Unauthorized)
    }

    /// Convert a correlated frame into the value its caller receives.
    ///
    /// `Err` carries the server-supplied message for `status: "error"`.
    /// Missing `data` on success resolves to an empty object.
    pub fn into_outcome(self) -> Result<Value, String> {
        if self.status == Some(ResponseStatus::Error) {
            return Err(self.error.unwrap_or_else(|| "unknown server error".to_owned()));
        }
        Ok(self
            .data
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())))
    }
}
