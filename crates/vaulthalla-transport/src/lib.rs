//! Transport abstraction for the Vaulthalla command socket.
//!
//! This crate defines the [`Connector`] and [`Transport`] traits, a pure
//! text-message pipe that knows nothing about command envelopes, request
//! correlation, or credentials. The command channel in `vaulthalla-client`
//! owns exactly one transport at a time and layers the protocol on top.
//!
//! Two implementations are provided:
//!
//! - [`WebSocketConnector`]: production default, backed by `tokio-tungstenite` (feature `websocket`)
//! - [`MemoryConnector`]: in-process pipes, for testing only

mod error;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{MemoryConnector, MemoryPeer};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketConnector;

/// Opens transports to a backend endpoint.
///
/// A connector is shared by the channel for its whole lifetime and is asked
/// for a fresh transport on every connect or reconnect. Implementations must
/// be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a transport to `url`. Resolves once the open handshake completes.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the endpoint cannot be reached
    /// or refuses the handshake.
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError>;
}

/// A live, message-oriented, bidirectional pipe carrying text frames.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Write one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Send`] if the pipe is broken.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Read the next text frame.
    ///
    /// Returns `None` once the remote side has closed the pipe. Control
    /// frames (ping/pong) are handled internally and never surface here.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the pipe. Idempotent; closing an already-closed transport is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Close`] if the close handshake fails.
    async fn close(&mut self) -> Result<(), TransportError>;
}
