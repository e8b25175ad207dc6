//! WebSocket transport backed by `tokio-tungstenite`.
//!
//! Text frames pass through unchanged. Binary frames are accepted when they
//! hold UTF-8 text; the backend never sends anything else. Ping/pong is
//! answered by tungstenite itself and a close frame ends the stream.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::{Connector, Transport, TransportError};

/// Opens WebSocket connections (`ws://` or `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
        debug!(url = %url, status = %response.status(), "websocket handshake complete");
        Ok(Box::new(WebSocketTransport {
            stream,
            closed: false,
        }))
    }
}

struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(|e| TransportError::Send {
                reason: e.to_string(),
            })
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => {
                    return Some(Err(TransportError::Receive {
                        reason: e.to_string(),
                    }));
                }
            };

            match message {
                Message::Text(text) => return Some(Ok(text)),
                Message::Binary(bytes) => {
                    return Some(String::from_utf8(bytes).map_err(|e| {
                        TransportError::Receive {
                            reason: format!("binary frame is not UTF-8: {e}"),
                        }
                    }));
                }
                Message::Close(frame) => {
                    debug!(frame = ?frame, "websocket closed by server");
                    self.closed = true;
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "client disconnect".into(),
            }))
            .await
            .map_err(|e| TransportError::Close {
                reason: e.to_string(),
            })
    }
}
