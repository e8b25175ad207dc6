//! In-memory transport for testing.
//!
//! Every successful [`MemoryConnector::connect`] creates a pair of unbounded
//! in-process pipes. The client half is returned to the caller as a
//! [`Transport`]; the server half is queued as a [`MemoryPeer`] that test
//! code picks up with [`MemoryConnector::accept`] and drives by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::{Connector, Transport, TransportError};

/// A connector whose transports terminate in the test process.
///
/// Clones share state, so a test can keep one handle while the channel owns
/// another.
///
/// # Examples
///
/// ```
/// # use vaulthalla_transport::{Connector, MemoryConnector, Transport};
/// # #[tokio::main]
/// # async fn main() {
/// let connector = MemoryConnector::new();
/// let mut client = connector.connect("memory://test").await.unwrap();
/// let mut server = connector.accept().await.unwrap();
/// client.send("ping".to_owned()).await.unwrap();
/// assert_eq!(server.recv().await.as_deref(), Some("ping"));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    inner: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    accepted_tx: mpsc::UnboundedSender<MemoryPeer>,
    accepted_rx: Mutex<mpsc::UnboundedReceiver<MemoryPeer>>,
    refusing: AtomicBool,
    attempts: AtomicUsize,
}

impl MemoryConnector {
    /// Create a connector that accepts every connection.
    #[must_use]
    pub fn new() -> Self {
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(Shared {
                accepted_tx,
                accepted_rx: Mutex::new(accepted_rx),
                refusing: AtomicBool::new(false),
                attempts: AtomicUsize::new(0),
            }),
        }
    }

    /// Make subsequent connection attempts fail (`true`) or succeed (`false`).
    pub fn set_refusing(&self, refusing: bool) {
        self.inner.refusing.store(refusing, Ordering::SeqCst);
    }

    /// Number of connection attempts made so far, including refused ones.
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Wait for the server half of the next accepted connection.
    pub async fn accept(&self) -> Option<MemoryPeer> {
        self.inner.accepted_rx.lock().await.recv().await
    }

    /// Take the server half of an already accepted connection, if any.
    pub fn try_accept(&self) -> Option<MemoryPeer> {
        self.inner.accepted_rx.try_lock().ok()?.try_recv().ok()
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        if self.inner.refusing.load(Ordering::SeqCst) {
            return Err(TransportError::Connect {
                url: url.to_owned(),
                reason: "connection refused".to_owned(),
            });
        }

        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();

        let peer = MemoryPeer {
            tx: Some(server_tx),
            rx: server_rx,
        };
        self.inner
            .accepted_tx
            .send(peer)
            .map_err(|_| TransportError::Connect {
                url: url.to_owned(),
                reason: "memory connector dropped".to_owned(),
            })?;

        Ok(Box::new(MemoryTransport {
            tx: Some(client_tx),
            rx: client_rx,
        }))
    }
}

/// Client half of an in-memory pipe.
struct MemoryTransport {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or_else(|| TransportError::Send {
            reason: "transport closed".to_owned(),
        })?;
        tx.send(frame).map_err(|_| TransportError::Send {
            reason: "peer hung up".to_owned(),
        })
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        self.rx.close();
        Ok(())
    }
}

/// Server half of an in-memory pipe, driven by test code.
#[derive(Debug)]
pub struct MemoryPeer {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Next frame written by the client, or `None` once it has closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// A frame the client has already written, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }

    /// Deliver a frame to the client. Returns `false` if the pipe is closed.
    pub fn send(&self, frame: impl Into<String>) -> bool {
        self.tx
            .as_ref()
            .is_some_and(|tx| tx.send(frame.into()).is_ok())
    }

    /// Close the server side; the client observes end-of-stream.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_flow_both_ways() {
        let connector = MemoryConnector::new();
        let mut client = connector.connect("memory://a").await.unwrap();
        let mut peer = connector.accept().await.unwrap();

        client.send("hello".to_owned()).await.unwrap();
        assert_eq!(peer.recv().await.as_deref(), Some("hello"));

        assert!(peer.send("world"));
        assert_eq!(client.recv().await.unwrap().unwrap(), "world");
    }

    #[tokio::test]
    async fn peer_close_ends_client_stream() {
        let connector = MemoryConnector::new();
        let mut client = connector.connect("memory://a").await.unwrap();
        let mut peer = connector.accept().await.unwrap();

        peer.close();
        assert!(client.recv().await.is_none());
    }

    #[tokio::test]
    async fn client_close_ends_peer_stream() {
        let connector = MemoryConnector::new();
        let mut client = connector.connect("memory://a").await.unwrap();
        let mut peer = connector.accept().await.unwrap();

        client.close().await.unwrap();
        client.close().await.unwrap();
        assert!(peer.recv().await.is_none());
        assert!(client.send("late".to_owned()).await.is_err());
    }

    #[tokio::test]
    async fn refusing_connector_counts_attempts() {
        let connector = MemoryConnector::new();
        connector.set_refusing(true);
        let result = connector.connect("memory://a").await;
        assert!(matches!(result, Err(TransportError::Connect { .. })));
        assert_eq!(connector.attempts(), 1);
        assert!(connector.try_accept().is_none());

        connector.set_refusing(false);
        connector.connect("memory://a").await.unwrap();
        assert_eq!(connector.attempts(), 2);
        assert!(connector.try_accept().is_some());
    }

    #[tokio::test]
    async fn clone_shares_accept_queue() {
        let connector = MemoryConnector::new();
        let clone = connector.clone();
        let _client = clone.connect("memory://a").await.unwrap();
        assert!(connector.try_accept().is_some());
    }
}
