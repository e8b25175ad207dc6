//! The command channel.
//!
//! A [`Channel`] owns at most one transport to the backend and multiplexes
//! request/response pairs over it. Outgoing commands are wrapped in a
//! [`CommandEnvelope`] carrying a fresh request id; incoming frames are
//! routed back to the waiting caller through the pending table. The channel
//! reconnects once per close after a fixed delay unless `disconnect()` was
//! requested, and hands session-level unauthorized signals to the
//! [`CredentialSource`].
//!
//! Locks are never held across an `.await`. When both are needed, `link` is
//! always taken before `pending`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use vaulthalla_core::{Command, CommandEnvelope, InboundFrame, ProtocolError, is_unauthenticated_command};
use vaulthalla_transport::Connector;

use crate::config::ChannelConfig;
use crate::credentials::CredentialSource;
use crate::error::ChannelError;
use crate::state::{ConnectionState, Connectivity};

type Outcome = Result<Value, ChannelError>;

/// Instruction from the public API to the task driving the transport.
enum Outbound {
    Frame(String),
    Close,
}

/// Connection bookkeeping guarded by a single lock.
struct Link {
    state: ConnectionState,
    /// Bumped on every `connect()`; events from older transports are ignored.
    epoch: u64,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    retry: Option<JoinHandle<()>>,
    should_reconnect: bool,
}

struct Inner {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialSource>,
    link: Mutex<Link>,
    pending: Mutex<HashMap<String, oneshot::Sender<Outcome>>>,
    connectivity: watch::Sender<Connectivity>,
    refreshing: AtomicBool,
}

/// Handle to the command channel.
///
/// Cloning is cheap and every clone drives the same connection. The
/// application's composition root constructs one channel and injects it
/// wherever backend calls are made.
///
/// All methods that may start a connection (`connect`, `send_command`,
/// `call`) must run inside a tokio runtime.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("pending", &self.pending_requests())
            .finish_non_exhaustive()
    }
}

impl Channel {
    /// Create a disconnected channel.
    pub fn new(
        config: ChannelConfig,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        let (connectivity, _) = watch::channel(Connectivity::default());
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                credentials,
                link: Mutex::new(Link {
                    state: ConnectionState::Idle,
                    epoch: 0,
                    outbound: None,
                    retry: None,
                    should_reconnect: false,
                }),
                pending: Mutex::new(HashMap::new()),
                connectivity,
                refreshing: AtomicBool::new(false),
            }),
        }
    }

    /// Start connecting unless a transport is already open or opening.
    ///
    /// Returns immediately; use [`wait_for_connection`](Self::wait_for_connection)
    /// to await the open handshake. Cancels any scheduled reconnect.
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// Close the transport and stop reconnecting.
    ///
    /// Requests still in flight fail with [`ChannelError::Disconnected`].
    /// Safe to call when already disconnected.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Resolve once the channel is connected.
    ///
    /// Returns immediately if it already is. Never starts a connection and
    /// never times out; wrap it in `tokio::time::timeout` to bound the wait.
    pub async fn wait_for_connection(&self) {
        let mut rx = self.inner.connectivity.subscribe();
        let opens_at_subscribe = rx.borrow().opens;
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = rx
            .wait_for(|c| c.connected || c.opens > opens_at_subscribe)
            .await;
    }

    /// Send `command` with a JSON `payload` and wait for its response.
    ///
    /// Fails immediately, without queueing, when no token is available for
    /// a command outside the `auth.` namespace, or when the transport is not
    /// open. A disconnected channel is asked to connect first, but the call
    /// does not wait for that attempt.
    ///
    /// # Errors
    ///
    /// See [`ChannelError`] for the full taxonomy.
    pub async fn send_command(&self, command: &str, payload: Value) -> Result<Value, ChannelError> {
        let (request_id, rx) = self.inner.dispatch(command, payload)?;
        let guard = PendingGuard {
            inner: &self.inner,
            request_id: &request_id,
        };

        let outcome = match tokio::time::timeout(self.inner.config.request_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Resolver dropped without an answer: the table was cleared.
            Ok(Err(_)) => Err(ChannelError::Disconnected),
            Err(_) => {
                warn!(command = %command, request_id = %request_id, "request timed out");
                Err(ChannelError::Timeout {
                    command: command.to_owned(),
                    request_id: request_id.clone(),
                })
            }
        };
        drop(guard);
        outcome
    }

    /// Typed wrapper over [`send_command`](Self::send_command) using the catalog.
    ///
    /// # Errors
    ///
    /// Everything `send_command` returns, plus [`ChannelError::Protocol`]
    /// when the response does not decode into `C::Response`.
    pub async fn call<C: Command>(&self, payload: &C::Payload) -> Result<C::Response, ChannelError> {
        let payload = serde_json::to_value(payload).map_err(|source| ProtocolError::Encode {
            command: C::NAME.to_owned(),
            source,
        })?;
        let data = self.send_command(C::NAME, payload).await?;
        serde_json::from_value(data).map_err(|source| {
            ChannelError::Protocol(ProtocolError::ResponseShape {
                command: C::NAME.to_owned(),
                source,
            })
        })
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> ConnectionState {
        self.inner.link.lock().state
    }

    /// Whether the transport has completed its open handshake and not closed since.
    pub fn is_connected(&self) -> bool {
        self.inner.connectivity.borrow().connected
    }

    /// Number of requests awaiting a response.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Endpoint this channel connects to.
    pub fn url(&self) -> &str {
        &self.inner.config.url
    }
}

/// Removes a request from the pending table when its caller stops waiting,
/// whether it finished, timed out, or dropped the future.
struct PendingGuard<'a> {
    inner: &'a Inner,
    request_id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.inner.pending.lock().remove(self.request_id);
    }
}

impl Inner {
    fn connect(self: &Arc<Self>) {
        let mut link = self.link.lock();
        if link.state.has_live_transport() {
            debug!(state = %link.state, "connect ignored, transport already live");
            return;
        }
        if let Some(retry) = link.retry.take() {
            retry.abort();
        }

        link.should_reconnect = true;
        link.epoch = link.epoch.wrapping_add(1);
        link.state = ConnectionState::Connecting;
        let (tx, rx) = mpsc::unbounded_channel();
        link.outbound = Some(tx);
        let epoch = link.epoch;
        drop(link);

        info!(url = %self.config.url, "connecting");
        tokio::spawn(drive(
            Arc::downgrade(self),
            Arc::clone(&self.connector),
            self.config.url.clone(),
            epoch,
            rx,
        ));
    }

    fn disconnect(&self) {
        let mut link = self.link.lock();
        link.should_reconnect = false;
        if let Some(retry) = link.retry.take() {
            retry.abort();
        }
        link.state = match link.outbound.take() {
            Some(outbound) => {
                let _ = outbound.send(Outbound::Close);
                ConnectionState::Closing
            }
            None => ConnectionState::Idle,
        };
        self.connectivity.send_modify(|c| c.connected = false);
        let abandoned: Vec<_> = self.pending.lock().drain().map(|(_, tx)| tx).collect();
        drop(link);

        info!(abandoned = abandoned.len(), "disconnected");
        for tx in abandoned {
            let _ = tx.send(Err(ChannelError::Disconnected));
        }
    }

    /// Synchronous half of `send_command`: every fast-fail check plus the
    /// write, performed before the caller first yields.
    fn dispatch(
        self: &Arc<Self>,
        command: &str,
        payload: Value,
    ) -> Result<(String, oneshot::Receiver<Outcome>), ChannelError> {
        if !self.connectivity.borrow().connected {
            self.connect();
        }

        let token = self.credentials.token().filter(|t| !t.is_empty());
        if token.is_none() && !is_unauthenticated_command(command) {
            return Err(ChannelError::NoAuthToken {
                command: command.to_owned(),
            });
        }

        let request_id = Uuid::new_v4().to_string();
        let frame = CommandEnvelope {
            command: command.to_owned(),
            payload,
            request_id: request_id.clone(),
            token: token.unwrap_or_default(),
        }
        .to_frame()?;

        let (tx, rx) = oneshot::channel();
        let link = self.link.lock();
        let outbound = match (link.state, link.outbound.as_ref()) {
            (ConnectionState::Open, Some(outbound)) => outbound,
            _ => return Err(ChannelError::NotConnected),
        };
        self.pending.lock().insert(request_id.clone(), tx);
        if outbound.send(Outbound::Frame(frame)).is_err() {
            self.pending.lock().remove(&request_id);
            return Err(ChannelError::NotConnected);
        }
        drop(link);

        debug!(command = %command, request_id = %request_id, "command sent");
        Ok((request_id, rx))
    }

    /// Returns `false` if this transport was superseded while opening.
    fn on_open(&self, epoch: u64) -> bool {
        let mut link = self.link.lock();
        if link.epoch != epoch || link.state != ConnectionState::Connecting {
            return false;
        }
        link.state = ConnectionState::Open;
        self.connectivity.send_modify(|c| {
            c.connected = true;
            c.opens = c.opens.wrapping_add(1);
        });
        drop(link);
        info!(url = %self.config.url, "connected");
        true
    }

    fn on_close(self: &Arc<Self>, epoch: u64) {
        let mut link = self.link.lock();
        if link.epoch != epoch {
            return;
        }
        let was_closing = link.state == ConnectionState::Closing;
        link.outbound = None;
        self.connectivity.send_modify(|c| c.connected = false);
        let orphaned: Vec<_> = self.pending.lock().drain().map(|(_, tx)| tx).collect();

        if link.should_reconnect {
            link.state = ConnectionState::WaitingToRetry;
            let delay = self.config.reconnect_delay;
            let weak = Arc::downgrade(self);
            link.retry = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(inner) = weak.upgrade() {
                    inner.retry_fired(epoch);
                }
            }));
            drop(link);
            info!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                orphaned = orphaned.len(),
                "connection closed, reconnect scheduled"
            );
        } else {
            link.state = ConnectionState::Idle;
            drop(link);
            if !was_closing {
                info!(orphaned = orphaned.len(), "connection closed");
            }
        }

        for tx in orphaned {
            let _ = tx.send(Err(ChannelError::ConnectionClosed));
        }
    }

    fn retry_fired(self: &Arc<Self>, epoch: u64) {
        let mut link = self.link.lock();
        if link.epoch != epoch || link.state != ConnectionState::WaitingToRetry {
            return;
        }
        // Detach our own handle so `connect` does not abort the running task.
        link.retry = None;
        drop(link);
        self.connect();
    }

    fn on_message(self: &Arc<Self>, text: &str) {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                return;
            }
        };

        if frame.is_unauthorized_signal() {
            warn!("backend reported an unauthorized session");
            self.refresh_credentials();
            return;
        }

        let Some(request_id) = frame.request_id.clone() else {
            debug!(status = ?frame.status, "ignoring uncorrelated frame");
            return;
        };
        let resolver = self.pending.lock().remove(&request_id);
        let Some(resolver) = resolver else {
            warn!(request_id = %request_id, "no handler for requestId");
            return;
        };

        let outcome = frame
            .into_outcome()
            .map_err(|message| ChannelError::Server { message });
        let _ = resolver.send(outcome);
    }

    /// Start one refresh cycle unless one is already running.
    fn refresh_credentials(self: &Arc<Self>) {
        if self.refreshing.swap(true, Ordering::SeqCst) {
            debug!("credential refresh already in progress");
            return;
        }
        let cycle = RefreshCycle {
            channel: Channel {
                inner: Arc::clone(self),
            },
        };
        tokio::spawn(async move {
            refresh_session(&cycle.channel).await;
        });
    }
}

/// Clears the in-progress flag when a refresh cycle ends, including when the
/// credential source panics or the task is aborted.
struct RefreshCycle {
    channel: Channel,
}

impl Drop for RefreshCycle {
    fn drop(&mut self) {
        self.channel.inner.refreshing.store(false, Ordering::SeqCst);
    }
}

/// Refresh the credential source, retrying a bounded number of times, and
/// log it out when every attempt fails. The command that provoked the
/// unauthorized signal is not retried.
async fn refresh_session(channel: &Channel) {
    let credentials = Arc::clone(&channel.inner.credentials);
    let max_attempts = channel.inner.config.max_refresh_attempts.max(1);

    for attempt in 1..=max_attempts {
        match credentials.refresh(channel).await {
            Ok(()) => {
                info!(attempt, "credentials refreshed");
                return;
            }
            Err(e) => {
                warn!(attempt, max_attempts, error = %e, "credential refresh failed");
            }
        }
    }

    warn!("credential refresh exhausted, forcing logout");
    credentials.logout().await;
}

/// Own one transport from open to close.
///
/// Holds only a weak reference to the channel so a dropped channel shuts its
/// transport down instead of leaking it.
async fn drive(
    inner: Weak<Inner>,
    connector: Arc<dyn Connector>,
    url: String,
    epoch: u64,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let mut transport = match connector.connect(&url).await {
        Ok(transport) => transport,
        Err(e) => {
            warn!(error = %e, "connection attempt failed");
            if let Some(inner) = inner.upgrade() {
                inner.on_close(epoch);
            }
            return;
        }
    };

    let opened = inner.upgrade().is_some_and(|inner| inner.on_open(epoch));
    if !opened {
        debug!("transport superseded while opening, closing it");
        let _ = transport.close().await;
        if let Some(inner) = inner.upgrade() {
            inner.on_close(epoch);
        }
        return;
    }

    loop {
        tokio::select! {
            next = outbound.recv() => match next {
                Some(Outbound::Frame(frame)) => {
                    if let Err(e) = transport.send(frame).await {
                        warn!(error = %e, "transport write failed");
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = transport.close().await {
                        debug!(error = %e, "transport close failed");
                    }
                    break;
                }
            },
            incoming = transport.recv() => match incoming {
                Some(Ok(text)) => match inner.upgrade() {
                    Some(inner) => inner.on_message(&text),
                    None => break,
                },
                Some(Err(e)) => {
                    warn!(error = %e, "transport read failed");
                    break;
                }
                None => {
                    debug!("transport closed by remote");
                    break;
                }
            },
        }
    }

    if let Some(inner) = inner.upgrade() {
        inner.on_close(epoch);
    }
}
