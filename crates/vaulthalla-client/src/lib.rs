//! Command channel for the Vaulthalla backend.
//!
//! Every backend operation travels over one persistent WebSocket as a JSON
//! command envelope. [`Channel`] multiplexes concurrent requests over that
//! socket, correlates responses by request id, times requests out,
//! reconnects after unexpected closes, and hands unauthorized sessions to a
//! [`CredentialSource`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use vaulthalla_client::{Channel, ChannelConfig, StaticToken, WebSocketConnector};
//! use vaulthalla_core::catalog::VaultList;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let channel = Channel::new(
//!     ChannelConfig::from_env(),
//!     Arc::new(WebSocketConnector::new()),
//!     Arc::new(StaticToken::new(std::env::var("VAULTHALLA_TOKEN").ok())),
//! );
//! channel.connect();
//! tokio::time::timeout(Duration::from_secs(5), channel.wait_for_connection()).await?;
//!
//! for vault in channel.call::<VaultList>(&()).await? {
//!     println!("{} ({})", vault.name(), vault.kind());
//! }
//! # Ok(())
//! # }
//! ```

mod channel;
mod config;
mod credentials;
mod error;
mod state;

pub use channel::Channel;
pub use config::{
    ChannelConfig, DEFAULT_MAX_REFRESH_ATTEMPTS, DEFAULT_RECONNECT_DELAY, DEFAULT_REQUEST_TIMEOUT,
    endpoint,
};
pub use credentials::{CredentialSource, SessionCredentials, StaticToken};
pub use error::{ChannelError, CredentialError};
pub use state::ConnectionState;

pub use vaulthalla_transport::{Connector, MemoryConnector, MemoryPeer, Transport, TransportError};
#[cfg(feature = "websocket")]
pub use vaulthalla_transport::WebSocketConnector;
