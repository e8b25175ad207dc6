//! Connection state machine.

use std::fmt;

/// Lifecycle phase of the channel's single transport.
///
/// ```text
/// Idle | WaitingToRetry | Closing  --connect-->      Connecting
/// Connecting                        --open-->         Open
/// Connecting | Open                 --close-->        WaitingToRetry (reconnect enabled)
/// WaitingToRetry                    --timer-->        Connecting
/// Connecting | Open                 --disconnect-->   Closing
/// Idle | WaitingToRetry             --disconnect-->   Idle
/// Closing                           --closed-->       Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport and no reconnect scheduled.
    Idle,
    /// A transport is being opened.
    Connecting,
    /// The transport is open; commands may be sent.
    Open,
    /// `disconnect()` is shutting the transport down.
    Closing,
    /// The transport closed unexpectedly and a reconnect is scheduled.
    WaitingToRetry,
}

impl ConnectionState {
    /// Whether `connect()` must be a no-op in this state.
    ///
    /// A transport is live or being opened, so starting another would break
    /// the one-transport invariant. `Closing` does not count: its transport
    /// is already detached from the channel.
    pub fn has_live_transport(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::WaitingToRetry => "waiting_to_retry",
        };
        f.write_str(s)
    }
}

/// Value broadcast to `wait_for_connection` subscribers.
///
/// `opens` counts completed handshakes so a waiter that subscribed before a
/// short-lived open still observes it after the flag has dropped again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Connectivity {
    pub connected: bool,
    pub opens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connecting_and_open_block_connect() {
        assert!(ConnectionState::Connecting.has_live_transport());
        assert!(ConnectionState::Open.has_live_transport());
        assert!(!ConnectionState::Idle.has_live_transport());
        assert!(!ConnectionState::Closing.has_live_transport());
        assert!(!ConnectionState::WaitingToRetry.has_live_transport());
    }

    #[test]
    fn display_is_snake_case() {
        assert_eq!(ConnectionState::WaitingToRetry.to_string(), "waiting_to_retry");
    }
}
