//! Connection states and the events the worker hands to the application thread.

use std::fmt;

use spacewire_sats::ServerMessage;

/// Lifecycle of a [`ConnectionEngine`](crate::ConnectionEngine).
///
/// `Idle -> Connecting -> Open -> Closing -> Closed`, with `Failed` reachable from
/// `Connecting` and `Open`. `Closed` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connect requested yet.
    Idle,
    /// Waiting for the transport handshake.
    Connecting,
    /// Exchanging messages.
    Open,
    /// Shutdown in progress.
    Closing,
    /// The connection ended.
    Closed,
    /// The connection could not be opened.
    Failed,
}

impl ConnectionState {
    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        }
    }

    /// Returns true for `Closed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processed item waiting for the next `pump`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A decoded server message.
    Message(ServerMessage),
    /// The handshake failed or timed out.
    ConnectError(String),
    /// The open connection closed. Empty reason for a clean close.
    Disconnected(String),
}
