//! Observable lifecycle state of a session.

use std::fmt;

/// Where the session is in its connection lifecycle.
///
/// Steps run strictly in declaration order for one attempt; `Disconnected`
/// is only reachable from `Connected`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No attempt has started yet.
    #[default]
    Idle,
    /// Bringing up the local radio stack.
    Initializing,
    /// Waiting for a device advertising the configured service.
    Scanning,
    /// Connecting, or cycling through reconnects, to the discovered device.
    Connecting,
    /// Enumerating services on the connected device.
    Discovering,
    /// Enabling notifications on the command characteristic.
    Subscribing,
    /// Subscribed and exchanging frames.
    Connected,
    /// The connected peer dropped; a new attempt is under way.
    Disconnected,
}

impl ConnectionState {
    /// Lower-case name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Scanning => "scanning",
            Self::Connecting => "connecting",
            Self::Discovering => "discovering",
            Self::Subscribing => "subscribing",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }

    /// Whether frames may flow.
    #[must_use]
    pub const fn is_connected(self) -> bool { matches!(self, Self::Connected) }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}
