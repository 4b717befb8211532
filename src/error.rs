//! Error types surfaced by the session.
//!
//! Lifecycle failures carry the [`Stage`] they happened in. Connect failures
//! never appear here: they are absorbed by the reconnect loop.

use std::fmt;

use thiserror::Error;

use crate::transport::TransportError;

/// Lifecycle phase in which a connection attempt failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Bringing up the local radio stack.
    Initialize,
    /// Starting the scan or waiting for a matching device.
    StartScan,
    /// Enumerating the peer's services.
    Discover,
    /// Enabling notifications on the command characteristic.
    Subscribe,
}

impl Stage {
    /// Stable tag used in logs and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::StartScan => "startScan",
            Self::Discover => "discover",
            Self::Subscribe => "subscribe",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Why a "become connected" request did not succeed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConnectError {
    /// A lifecycle stage failed and the attempt was abandoned.
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: TransportError,
    },
    /// The session shut down before the attempt concluded.
    #[error("session closed")]
    Closed,
}

impl ConnectError {
    /// Return the failing stage, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::Closed => None,
        }
    }
}

/// Failures reported for a single [`send_event`](crate::session::Session::send_event).
#[derive(Debug, Error)]
pub enum SendError {
    /// The event could not be serialised to JSON.
    #[error("failed to serialise event: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The session could not reach the connected state.
    #[error("not connected: {0}")]
    Connect(#[from] ConnectError),
    /// A frame write failed; later frames remain queued.
    #[error("write failed: {0}")]
    Write(#[source] TransportError),
    /// The peer dropped between connecting and writing.
    #[error("peer disconnected before the event was written")]
    NotConnected,
    /// The delivery was abandoned because the session shut down.
    #[error("delivery aborted")]
    Aborted,
}

/// Errors raised while building a [`SessionConfig`](crate::config::SessionConfig).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No identifier, or an empty one, was supplied.
    #[error("an identifier must be given")]
    MissingIdentifier,
}

#[cfg(test)]
mod tests {
    use super::{ConnectError, Stage};
    use crate::transport::TransportError;

    #[test]
    fn stage_tags_match_lifecycle_names() {
        let tags: Vec<_> = [
            Stage::Initialize,
            Stage::StartScan,
            Stage::Discover,
            Stage::Subscribe,
        ]
        .into_iter()
        .map(Stage::as_str)
        .collect();
        assert_eq!(tags, ["initialize", "startScan", "discover", "subscribe"]);
    }

    #[test]
    fn connect_error_reports_stage_and_cause() {
        let err = ConnectError::Stage {
            stage: Stage::Discover,
            source: TransportError::failed("discover", "gatt busy"),
        };
        assert_eq!(err.stage(), Some(Stage::Discover));
        assert_eq!(err.to_string(), "discover failed: discover failed: gatt busy");
        assert_eq!(ConnectError::Closed.stage(), None);
    }
}
