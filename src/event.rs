//! Application-facing events and the publisher seam that delivers them.
//!
//! The session never calls application code directly; it hands every
//! [`Event`] to an [`EventPublisher`]. [`BroadcastPublisher`] fans events out
//! over a `tokio` broadcast channel and is what most applications want.

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

use crate::transport::Address;

/// Something the application may want to react to.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The notification subscription to `peer` was established.
    Connected { peer: Address },
    /// The previously connected `peer` dropped.
    Disconnected { peer: Address },
    /// A decoded application event from the peer.
    Message { name: String, data: Option<Value> },
}

impl Event {
    /// Name under which the event is dispatched.
    ///
    /// # Examples
    ///
    /// ```
    /// use peerlink::{event::Event, transport::Address};
    /// let event = Event::Connected { peer: Address::from("a") };
    /// assert_eq!(event.name(), "connect");
    /// ```
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Connected { .. } => "connect",
            Self::Disconnected { .. } => "disconnect",
            Self::Message { name, .. } => name,
        }
    }
}

/// Receives every event the session produces.
///
/// Implementations must not block: `publish` is called from the session's
/// background tasks.
pub trait EventPublisher: Send + Sync {
    /// Deliver `event` to interested parties.
    fn publish(&self, event: Event);
}

/// Publisher backed by a `tokio` broadcast channel.
///
/// Slow subscribers lag and lose the oldest events rather than stalling the
/// session.
#[derive(Clone, Debug)]
pub struct BroadcastPublisher {
    tx: broadcast::Sender<Event>,
}

impl BroadcastPublisher {
    /// Create a publisher buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> { self.tx.subscribe() }
}

impl Default for BroadcastPublisher {
    fn default() -> Self { Self::new(64) }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: Event) {
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            trace!(event = event.name(), "no subscribers for event");
        }
    }
}
