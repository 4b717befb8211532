//! Connection lifecycle for a single peer.
//!
//! A [`Session`] owns everything that exists once per peer link: the
//! lifecycle state, the remembered [`PeerIdentity`], the callers waiting for
//! a connection, the inbound reassembly buffer and the outbound queue. It
//! drives a [`TransportAdapter`] through initialise, scan, connect, discover
//! and subscribe, recovers from connect failures with an unbounded reconnect
//! loop, and restarts the whole flow when the connected peer drops.
//!
//! All work happens on background tasks spawned onto the current `tokio`
//! runtime. They live until [`Session::shutdown`] is called.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{Level, debug, warn};

use crate::{
    config::SessionConfig,
    error::{ConnectError, SendError, Stage},
    event::{BroadcastPublisher, Event, EventPublisher},
    message::EventMessage,
    outbound::OutboundQueue,
    reassembly::ReassemblyBuffer,
    tracing_helpers::{diagnostic_level, dynamic_event},
    transport::{Address, Notifications, TransportAdapter, TransportError},
};

mod delivery;
mod inbound;
mod machine;
mod pending;
mod reconnect;
mod state;
mod watcher;


pub use delivery::Delivery;
use pending::PendingRegistry;
pub use reconnect::ReconnectPolicy;
pub use state::ConnectionState;

/// Address of the device a session is, or was, connected to.
pub type PeerIdentity = Address;

#[derive(Debug, Default)]
struct Lifecycle {
    state: ConnectionState,
    peer: Option<PeerIdentity>,
    // Held by the attempt currently driving the adapter.
    initializing: bool,
    pending: PendingRegistry,
}

struct Shared {
    config: SessionConfig,
    level: Level,
    adapter: Arc<dyn TransportAdapter>,
    publisher: Arc<dyn EventPublisher>,
    broadcast: Option<BroadcastPublisher>,
    lifecycle: Mutex<Lifecycle>,
    inbound: Mutex<ReassemblyBuffer>,
    outbound: OutboundQueue,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

/// A managed link to one peer device.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = self.shared.lifecycle();
        f.debug_struct("Session")
            .field("identifier", &self.shared.config.identifier())
            .field("state", &lifecycle.state)
            .field("peer", &lifecycle.peer)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start a session and begin connecting in the background.
    ///
    /// Every [`Event`] is handed to `publisher`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio` runtime.
    #[must_use]
    pub fn start(
        config: SessionConfig,
        adapter: Arc<dyn TransportAdapter>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self::assemble(config, adapter, publisher, None)
    }

    /// Start a session that publishes to a fresh [`BroadcastPublisher`].
    ///
    /// Use [`subscribe`](Self::subscribe) to receive its events. Subscribe
    /// before yielding to the runtime so the first `connect` is not missed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio` runtime.
    #[must_use]
    pub fn with_broadcast(config: SessionConfig, adapter: Arc<dyn TransportAdapter>) -> Self {
        let publisher = BroadcastPublisher::default();
        Self::assemble(config, adapter, Arc::new(publisher.clone()), Some(publisher))
    }

    fn assemble(
        config: SessionConfig,
        adapter: Arc<dyn TransportAdapter>,
        publisher: Arc<dyn EventPublisher>,
        broadcast: Option<BroadcastPublisher>,
    ) -> Self {
        let level = diagnostic_level(config.verbose());
        dynamic_event!(
            level,
            identifier = config.identifier(),
            parts = ?config.identifier_parts().collect::<Vec<_>>(),
            service = %config.service_id(),
            "starting session"
        );
        let links = adapter.link_events();
        let shared = Arc::new(Shared {
            config,
            level,
            adapter,
            publisher,
            broadcast,
            lifecycle: Mutex::new(Lifecycle::default()),
            inbound: Mutex::new(ReassemblyBuffer::new()),
            outbound: OutboundQueue::new(),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        });

        shared.tracker.spawn(watcher::watch(Arc::clone(&shared), links));
        shared.spawn_connect("initial");
        Self { shared }
    }

    /// Configuration the session was started with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig { &self.shared.config }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState { self.shared.lifecycle().state }

    /// Peer the session is connected to, if any.
    #[must_use]
    pub fn peer(&self) -> Option<PeerIdentity> { self.shared.current_peer() }

    /// Receive events from the built-in publisher.
    ///
    /// Returns `None` for sessions started with a custom publisher.
    #[must_use]
    pub fn subscribe(&self) -> Option<broadcast::Receiver<Event>> {
        self.shared.broadcast.as_ref().map(BroadcastPublisher::subscribe)
    }

    /// Resolve once the session is subscribed to a peer.
    ///
    /// A live remembered peer resolves at once. Otherwise the caller joins
    /// the attempt in flight, or starts one. Every caller waiting on one
    /// attempt sees the same outcome, in the order they asked. Dropping the
    /// future does not cancel the attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Stage`] when the attempt failed at a
    /// lifecycle stage, or [`ConnectError::Closed`] after
    /// [`shutdown`](Self::shutdown).
    pub async fn when_connected(&self) -> Result<PeerIdentity, ConnectError> {
        self.shared.when_connected().await
    }

    /// Serialise an event and deliver it in the background.
    ///
    /// The event is encoded as `{"c": name, "a": args}` straight away; the
    /// returned [`Delivery`] resolves once its frames are written or the
    /// write path fails.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Serialize`] if `args` cannot be serialised.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio` runtime.
    pub fn send_event(
        &self,
        name: impl Into<String>,
        args: Option<Value>,
    ) -> Result<Delivery, SendError> {
        let message = EventMessage::new(name, args);
        let payload = message.to_json()?;
        let batch = self.shared.config.chunker().encode(&payload);
        dynamic_event!(
            self.shared.level,
            event = %message.name,
            bytes = payload.len(),
            frames = batch.len(),
            "queueing event"
        );
        let handle = self
            .shared
            .tracker
            .spawn(delivery::deliver(Arc::clone(&self.shared), batch));
        Ok(Delivery::new(handle))
    }

    /// Discard every queued outbound frame and stop the running drain loop.
    ///
    /// The peer may be left holding part of a payload. Intended only for
    /// recovering from a failed write.
    ///
    /// Returns the number of frames discarded.
    pub fn clear_event_queue(&self) -> usize {
        let dropped = self.shared.outbound.clear();
        warn!(dropped, "outbound queue cleared");
        dropped
    }

    /// Number of frames waiting to be written.
    #[must_use]
    pub fn queued_frames(&self) -> usize { self.shared.outbound.len() }

    /// Stop every background task of this session and wait for them.
    ///
    /// Pending callers receive [`ConnectError::Closed`] and in-flight
    /// deliveries [`SendError::Aborted`].
    pub async fn shutdown(&self) {
        dynamic_event!(
            self.shared.level,
            identifier = self.shared.config.identifier(),
            "shutting down session"
        );
        self.shared.shutdown.cancel();
        self.shared.tracker.close();
        self.shared.tracker.wait().await;
    }
}

impl Shared {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn inbound_buffer(&self) -> MutexGuard<'_, ReassemblyBuffer> {
        self.inbound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_peer(&self) -> Option<PeerIdentity> { self.lifecycle().peer.clone() }

    /// Record progress of an attempt unless a peer is already connected.
    fn enter(&self, state: ConnectionState) {
        let mut lifecycle = self.lifecycle();
        if lifecycle.peer.is_none() {
            lifecycle.state = state;
        }
    }

    fn release_guard(&self) { self.lifecycle().initializing = false; }

    fn forget_peer(&self, peer: &PeerIdentity) {
        let mut lifecycle = self.lifecycle();
        if lifecycle.peer.as_ref() == Some(peer) {
            lifecycle.peer = None;
        }
    }

    fn spawn_connect(self: &Arc<Self>, reason: &'static str) {
        let shared = Arc::clone(self);
        self.tracker.spawn(async move {
            match shared.when_connected().await {
                Ok(peer) => debug!(reason, %peer, "background connect finished"),
                Err(ConnectError::Closed) => {}
                Err(err) => warn!(reason, error = %err, "background connect failed"),
            }
        });
    }

    async fn when_connected(self: &Arc<Self>) -> Result<PeerIdentity, ConnectError> {
        if self.shutdown.is_cancelled() {
            return Err(ConnectError::Closed);
        }

        if let Some(peer) = self.current_peer() {
            match self.adapter.is_connected(&peer).await {
                Ok(true) => return Ok(peer),
                Ok(false) => dynamic_event!(self.level, %peer, "remembered peer is gone"),
                Err(err) => debug!(%peer, error = %err, "liveness check failed; treating peer as gone"),
            }
            self.forget_peer(&peer);
        }

        let (waiter, start) = {
            let mut lifecycle = self.lifecycle();
            if let Some(peer) = lifecycle.peer.clone() {
                return Ok(peer);
            }
            let waiter = lifecycle.pending.register();
            let start = !std::mem::replace(&mut lifecycle.initializing, true);
            (waiter, start)
        };

        if start {
            self.tracker.spawn(machine::drive(Arc::clone(self)));
        } else {
            debug!("connection attempt in flight; queued behind it");
        }

        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(ConnectError::Closed),
            outcome = waiter => outcome.unwrap_or(Err(ConnectError::Closed)),
        }
    }

    async fn complete(self: &Arc<Self>, peer: PeerIdentity, notifications: Notifications) {
        let current = {
            let mut lifecycle = self.lifecycle();
            let current = lifecycle.peer.clone();
            if current.is_none() {
                lifecycle.peer = Some(peer.clone());
            }
            current
        };
        if let Some(current) = current {
            self.discard_subscription(current, peer, notifications).await;
            return;
        }
        machine::stop_residual_scan(self).await;

        let waiters = {
            let mut lifecycle = self.lifecycle();
            lifecycle.state = ConnectionState::Connected;
            lifecycle.initializing = false;
            lifecycle.pending.take()
        };
        self.inbound_buffer().reset();

        dynamic_event!(self.level, %peer, "subscribed to peer");
        self.publisher.publish(Event::Connected { peer: peer.clone() });
        waiters.resolve(&Ok(peer.clone()));
        self.tracker
            .spawn(inbound::pump(Arc::clone(self), peer, notifications));
    }

    /// Fold in a subscription that finished after another attempt had
    /// already connected `current`.
    async fn discard_subscription(
        self: &Arc<Self>,
        current: PeerIdentity,
        peer: PeerIdentity,
        notifications: Notifications,
    ) {
        if current == peer {
            // The adapter now routes notifications to the newer stream.
            self.tracker
                .spawn(inbound::pump(Arc::clone(self), peer, notifications));
        } else {
            drop(notifications);
            if let Err(err) = self.adapter.disconnect(&peer).await {
                debug!(%peer, error = %err, "failed to drop redundant link");
            }
        }
        self.settle(&current);
    }

    /// End an attempt overtaken by one that already connected `peer`.
    ///
    /// The guard is left alone: the completing attempt releases it.
    fn settle(&self, peer: &PeerIdentity) {
        dynamic_event!(self.level, %peer, "peer already connected; abandoning attempt");
        let waiters = self.lifecycle().pending.take();
        waiters.resolve(&Ok(peer.clone()));
    }

    fn fail(&self, stage: Stage, source: TransportError) {
        warn!(%stage, error = %source, "connection attempt failed");
        let waiters = {
            let mut lifecycle = self.lifecycle();
            lifecycle.initializing = false;
            if lifecycle.peer.is_none() {
                lifecycle.state = ConnectionState::Idle;
            }
            lifecycle.pending.take()
        };
        waiters.resolve(&Err(ConnectError::Stage { stage, source }));
    }

    fn on_disconnected(self: &Arc<Self>, address: Address) {
        {
            let mut lifecycle = self.lifecycle();
            if lifecycle.peer.as_ref() != Some(&address) {
                debug!(%address, "ignoring disconnect from non-current device");
                return;
            }
            lifecycle.peer = None;
            lifecycle.state = ConnectionState::Disconnected;
        }
        self.inbound_buffer().reset();

        dynamic_event!(self.level, peer = %address, "peer disconnected");
        self.publisher.publish(Event::Disconnected { peer: address });
        self.spawn_connect("reconnect after disconnect");
    }
}
