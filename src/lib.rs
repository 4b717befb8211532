#![doc(html_root_url = "https://docs.rs/peerlink/latest")]
//! Public API for the `peerlink` library.
//!
//! `peerlink` keeps a single subscribed connection to one peer device over a
//! small-packet link and exchanges named JSON events across it. Payloads are
//! chunked into tagged frames on the way out and reassembled on the way in;
//! the [`Session`] state machine finds, connects and re-connects the peer
//! through a pluggable [`TransportAdapter`].

pub mod chunk;
pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod metrics;
pub mod outbound;
pub mod reassembly;
pub mod session;
pub mod simulated;
mod tracing_helpers;
pub mod transport;

pub use chunk::{Chunker, Frame, FrameBatch, FrameError, FrameKind};
pub use config::{SessionConfig, SessionConfigBuilder, Timings};
pub use error::{ConfigError, ConnectError, SendError, Stage};
pub use event::{BroadcastPublisher, Event, EventPublisher};
pub use message::EventMessage;
pub use self::metrics::{Direction, FRAMES_TOTAL, MALFORMED_PAYLOADS, RECONNECT_ATTEMPTS, WRITE_FAILURES};
pub use outbound::{DrainOutcome, OutboundQueue, Pacing};
pub use reassembly::ReassemblyBuffer;
pub use session::{ConnectionState, Delivery, PeerIdentity, ReconnectPolicy, Session};
pub use simulated::{FaultPoint, SimulatedDevice, SimulatedTransport};
pub use transport::{Address, LinkEvent, ScanFilter, ScanResult, TransportAdapter, TransportError};
