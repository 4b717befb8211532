//! The link primitives a [`Session`](crate::session::Session) drives.
//!
//! [`TransportAdapter`] is the seam between the connection state machine and
//! whatever radio stack actually carries the packets. Every primitive is
//! asynchronous; scan results and notifications arrive on channels returned
//! by the call that starts them, and link status changes are broadcast on
//! [`TransportAdapter::link_events`].

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// Transport address of a remote device.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Wrap a transport-specific address string.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self { Self(address.into()) }

    /// Borrow the address as a string.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self { Self::new(value) }
}

impl From<String> for Address {
    fn from(value: String) -> Self { Self(value) }
}

/// A device reported while scanning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanResult {
    /// Address to connect to.
    pub address: Address,
    /// Advertised name, if any.
    pub name: Option<String>,
    /// Received signal strength, if the stack reports it.
    pub rssi: Option<i16>,
}

/// Restricts a scan to devices advertising one of the listed services.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanFilter {
    /// Service identifiers of interest. Empty matches every device.
    pub service_ids: Vec<Uuid>,
}

impl ScanFilter {
    /// Filter on a single service.
    #[must_use]
    pub fn service(service_id: Uuid) -> Self {
        Self {
            service_ids: vec![service_id],
        }
    }

    /// Whether a device advertising `services` passes the filter.
    #[must_use]
    pub fn matches(&self, services: &[Uuid]) -> bool {
        self.service_ids.is_empty() || self.service_ids.iter().any(|id| services.contains(id))
    }
}

/// Service/characteristic pair addressed by subscribe and write calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CharacteristicRef {
    /// Owning service.
    pub service_id: Uuid,
    /// Characteristic within the service.
    pub characteristic_id: Uuid,
}

/// Asynchronous link status reported by the adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    /// A connection to `address` came up.
    Connected { address: Address },
    /// The connection to `address` dropped.
    Disconnected { address: Address },
}

/// Scan results in discovery order. The channel closes when scanning stops.
pub type ScanResults = mpsc::Receiver<ScanResult>;

/// Raw notification payloads from a subscribed characteristic, in arrival
/// order. The channel closes when the subscription ends.
pub type Notifications = mpsc::Receiver<Bytes>;

/// Failures reported by a [`TransportAdapter`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The underlying stack rejected the operation.
    #[error("{operation} failed: {reason}")]
    Failed {
        operation: &'static str,
        reason: String,
    },
    /// The scan stopped before any matching device was found.
    #[error("scan ended without a matching device")]
    ScanEnded,
    /// No live connection to the addressed device.
    #[error("device not connected")]
    NotConnected,
    /// The adapter has shut down.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Shorthand for [`TransportError::Failed`].
    #[must_use]
    pub fn failed(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Failed {
            operation,
            reason: reason.into(),
        }
    }
}

/// Link primitives consumed by the connection state machine.
///
/// Implementations wrap a platform radio stack. Calls for one session are
/// issued sequentially except for [`write`](Self::write), which may overlap
/// with inbound notifications. The adapter's scan and connect state is
/// global, so only one session should drive a given adapter.
#[async_trait]
pub trait TransportAdapter: Send + Sync {
    /// Bring up the local radio stack.
    async fn initialize(&self) -> Result<(), TransportError>;

    /// Whether [`initialize`](Self::initialize) already succeeded.
    async fn is_initialized(&self) -> Result<bool, TransportError>;

    /// Start scanning for devices that pass `filter`.
    async fn start_scan(&self, filter: &ScanFilter) -> Result<ScanResults, TransportError>;

    /// Stop a running scan. Stopping an idle scanner is not an error.
    async fn stop_scan(&self) -> Result<(), TransportError>;

    /// Whether a scan is currently running.
    async fn is_scanning(&self) -> Result<bool, TransportError>;

    /// Open a connection to a freshly discovered device.
    async fn connect(&self, address: &Address) -> Result<(), TransportError>;

    /// Re-open a connection to a device seen before.
    async fn reconnect(&self, address: &Address) -> Result<(), TransportError>;

    /// Drop the connection to `address`.
    async fn disconnect(&self, address: &Address) -> Result<(), TransportError>;

    /// Whether `address` is currently connected.
    async fn is_connected(&self, address: &Address) -> Result<bool, TransportError>;

    /// List the services exposed by a connected device.
    async fn discover_services(&self, address: &Address) -> Result<Vec<Uuid>, TransportError>;

    /// Enable notifications on `target` and return the notification stream.
    async fn subscribe(
        &self,
        address: &Address,
        target: &CharacteristicRef,
    ) -> Result<Notifications, TransportError>;

    /// Write one packet to `target`.
    async fn write(
        &self,
        address: &Address,
        target: &CharacteristicRef,
        value: Bytes,
    ) -> Result<(), TransportError>;

    /// Subscribe to asynchronous link status changes.
    fn link_events(&self) -> broadcast::Receiver<LinkEvent>;
}
