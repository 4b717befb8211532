//! In-process peer for tests and demos.
//!
//! [`SimulatedTransport`] implements [`TransportAdapter`] without any radio.
//! Devices are registered up front or while a scan is running; faults can be
//! injected per operation; every adapter call is recorded in a journal so
//! tests can assert on the exact sequence the session issued.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{
    chunk::Chunker,
    reassembly::ReassemblyBuffer,
    transport::{
        Address,
        CharacteristicRef,
        LinkEvent,
        Notifications,
        ScanFilter,
        ScanResult,
        ScanResults,
        TransportAdapter,
        TransportError,
    },
};

const CHANNEL_CAPACITY: usize = 64;

/// A device the simulator can discover.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatedDevice {
    /// Address reported in scan results.
    pub address: Address,
    /// Advertised name.
    pub name: Option<String>,
    /// Services matched against scan filters.
    pub advertised: Vec<Uuid>,
    /// Services returned by discovery.
    pub services: Vec<Uuid>,
    /// Connect or reconnect calls to refuse before accepting one.
    /// `usize::MAX` refuses forever.
    pub refusals: usize,
}

impl SimulatedDevice {
    /// A device at `address` advertising and exposing `services`.
    #[must_use]
    pub fn new(address: impl Into<Address>, services: impl IntoIterator<Item = Uuid>) -> Self {
        let services: Vec<_> = services.into_iter().collect();
        Self {
            address: address.into(),
            name: None,
            advertised: services.clone(),
            services,
            refusals: 0,
        }
    }

    /// Set the advertised name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Advertise `services` instead of the discoverable set.
    #[must_use]
    pub fn advertising(mut self, services: impl IntoIterator<Item = Uuid>) -> Self {
        self.advertised = services.into_iter().collect();
        self
    }

    /// Refuse the first `times` connection attempts.
    #[must_use]
    pub fn refusing(mut self, times: usize) -> Self {
        self.refusals = times;
        self
    }

    fn scan_result(&self) -> ScanResult {
        ScanResult {
            address: self.address.clone(),
            name: self.name.clone(),
            rssi: Some(-50),
        }
    }
}

/// Operation that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// [`TransportAdapter::initialize`].
    Initialize,
    /// [`TransportAdapter::start_scan`].
    StartScan,
    /// Both [`TransportAdapter::connect`] and [`TransportAdapter::reconnect`].
    Connect,
    /// [`TransportAdapter::is_connected`].
    IsConnected,
    /// [`TransportAdapter::discover_services`].
    Discover,
    /// [`TransportAdapter::subscribe`].
    Subscribe,
    /// [`TransportAdapter::write`].
    Write,
}

impl FaultPoint {
    const fn operation(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::StartScan => "startScan",
            Self::Connect => "connect",
            Self::IsConnected => "isConnected",
            Self::Discover => "discover",
            Self::Subscribe => "subscribe",
            Self::Write => "write",
        }
    }
}

/// One recorded adapter call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Initialize,
    IsInitialized,
    StartScan,
    StopScan,
    IsScanning,
    Connect(Address),
    Reconnect(Address),
    Disconnect(Address),
    IsConnected(Address),
    DiscoverServices(Address),
    Subscribe(Address),
    Write(Address),
}

#[derive(Debug, Default)]
struct SimState {
    initialized: bool,
    devices: Vec<SimulatedDevice>,
    scan: Option<(ScanFilter, mpsc::Sender<ScanResult>)>,
    connected: HashSet<Address>,
    subscription: Option<(Address, mpsc::Sender<Bytes>)>,
    faults: HashMap<FaultPoint, usize>,
    journal: Vec<Call>,
    written: Vec<Bytes>,
    echo: Option<(Chunker, ReassemblyBuffer)>,
}

impl SimState {
    /// Consume one injected failure for `point`, if any remain.
    fn take_fault(&mut self, point: FaultPoint) -> Result<(), TransportError> {
        match self.faults.get_mut(&point) {
            Some(0) | None => Ok(()),
            Some(remaining) => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                Err(TransportError::failed(point.operation(), "injected fault"))
            }
        }
    }

    fn device(&self, address: &Address) -> Option<&SimulatedDevice> {
        self.devices.iter().find(|device| &device.address == address)
    }

    fn admit(&mut self, address: &Address) -> Result<(), TransportError> {
        let device = self
            .devices
            .iter_mut()
            .find(|device| &device.address == address)
            .ok_or_else(|| TransportError::failed("connect", "unknown device"))?;
        match device.refusals {
            0 => Ok(()),
            usize::MAX => Err(TransportError::failed("connect", "connection refused")),
            _ => {
                device.refusals -= 1;
                Err(TransportError::failed("connect", "connection refused"))
            }
        }
    }

    fn require_connected(&self, address: &Address) -> Result<(), TransportError> {
        if self.connected.contains(address) {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    fn notify(&self, value: Bytes) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(|(_, tx)| tx.try_send(value).is_ok())
    }

    fn echo(&mut self, value: &[u8]) {
        let Some((chunker, buffer)) = self.echo.as_mut() else {
            return;
        };
        let Ok(Some(payload)) = buffer.push_raw(value) else {
            return;
        };
        let frames = chunker.encode(&payload);
        trace!(frames = frames.len(), "echoing payload");
        for frame in frames {
            self.notify(frame.to_bytes());
        }
    }
}

/// A scriptable [`TransportAdapter`] backed by `tokio` channels.
#[derive(Debug)]
pub struct SimulatedTransport {
    state: Mutex<SimState>,
    links: broadcast::Sender<LinkEvent>,
}

impl Default for SimulatedTransport {
    fn default() -> Self { Self::new() }
}

impl SimulatedTransport {
    /// An uninitialised simulator with no devices.
    #[must_use]
    pub fn new() -> Self {
        let (links, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(SimState::default()),
            links,
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a device. A running scan reports it if it matches.
    pub fn add_device(&self, device: SimulatedDevice) {
        let mut state = self.state();
        if let Some((filter, tx)) = &state.scan
            && filter.matches(&device.advertised)
        {
            let _ = tx.try_send(device.scan_result());
        }
        state.devices.push(device);
    }

    /// Forget a device. Existing connections are left alone.
    pub fn remove_device(&self, address: &Address) {
        self.state().devices.retain(|device| &device.address != address);
    }

    /// Builder-style [`add_device`](Self::add_device).
    #[must_use]
    pub fn with_device(self, device: SimulatedDevice) -> Self {
        self.add_device(device);
        self
    }

    /// Pretend the radio was initialised by an earlier session.
    #[must_use]
    pub fn initialized(self) -> Self {
        self.state().initialized = true;
        self
    }

    /// Pretend an earlier session left a scan running.
    #[must_use]
    pub fn with_residual_scan(self) -> Self {
        let (tx, _rx) = mpsc::channel(1);
        self.state().scan = Some((ScanFilter::default(), tx));
        self
    }

    /// Make the next `times` calls at `point` fail. `usize::MAX` fails
    /// forever.
    pub fn fail(&self, point: FaultPoint, times: usize) { self.state().faults.insert(point, times); }

    /// Remove any injected failures at `point`.
    pub fn heal(&self, point: FaultPoint) { self.state().faults.remove(&point); }

    /// Reassemble written payloads and send them straight back.
    pub fn enable_echo(&self, chunker: Chunker) {
        self.state().echo = Some((chunker, ReassemblyBuffer::new()));
    }

    /// End a running scan without reporting a device.
    pub fn end_scan(&self) { self.state().scan = None; }

    /// Deliver one raw notification to the subscriber.
    ///
    /// Returns `false` when nobody is subscribed.
    pub fn notify(&self, value: impl Into<Bytes>) -> bool { self.state().notify(value.into()) }

    /// Chunk `payload` and deliver every frame as a notification.
    pub fn send_payload(&self, chunker: &Chunker, payload: &[u8]) -> bool {
        let state = self.state();
        chunker
            .encode(payload)
            .into_iter()
            .all(|frame| state.notify(frame.to_bytes()))
    }

    /// Drop the link to `address` as if the peer went out of range.
    pub fn drop_link(&self, address: &Address) {
        {
            let mut state = self.state();
            state.connected.remove(address);
            if state
                .subscription
                .as_ref()
                .is_some_and(|(subscribed, _)| subscribed == address)
            {
                state.subscription = None;
            }
        }
        debug!(%address, "simulated link dropped");
        let _ = self.links.send(LinkEvent::Disconnected {
            address: address.clone(),
        });
    }

    /// Every adapter call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> { self.state().journal.clone() }

    /// Number of recorded calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state().journal.iter().filter(|&call| predicate(call)).count()
    }

    /// Every successfully written packet, in order.
    #[must_use]
    pub fn written(&self) -> Vec<Bytes> { self.state().written.clone() }

    /// Whether `address` currently holds a notification subscription.
    #[must_use]
    pub fn is_subscribed(&self, address: &Address) -> bool {
        self.state()
            .subscription
            .as_ref()
            .is_some_and(|(subscribed, _)| subscribed == address)
    }

    fn record(&self, call: Call) -> MutexGuard<'_, SimState> {
        let mut state = self.state();
        trace!(?call, "simulated adapter call");
        state.journal.push(call);
        state
    }

    fn open_link(&self, call: Call, address: &Address) -> Result<(), TransportError> {
        {
            let mut state = self.record(call);
            state.take_fault(FaultPoint::Connect)?;
            state.admit(address)?;
            state.connected.insert(address.clone());
        }
        let _ = self.links.send(LinkEvent::Connected {
            address: address.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for SimulatedTransport {
    async fn initialize(&self) -> Result<(), TransportError> {
        let mut state = self.record(Call::Initialize);
        state.take_fault(FaultPoint::Initialize)?;
        state.initialized = true;
        Ok(())
    }

    async fn is_initialized(&self) -> Result<bool, TransportError> {
        Ok(self.record(Call::IsInitialized).initialized)
    }

    async fn start_scan(&self, filter: &ScanFilter) -> Result<ScanResults, TransportError> {
        let mut state = self.record(Call::StartScan);
        state.take_fault(FaultPoint::StartScan)?;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        for device in state.devices.iter().filter(|d| filter.matches(&d.advertised)) {
            let _ = tx.try_send(device.scan_result());
        }
        state.scan = Some((filter.clone(), tx));
        Ok(rx)
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        self.record(Call::StopScan).scan = None;
        Ok(())
    }

    async fn is_scanning(&self) -> Result<bool, TransportError> {
        Ok(self.record(Call::IsScanning).scan.is_some())
    }

    async fn connect(&self, address: &Address) -> Result<(), TransportError> {
        self.open_link(Call::Connect(address.clone()), address)
    }

    async fn reconnect(&self, address: &Address) -> Result<(), TransportError> {
        self.open_link(Call::Reconnect(address.clone()), address)
    }

    async fn disconnect(&self, address: &Address) -> Result<(), TransportError> {
        let was_connected = self
            .record(Call::Disconnect(address.clone()))
            .connected
            .remove(address);
        if was_connected {
            let _ = self.links.send(LinkEvent::Disconnected {
                address: address.clone(),
            });
        }
        Ok(())
    }

    async fn is_connected(&self, address: &Address) -> Result<bool, TransportError> {
        let mut state = self.record(Call::IsConnected(address.clone()));
        state.take_fault(FaultPoint::IsConnected)?;
        Ok(state.connected.contains(address))
    }

    async fn discover_services(&self, address: &Address) -> Result<Vec<Uuid>, TransportError> {
        let mut state = self.record(Call::DiscoverServices(address.clone()));
        state.take_fault(FaultPoint::Discover)?;
        state.require_connected(address)?;
        Ok(state
            .device(address)
            .map(|device| device.services.clone())
            .unwrap_or_default())
    }

    async fn subscribe(
        &self,
        address: &Address,
        _target: &CharacteristicRef,
    ) -> Result<Notifications, TransportError> {
        let mut state = self.record(Call::Subscribe(address.clone()));
        state.take_fault(FaultPoint::Subscribe)?;
        state.require_connected(address)?;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        state.subscription = Some((address.clone(), tx));
        Ok(rx)
    }

    async fn write(
        &self,
        address: &Address,
        _target: &CharacteristicRef,
        value: Bytes,
    ) -> Result<(), TransportError> {
        let mut state = self.record(Call::Write(address.clone()));
        state.take_fault(FaultPoint::Write)?;
        state.require_connected(address)?;
        state.written.push(value.clone());
        state.echo(&value);
        Ok(())
    }

    fn link_events(&self) -> broadcast::Receiver<LinkEvent> { self.links.subscribe() }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::{Call, FaultPoint, SimulatedDevice, SimulatedTransport};
    use crate::{
        chunk::Chunker,
        transport::{Address, LinkEvent, ScanFilter, TransportAdapter, TransportError},
    };

    #[tokio::test]
    async fn scan_reports_only_matching_devices() {
        let wanted = Uuid::new_v4();
        let sim = SimulatedTransport::new()
            .with_device(SimulatedDevice::new("other", [Uuid::new_v4()]))
            .with_device(SimulatedDevice::new("lamp", [wanted]).named("Lamp"));

        let mut results = sim
            .start_scan(&ScanFilter::service(wanted))
            .await
            .expect("scan starts");
        let found = results.recv().await.expect("device reported");
        assert_eq!(found.address, Address::from("lamp"));
        assert_eq!(found.name.as_deref(), Some("Lamp"));
        assert!(results.try_recv().is_err());
    }

    #[tokio::test]
    async fn late_devices_reach_running_scan() {
        let sim = SimulatedTransport::new();
        let mut results = sim.start_scan(&ScanFilter::default()).await.expect("scan");
        sim.add_device(SimulatedDevice::new("late", []));
        assert_eq!(
            results.recv().await.map(|r| r.address),
            Some(Address::from("late"))
        );
        sim.end_scan();
        assert!(results.recv().await.is_none());
    }

    #[tokio::test]
    async fn faults_are_consumed_in_order() {
        let sim = SimulatedTransport::new().with_device(SimulatedDevice::new("lamp", []));
        sim.fail(FaultPoint::Connect, 1);
        let address = Address::from("lamp");

        assert!(matches!(
            sim.connect(&address).await,
            Err(TransportError::Failed { operation: "connect", .. })
        ));
        assert!(sim.reconnect(&address).await.is_ok());
        assert_eq!(
            sim.calls(),
            [Call::Connect(address.clone()), Call::Reconnect(address)]
        );
    }

    #[tokio::test]
    async fn refusing_device_accepts_after_quota() {
        let sim = SimulatedTransport::new().with_device(SimulatedDevice::new("lamp", []).refusing(2));
        let address = Address::from("lamp");

        assert!(sim.connect(&address).await.is_err());
        assert!(sim.reconnect(&address).await.is_err());
        assert!(sim.reconnect(&address).await.is_ok());
        assert!(sim.is_connected(&address).await.expect("query"));
    }

    #[tokio::test]
    async fn drop_link_closes_subscription_and_broadcasts() {
        let sim = Arc::new(SimulatedTransport::new().with_device(SimulatedDevice::new("lamp", [])));
        let address = Address::from("lamp");
        let mut links = sim.link_events();
        sim.connect(&address).await.expect("connect");
        let target = crate::config::SessionConfig::builder()
            .identifier("t")
            .build()
            .expect("config")
            .command_target();
        let mut notifications = sim.subscribe(&address, &target).await.expect("subscribe");

        sim.drop_link(&address);

        assert_eq!(
            links.recv().await.expect("event"),
            LinkEvent::Connected {
                address: address.clone()
            }
        );
        assert_eq!(
            links.recv().await.expect("event"),
            LinkEvent::Disconnected {
                address: address.clone()
            }
        );
        assert!(notifications.recv().await.is_none());
        assert!(!sim.is_connected(&address).await.expect("query"));
    }

    #[tokio::test]
    async fn echo_sends_written_payload_back() {
        let sim = SimulatedTransport::new().with_device(SimulatedDevice::new("lamp", []));
        let address = Address::from("lamp");
        let chunker = Chunker::default();
        sim.enable_echo(chunker);
        sim.connect(&address).await.expect("connect");
        let target = crate::config::SessionConfig::builder()
            .identifier("t")
            .build()
            .expect("config")
            .command_target();
        let mut notifications = sim.subscribe(&address, &target).await.expect("subscribe");

        for frame in chunker.encode(br#"{"c":"ping","a":{"n":1}}"#) {
            sim.write(&address, &target, frame.to_bytes())
                .await
                .expect("write");
        }

        assert_eq!(sim.written().len(), 2);
        let first = notifications.recv().await.expect("echoed frame");
        assert_eq!(first.first(), Some(&b'S'));
        let second = notifications.recv().await.expect("echoed frame");
        assert_eq!(&second[..], br#"E":1}}"#);
    }
}
