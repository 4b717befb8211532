//! The connection attempt as an explicit state machine.
//!
//! Each [`Step`] issues one adapter call (plus any settling delay) and
//! yields the next step. A single driver task walks the steps, so one
//! attempt never runs a stage concurrently with itself.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, warn};

use super::{ConnectionState, Shared};
use crate::{
    error::Stage,
    metrics,
    tracing_helpers::dynamic_event,
    transport::{Address, Notifications, ScanFilter, TransportError},
};

#[derive(Debug)]
enum Step {
    Probe,
    Initialize,
    Scan,
    Connect(Address),
    Reconnect { address: Address, cycle: u32 },
    Discover(Address),
    Subscribe(Address),
}

impl Step {
    const fn state(&self) -> ConnectionState {
        match self {
            Self::Probe | Self::Initialize => ConnectionState::Initializing,
            Self::Scan => ConnectionState::Scanning,
            Self::Connect(_) | Self::Reconnect { .. } => ConnectionState::Connecting,
            Self::Discover(_) => ConnectionState::Discovering,
            Self::Subscribe(_) => ConnectionState::Subscribing,
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::Initialize => "initialize",
            Self::Scan => "scan",
            Self::Connect(_) => "connect",
            Self::Reconnect { .. } => "reconnect",
            Self::Discover(_) => "discover",
            Self::Subscribe(_) => "subscribe",
        }
    }
}

enum Flow {
    Next(Step),
    Subscribed {
        peer: Address,
        notifications: Notifications,
    },
    Failed {
        stage: Stage,
        source: TransportError,
    },
    /// Another attempt connected this peer first.
    Superseded(Address),
    /// The attempt ends without resolving anyone.
    Halted,
}

/// Run one connection attempt to completion.
///
/// The caller must have claimed the `initializing` guard. Once a connect
/// failure releases it, other attempts may run alongside this one; every
/// step first checks whether one of them has already connected.
pub(super) async fn drive(shared: Arc<Shared>) {
    let mut step = Step::Probe;
    loop {
        let flow = if let Some(peer) = shared.current_peer() {
            Flow::Superseded(peer)
        } else {
            shared.enter(step.state());
            dynamic_event!(shared.level, step = step.name(), "lifecycle step");
            tokio::select! {
                biased;
                () = shared.shutdown.cancelled() => return,
                flow = advance(&shared, step) => flow,
            }
        };

        match flow {
            Flow::Next(next) => step = next,
            Flow::Subscribed {
                peer,
                notifications,
            } => {
                shared.complete(peer, notifications).await;
                return;
            }
            Flow::Failed { stage, source } => {
                shared.fail(stage, source);
                return;
            }
            Flow::Superseded(peer) => {
                shared.settle(&peer);
                return;
            }
            Flow::Halted => return,
        }
    }
}

async fn advance(shared: &Shared, step: Step) -> Flow {
    let adapter = shared.adapter.as_ref();
    match step {
        Step::Probe => match adapter.is_initialized().await {
            Ok(true) => {
                stop_residual_scan(shared).await;
                Flow::Next(Step::Scan)
            }
            Ok(false) => Flow::Next(Step::Initialize),
            Err(err) => {
                debug!(error = %err, "initialisation probe failed; initialising anyway");
                Flow::Next(Step::Initialize)
            }
        },
        Step::Initialize => match adapter.initialize().await {
            Ok(()) => Flow::Next(Step::Scan),
            Err(source) => Flow::Failed {
                stage: Stage::Initialize,
                source,
            },
        },
        Step::Scan => scan(shared).await,
        Step::Connect(address) => {
            sleep(shared.config.timings().connect_settle).await;
            match adapter.connect(&address).await {
                Ok(()) => Flow::Next(Step::Discover(address)),
                Err(err) => {
                    warn!(%address, error = %err, "connect failed; entering reconnect loop");
                    shared.release_guard();
                    Flow::Next(Step::Reconnect { address, cycle: 1 })
                }
            }
        }
        Step::Reconnect { address, cycle } => reconnect(shared, address, cycle).await,
        Step::Discover(address) => discover(shared, address).await,
        Step::Subscribe(address) => {
            match adapter
                .subscribe(&address, &shared.config.command_target())
                .await
            {
                Ok(notifications) => Flow::Subscribed {
                    peer: address,
                    notifications,
                },
                Err(source) => Flow::Failed {
                    stage: Stage::Subscribe,
                    source,
                },
            }
        }
    }
}

async fn scan(shared: &Shared) -> Flow {
    let adapter = shared.adapter.as_ref();
    let filter = ScanFilter::service(shared.config.service_id());
    let mut results = match adapter.start_scan(&filter).await {
        Ok(results) => results,
        Err(source) => {
            return Flow::Failed {
                stage: Stage::StartScan,
                source,
            };
        }
    };

    let Some(found) = results.recv().await else {
        return Flow::Failed {
            stage: Stage::StartScan,
            source: TransportError::ScanEnded,
        };
    };
    dynamic_event!(
        shared.level,
        address = %found.address,
        name = ?found.name,
        rssi = ?found.rssi,
        "found matching device"
    );
    if let Err(err) = adapter.stop_scan().await {
        warn!(error = %err, "failed to stop scan");
    }
    Flow::Next(Step::Connect(found.address))
}

async fn reconnect(shared: &Shared, address: Address, cycle: u32) -> Flow {
    let adapter = shared.adapter.as_ref();
    if let Err(err) = adapter.disconnect(&address).await {
        debug!(%address, error = %err, "disconnect before reconnect failed");
    }
    sleep(shared.config.reconnect().delay_for(cycle)).await;
    if let Some(peer) = shared.current_peer() {
        return Flow::Superseded(peer);
    }

    metrics::inc_reconnects();
    dynamic_event!(shared.level, %address, cycle, "reconnecting");
    match adapter.reconnect(&address).await {
        Ok(()) => Flow::Next(Step::Discover(address)),
        Err(err) => {
            warn!(%address, cycle, error = %err, "reconnect failed");
            Flow::Next(Step::Reconnect {
                address,
                cycle: cycle.saturating_add(1),
            })
        }
    }
}

async fn discover(shared: &Shared, address: Address) -> Flow {
    sleep(shared.config.timings().discover_settle).await;
    let service_id = shared.config.service_id();
    match shared.adapter.discover_services(&address).await {
        Ok(services) if services.contains(&service_id) => Flow::Next(Step::Subscribe(address)),
        Ok(services) => {
            // The attempt keeps its guard: later callers queue behind it.
            warn!(
                %address,
                service = %service_id,
                advertised = services.len(),
                "expected service missing; connection attempt stalled"
            );
            Flow::Halted
        }
        Err(source) => Flow::Failed {
            stage: Stage::Discover,
            source,
        },
    }
}

pub(super) async fn stop_residual_scan(shared: &Shared) {
    let adapter = shared.adapter.as_ref();
    match adapter.is_scanning().await {
        Ok(true) => {
            if let Err(err) = adapter.stop_scan().await {
                warn!(error = %err, "failed to stop residual scan");
            }
        }
        Ok(false) => {}
        Err(err) => debug!(error = %err, "scan state unavailable"),
    }
}
