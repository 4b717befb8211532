//! Background delivery of a single outgoing event.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::task::JoinHandle;

use super::Shared;
use crate::{
    chunk::FrameBatch,
    error::SendError,
    outbound::{DrainOutcome, FrameWriter},
    transport::TransportError,
};

/// Handle to an event handed to [`Session::send_event`](super::Session::send_event).
///
/// Dropping the handle detaches the delivery; it still runs to completion.
#[derive(Debug)]
pub struct Delivery {
    handle: JoinHandle<Result<DrainOutcome, SendError>>,
}

impl Delivery {
    pub(super) fn new(handle: JoinHandle<Result<DrainOutcome, SendError>>) -> Self {
        Self { handle }
    }

    /// Whether the delivery task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool { self.handle.is_finished() }

    /// Wait for the write path to finish.
    ///
    /// [`DrainOutcome::AlreadyDraining`] means another delivery's drain loop
    /// took over this event's frames.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Connect`] when the connection attempt failed,
    /// [`SendError::Write`] when a frame write failed,
    /// [`SendError::NotConnected`] when the peer vanished mid-drain, and
    /// [`SendError::Aborted`] when the session shut down first.
    pub async fn wait(self) -> Result<DrainOutcome, SendError> {
        self.handle.await.unwrap_or(Err(SendError::Aborted))
    }
}

/// Writes frames to whichever peer is current when each frame goes out.
struct PeerWriter<'a> {
    shared: &'a Shared,
}

#[async_trait]
impl FrameWriter for PeerWriter<'_> {
    async fn write_frame(&self, frame: Bytes) -> Result<(), TransportError> {
        let Some(peer) = self.shared.current_peer() else {
            return Err(TransportError::NotConnected);
        };
        self.shared
            .adapter
            .write(&peer, &self.shared.config.command_target(), frame)
            .await
    }
}

pub(super) async fn deliver(
    shared: Arc<Shared>,
    batch: FrameBatch,
) -> Result<DrainOutcome, SendError> {
    tokio::select! {
        biased;
        () = shared.shutdown.cancelled() => Err(SendError::Aborted),
        outcome = transmit(&shared, batch) => outcome,
    }
}

async fn transmit(shared: &Arc<Shared>, batch: FrameBatch) -> Result<DrainOutcome, SendError> {
    shared.when_connected().await?;
    shared.outbound.enqueue(batch);

    let writer = PeerWriter { shared };
    match shared
        .outbound
        .drain(&writer, &shared.inbound, shared.config.pacing())
        .await
    {
        Err(SendError::Write(TransportError::NotConnected)) => Err(SendError::NotConnected),
        outcome => outcome,
    }
}
