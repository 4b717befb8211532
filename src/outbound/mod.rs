//! Outbound frame queue and its paced drain loop.
//!
//! Payloads are chunked into frames and appended to a single
//! [`OutboundQueue`] shared by every sender on the session. One drain loop at
//! a time pops frames and hands them to a [`FrameWriter`], waiting for each
//! write to complete and pausing while the peer is mid-way through sending
//! us a payload.

use async_trait::async_trait;
use bytes::Bytes;

use crate::transport::TransportError;

mod pacing;
mod queue;

pub use pacing::Pacing;
pub use queue::{DrainOutcome, OutboundQueue};

/// Destination for drained frames.
#[async_trait]
pub trait FrameWriter: Send + Sync {
    /// Write one serialised frame, resolving once the link accepted it.
    async fn write_frame(&self, frame: Bytes) -> Result<(), TransportError>;
}

/// Reports whether an inbound payload is partially received.
///
/// The link is treated as half-duplex at the payload level: the drain loop
/// holds back while this returns `true`.
pub trait InboundGate: Send + Sync {
    /// Whether an inbound payload is in progress.
    fn is_receiving(&self) -> bool;
}

#[cfg(test)]
mod tests;
