//! Inbound helper that stitches frames back into complete payloads.
//!
//! [`ReassemblyBuffer`] mirrors the outbound [`Chunker`](crate::chunk::Chunker).
//! It holds at most one payload in progress and relies on the link to deliver
//! frames in order: there is no message identifier, length prefix or
//! checksum to check against. An opening frame arriving while another
//! payload is still incomplete silently replaces it.

use std::sync::Mutex;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::{
    chunk::{Frame, FrameError},
    outbound::InboundGate,
};

/// Accumulates the payload currently being received.
#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    buffer: BytesMut,
}

impl ReassemblyBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Feed one frame into the buffer.
    ///
    /// Returns `Some(payload)` when the frame completes a payload, after
    /// which the buffer is empty again. `Start` and `Full` frames discard any
    /// partial content without raising an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use peerlink::{
    ///     chunk::{Frame, FrameKind},
    ///     reassembly::ReassemblyBuffer,
    /// };
    ///
    /// let mut buffer = ReassemblyBuffer::new();
    /// assert!(buffer.push(Frame::new(FrameKind::Start, b"{\"c\":".to_vec())).is_none());
    /// assert!(buffer.is_receiving());
    /// let payload = buffer.push(Frame::new(FrameKind::End, b"\"x\"}".to_vec()));
    /// assert_eq!(payload.as_deref(), Some(&b"{\"c\":\"x\"}"[..]));
    /// assert!(!buffer.is_receiving());
    /// ```
    pub fn push(&mut self, frame: Frame) -> Option<Bytes> {
        let (kind, segment) = frame.into_parts();
        if kind.opens_payload() {
            if !self.buffer.is_empty() {
                debug!(
                    discarded = self.buffer.len(),
                    %kind,
                    "new payload replaces incomplete one"
                );
            }
            self.buffer.clear();
        }
        self.buffer.extend_from_slice(&segment);

        if kind.closes_payload() {
            Some(self.buffer.split().freeze())
        } else {
            None
        }
    }

    /// Parse raw notification bytes and feed the resulting frame.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] when the bytes do not start with a frame
    /// tag. The buffer is left untouched in that case.
    pub fn push_raw(&mut self, raw: &[u8]) -> Result<Option<Bytes>, FrameError> {
        Frame::parse(raw).map(|frame| self.push(frame))
    }

    /// Whether a payload is partially received.
    #[must_use]
    pub fn is_receiving(&self) -> bool { !self.buffer.is_empty() }

    /// Number of bytes buffered for the payload in progress.
    #[must_use]
    pub fn len(&self) -> usize { self.buffer.len() }

    /// Whether the buffer holds no partial payload.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.buffer.is_empty() }

    /// Drop any partial payload.
    pub fn reset(&mut self) { self.buffer.clear(); }
}

impl InboundGate for Mutex<ReassemblyBuffer> {
    fn is_receiving(&self) -> bool {
        self.lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_receiving()
    }
}
