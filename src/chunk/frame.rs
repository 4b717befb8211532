//! A single transmissible unit: tag byte plus payload segment.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use super::FrameKind;

/// Errors raised while reading a frame off the wire.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The notification carried no bytes at all.
    #[error("empty frame")]
    Empty,
    /// The first byte is not a known [`FrameKind`] tag.
    #[error("unknown frame tag {0:#04x}")]
    UnknownTag(u8),
}

/// One tagged segment of a chunked payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    kind: FrameKind,
    segment: Bytes,
}

impl Frame {
    /// Construct a frame from its parts.
    #[must_use]
    pub fn new(kind: FrameKind, segment: impl Into<Bytes>) -> Self {
        Self {
            kind,
            segment: segment.into(),
        }
    }

    /// Parse a frame from the raw bytes of a notification.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Empty`] for an empty notification and
    /// [`FrameError::UnknownTag`] when the first byte is not a frame tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use peerlink::chunk::{Frame, FrameKind};
    /// let frame = Frame::parse(b"E\"}").expect("valid frame");
    /// assert_eq!(frame.kind(), FrameKind::End);
    /// assert_eq!(frame.segment(), b"\"}");
    /// ```
    pub fn parse(raw: &[u8]) -> Result<Self, FrameError> {
        let (&tag, rest) = raw.split_first().ok_or(FrameError::Empty)?;
        let kind = FrameKind::from_tag(tag).ok_or(FrameError::UnknownTag(tag))?;
        Ok(Self::new(kind, Bytes::copy_from_slice(rest)))
    }

    /// Return the frame's kind.
    #[must_use]
    pub const fn kind(&self) -> FrameKind { self.kind }

    /// Borrow the payload segment, without the tag.
    #[must_use]
    pub fn segment(&self) -> &[u8] { &self.segment }

    /// Length of the frame on the wire, tag included.
    #[must_use]
    pub fn wire_len(&self) -> usize { FrameKind::TAG_LEN + self.segment.len() }

    /// Serialise the frame into the bytes handed to the transport.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        buf.put_u8(self.kind.tag());
        buf.put_slice(&self.segment);
        buf.freeze()
    }

    /// Consume the frame, returning its components.
    #[must_use]
    pub fn into_parts(self) -> (FrameKind, Bytes) { (self.kind, self.segment) }
}
