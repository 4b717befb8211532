//! Outbound helper that splits payloads into tagged frames.
//!
//! [`Chunker`] cuts a payload into fixed-size segments and tags each one
//! with its [`FrameKind`]. No length prefix or checksum is added: framing
//! relies entirely on the link delivering frames in order.

use std::num::NonZeroUsize;

use super::{DEFAULT_CHUNK_SIZE, Frame, FrameKind};

/// Splits payloads into frames carrying at most `chunk_size` bytes each.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: NonZeroUsize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl Chunker {
    /// Create a chunker that caps segments at `chunk_size` bytes.
    #[must_use]
    pub const fn new(chunk_size: NonZeroUsize) -> Self { Self { chunk_size } }

    /// Derive a chunker from the largest write the link accepts.
    ///
    /// Returns `None` when `mtu` cannot hold the tag byte and at least one
    /// payload byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use peerlink::chunk::Chunker;
    /// assert_eq!(Chunker::for_mtu(20).map(|c| c.chunk_size().get()), Some(19));
    /// assert!(Chunker::for_mtu(1).is_none());
    /// ```
    #[must_use]
    pub fn for_mtu(mtu: usize) -> Option<Self> {
        NonZeroUsize::new(mtu.checked_sub(FrameKind::TAG_LEN)?).map(Self::new)
    }

    /// Return the maximum number of payload bytes per frame.
    #[must_use]
    pub const fn chunk_size(&self) -> NonZeroUsize { self.chunk_size }

    /// Split `payload` into frames in send order.
    ///
    /// A payload no longer than the chunk size (including an empty one)
    /// becomes a single [`FrameKind::Full`] frame.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZeroUsize;
    ///
    /// use peerlink::chunk::{Chunker, FrameKind};
    ///
    /// let chunker = Chunker::new(NonZeroUsize::new(4).expect("non-zero"));
    /// let kinds: Vec<_> = chunker
    ///     .encode(b"0123456789")
    ///     .frames()
    ///     .iter()
    ///     .map(|f| f.kind())
    ///     .collect();
    /// assert_eq!(kinds, [FrameKind::Start, FrameKind::Middle, FrameKind::End]);
    /// ```
    #[must_use]
    pub fn encode(&self, payload: impl AsRef<[u8]>) -> FrameBatch {
        let payload = payload.as_ref();
        let size = self.chunk_size.get();
        if payload.len() <= size {
            return FrameBatch::new(vec![Frame::new(
                FrameKind::Full,
                payload.to_vec(),
            )]);
        }

        let count = payload.len().div_ceil(size);
        let frames = payload
            .chunks(size)
            .enumerate()
            .map(|(index, segment)| {
                let kind = if index == 0 {
                    FrameKind::Start
                } else if index + 1 == count {
                    FrameKind::End
                } else {
                    FrameKind::Middle
                };
                Frame::new(kind, segment.to_vec())
            })
            .collect();
        FrameBatch::new(frames)
    }
}

/// Frames produced for a single payload, in send order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBatch {
    frames: Vec<Frame>,
}

impl FrameBatch {
    fn new(frames: Vec<Frame>) -> Self {
        debug_assert!(!frames.is_empty(), "frame batches must not be empty");
        Self { frames }
    }

    /// Return the frames as a slice.
    #[must_use]
    pub fn frames(&self) -> &[Frame] { self.frames.as_slice() }

    /// Number of frames in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches are guaranteed non-empty"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.frames.len() }

    /// Whether the payload needed more than one frame.
    #[must_use]
    pub fn is_chunked(&self) -> bool { self.len() > 1 }

    /// Consume the batch, returning all frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<Frame> { self.frames }
}

impl IntoIterator for FrameBatch {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter { self.frames.into_iter() }
}
