//! One-byte tags marking a frame's position within its payload.

use std::fmt;

/// Position of a [`Frame`](super::Frame) within the payload it belongs to.
///
/// The tag is the first byte on the wire and is printable ASCII so captured
/// traffic stays readable.
///
/// # Examples
///
/// ```
/// use peerlink::chunk::FrameKind;
/// assert_eq!(FrameKind::Start.tag(), b'S');
/// assert_eq!(FrameKind::from_tag(b'F'), Some(FrameKind::Full));
/// assert_eq!(FrameKind::from_tag(b'x'), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// First frame of a multi-frame payload.
    Start,
    /// Interior frame of a multi-frame payload.
    Middle,
    /// Last frame of a multi-frame payload.
    End,
    /// The whole payload in one frame.
    Full,
}

impl FrameKind {
    /// Number of bytes the tag occupies on the wire.
    pub const TAG_LEN: usize = 1;

    /// Return the wire tag for this kind.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Start => b'S',
            Self::Middle => b'M',
            Self::End => b'E',
            Self::Full => b'F',
        }
    }

    /// Map a wire tag back to its kind.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'S' => Some(Self::Start),
            b'M' => Some(Self::Middle),
            b'E' => Some(Self::End),
            b'F' => Some(Self::Full),
            _ => None,
        }
    }

    /// Whether a frame of this kind begins a new payload.
    #[must_use]
    pub const fn opens_payload(self) -> bool { matches!(self, Self::Start | Self::Full) }

    /// Whether a frame of this kind completes a payload.
    #[must_use]
    pub const fn closes_payload(self) -> bool { matches!(self, Self::End | Self::Full) }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
            Self::Full => "full",
        };
        f.write_str(name)
    }
}
