//! Message chunking for links that only carry small packets.
//!
//! A logical payload is split into [`Frame`]s whose first byte is a
//! [`FrameKind`] tag followed by at most `chunk_size` payload bytes. Short
//! payloads travel as a single [`FrameKind::Full`] frame; longer ones as a
//! `Start`, zero or more `Middle` frames and a closing `End`.
//!
//! The inbound side lives in [`crate::reassembly`].

pub mod chunker;
pub mod frame;
pub mod kind;

pub use chunker::{Chunker, FrameBatch};
pub use frame::{Frame, FrameError};
pub use kind::FrameKind;

/// Smallest write every supported link accepts, in bytes.
pub const DEFAULT_MTU: usize = 20;

/// Payload bytes carried by each frame when the default MTU is used.
pub const DEFAULT_CHUNK_SIZE: usize = DEFAULT_MTU - FrameKind::TAG_LEN;
