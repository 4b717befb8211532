//! Metric helpers for `peerlink`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

/// Name of the counter tracking frames written or received.
pub const FRAMES_TOTAL: &str = "peerlink_frames_total";
/// Name of the counter tracking reconnect cycles.
pub const RECONNECT_ATTEMPTS: &str = "peerlink_reconnect_attempts_total";
/// Name of the counter tracking inbound payloads dropped as malformed.
pub const MALFORMED_PAYLOADS: &str = "peerlink_malformed_payloads_total";
/// Name of the counter tracking failed frame writes.
pub const WRITE_FAILURES: &str = "peerlink_write_failures_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Frames received from the peer.
    Inbound,
    /// Frames written to the peer.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a processed frame for the given direction.
#[cfg(feature = "metrics")]
pub fn inc_frames(direction: Direction) {
    metrics::counter!(FRAMES_TOTAL, "direction" => direction.as_str()).increment(1);
}

/// Record a processed frame for the given direction.
#[cfg(not(feature = "metrics"))]
pub fn inc_frames(_direction: Direction) {}

/// Record one reconnect cycle.
#[cfg(feature = "metrics")]
pub fn inc_reconnects() { metrics::counter!(RECONNECT_ATTEMPTS).increment(1); }

/// Record one reconnect cycle.
#[cfg(not(feature = "metrics"))]
pub fn inc_reconnects() {}

/// Record an inbound payload dropped as malformed.
#[cfg(feature = "metrics")]
pub fn inc_malformed() { metrics::counter!(MALFORMED_PAYLOADS).increment(1); }

/// Record an inbound payload dropped as malformed.
#[cfg(not(feature = "metrics"))]
pub fn inc_malformed() {}

/// Record a failed frame write.
#[cfg(feature = "metrics")]
pub fn inc_write_failures() { metrics::counter!(WRITE_FAILURES).increment(1); }

/// Record a failed frame write.
#[cfg(not(feature = "metrics"))]
pub fn inc_write_failures() {}
