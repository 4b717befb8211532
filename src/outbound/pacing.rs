//! Fixed intervals that pace the drain loop.

use std::time::Duration;

/// Delays applied between outbound frames.
///
/// # Default Values
/// - `inter_frame`: 50 milliseconds
/// - `backpressure_retry`: 100 milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    /// Pause after each completed write before the next frame.
    pub inter_frame: Duration,
    /// Pause before re-checking while an inbound payload is in progress.
    pub backpressure_retry: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            inter_frame: Duration::from_millis(50),
            backpressure_retry: Duration::from_millis(100),
        }
    }
}
