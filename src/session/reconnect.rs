//! Delay policy for the reconnect loop.

use std::time::Duration;

/// Delays applied between reconnect cycles.
///
/// The first cycle waits `initial_delay`; every further failure doubles the
/// delay up to `max_delay`. With both set to the same value the delay is
/// fixed. The loop itself has no retry limit: it ends only when a connection
/// succeeds or another attempt has already connected a peer.
///
/// # Default Values
/// - `initial_delay`: 100 milliseconds
/// - `max_delay`: 100 milliseconds
///
/// # Invariants
/// - `initial_delay` must not exceed `max_delay`
/// - `initial_delay` must be at least 1 millisecond
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect call.
    pub initial_delay: Duration,
    /// Upper bound once the delay has grown.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self { Self::fixed(Duration::from_millis(100)) }
}

impl ReconnectPolicy {
    /// A policy that always waits `delay`.
    #[must_use]
    pub const fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
        }
    }

    /// Clamp delays to sane bounds and ensure `initial_delay <= max_delay`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use peerlink::session::ReconnectPolicy;
    ///
    /// let policy = ReconnectPolicy {
    ///     initial_delay: Duration::from_millis(500),
    ///     max_delay: Duration::ZERO,
    /// };
    ///
    /// let normalized = policy.normalized();
    /// assert_eq!(normalized.initial_delay, Duration::from_millis(1));
    /// assert_eq!(normalized.max_delay, Duration::from_millis(500));
    /// ```
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.initial_delay = self.initial_delay.max(Duration::from_millis(1));
        self.max_delay = self.max_delay.max(Duration::from_millis(1));
        if self.initial_delay > self.max_delay {
            std::mem::swap(&mut self.initial_delay, &mut self.max_delay);
        }
        self
    }

    /// Delay before reconnect cycle `cycle`, counting from 1.
    #[must_use]
    pub fn delay_for(&self, cycle: u32) -> Duration {
        let exponent = cycle.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1 << exponent)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::ReconnectPolicy;

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(50)]
    fn default_policy_is_fixed(#[case] cycle: u32) {
        assert_eq!(
            ReconnectPolicy::default().delay_for(cycle),
            Duration::from_millis(100)
        );
    }

    #[test]
    fn backoff_doubles_up_to_ceiling() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        let delays: Vec<_> = (1..=4).map(|cycle| policy.delay_for(cycle)).collect();
        assert_eq!(
            delays,
            [
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(350),
                Duration::from_millis(350),
            ]
        );
    }

    #[test]
    fn zero_cycle_uses_initial_delay() {
        assert_eq!(
            ReconnectPolicy::fixed(Duration::from_millis(7)).delay_for(0),
            Duration::from_millis(7)
        );
    }
}
