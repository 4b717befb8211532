//! Shared utilities for integration tests.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{future::Future, time::Duration};

use proptest::test_runner::{Config as ProptestConfig, RngAlgorithm, TestRng, TestRunner};

/// Result type for fallible integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Generous bound for waits on paused time; only hit when a test hangs.
pub const PATIENCE: Duration = Duration::from_secs(60);

/// Await `future`, failing the test if it does not finish within
/// [`PATIENCE`] of virtual time.
pub async fn within<F: Future>(future: F) -> TestResult<F::Output> {
    tokio::time::timeout(PATIENCE, future)
        .await
        .map_err(|_| "timed out waiting on session".into())
}

/// A proptest runner with a fixed seed so failures reproduce.
pub fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    let rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    TestRunner::new_with_rng(config, rng)
}
