//! Callers waiting for the in-flight connection attempt.

use tokio::sync::oneshot;

use crate::{error::ConnectError, transport::Address};

/// Outcome delivered to every waiter.
pub(crate) type ConnectOutcome = Result<Address, ConnectError>;

/// One-shot continuations registered while an attempt is under way.
///
/// Waiters are resolved exactly once, in registration order, and the
/// registry is empty afterwards.
#[derive(Debug, Default)]
pub(crate) struct PendingRegistry {
    waiters: Vec<oneshot::Sender<ConnectOutcome>>,
}

impl PendingRegistry {
    /// Register a waiter and return the receiving end.
    pub(crate) fn register(&mut self) -> oneshot::Receiver<ConnectOutcome> {
        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);
        rx
    }

    /// Number of registered waiters.
    pub(crate) fn len(&self) -> usize { self.waiters.len() }

    /// Take every waiter, leaving the registry empty.
    pub(crate) fn take(&mut self) -> PendingWaiters {
        PendingWaiters(std::mem::take(&mut self.waiters))
    }
}

/// Waiters detached from the registry, ready to be resolved outside any lock.
#[derive(Debug)]
pub(crate) struct PendingWaiters(Vec<oneshot::Sender<ConnectOutcome>>);

impl PendingWaiters {
    /// Deliver `outcome` to every waiter in registration order.
    ///
    /// Returns how many waiters were still listening.
    pub(crate) fn resolve(self, outcome: &ConnectOutcome) -> usize {
        self.0
            .into_iter()
            .map(|tx| tx.send(outcome.clone()).is_ok())
            .filter(|delivered| *delivered)
            .count()
    }
}
