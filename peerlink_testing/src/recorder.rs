//! An [`EventPublisher`] that keeps everything it is given.

use std::{
    pin::pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use peerlink::{Event, EventPublisher};
use tokio::sync::Notify;

/// Records published events and lets tests wait for specific ones.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<Event>>,
    published: Notify,
}

impl EventRecorder {
    /// Create a shareable recorder.
    #[must_use]
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    fn lock(&self) -> MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every event recorded so far, in publication order.
    #[must_use]
    pub fn events(&self) -> Vec<Event> { self.lock().clone() }

    /// Names of every event recorded so far.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(|event| event.name().to_owned()).collect()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.lock().iter().filter(|&event| predicate(event)).count()
    }

    /// Wait until `count` recorded events match `predicate` and return the
    /// last of them.
    pub async fn wait_for_count(&self, count: usize, predicate: impl Fn(&Event) -> bool) -> Event {
        loop {
            let mut notified = pin!(self.published.notified());
            notified.as_mut().enable();
            if let Some(event) = self
                .lock()
                .iter()
                .filter(|&event| predicate(event))
                .nth(count.saturating_sub(1))
            {
                return event.clone();
            }
            notified.await;
        }
    }

    /// Wait for the first recorded event matching `predicate`.
    pub async fn wait_for(&self, predicate: impl Fn(&Event) -> bool) -> Event {
        self.wait_for_count(1, predicate).await
    }
}

impl EventPublisher for EventRecorder {
    fn publish(&self, event: Event) {
        self.lock().push(event);
        self.published.notify_waiters();
    }
}
