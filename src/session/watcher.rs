//! Reacts to asynchronous link status reported by the adapter.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};

use super::Shared;
use crate::transport::LinkEvent;

/// Follow `events` until the adapter closes the stream or the session shuts
/// down.
pub(super) async fn watch(shared: Arc<Shared>, mut events: broadcast::Receiver<LinkEvent>) {
    loop {
        let event = tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => break,
            event = events.recv() => event,
        };
        match event {
            Ok(LinkEvent::Disconnected { address }) => shared.on_disconnected(address),
            Ok(LinkEvent::Connected { address }) => trace!(%address, "link up"),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "link watcher lagged; link events lost");
            }
            Err(RecvError::Closed) => break,
        }
    }
    trace!("link watcher stopped");
}
