//! Notification pump feeding the reassembly buffer.

use std::sync::Arc;

use log::warn;
use tracing::debug;

use super::Shared;
use crate::{
    event::Event,
    message::EventMessage,
    metrics,
    transport::{Address, Notifications},
};

/// Forward every notification from `peer` until the stream ends or the
/// session shuts down.
pub(super) async fn pump(shared: Arc<Shared>, peer: Address, mut notifications: Notifications) {
    loop {
        let raw = tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => break,
            raw = notifications.recv() => match raw {
                Some(raw) => raw,
                None => break,
            },
        };
        shared.dispatch(&raw);
    }
    debug!(%peer, "notification stream ended");
}

impl Shared {
    /// Decode one raw notification, publishing any completed event.
    ///
    /// Undecodable frames and malformed payloads are logged and dropped.
    pub(super) fn dispatch(&self, raw: &[u8]) {
        metrics::inc_frames(metrics::Direction::Inbound);
        let completed = self.inbound_buffer().push_raw(raw);

        let payload = match completed {
            Ok(Some(payload)) => payload,
            Ok(None) => return,
            Err(err) => {
                warn!("dropping undecodable frame: {err}");
                metrics::inc_malformed();
                return;
            }
        };

        match EventMessage::from_slice(&payload) {
            Ok(EventMessage { name, args }) => {
                debug!(event = %name, bytes = payload.len(), "received event");
                self.publisher.publish(Event::Message { name, data: args });
            }
            Err(err) => {
                warn!(
                    "dropping malformed payload ({} bytes): {err}",
                    payload.len()
                );
                metrics::inc_malformed();
            }
        }
    }
}
