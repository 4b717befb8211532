//! Shared FIFO of frames awaiting transmission.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::time::sleep;
use tracing::{debug, error};

use super::{FrameWriter, InboundGate, Pacing};
use crate::{
    chunk::{Frame, FrameBatch},
    error::SendError,
    metrics,
};

#[derive(Debug, Default)]
struct QueueState {
    frames: VecDeque<Frame>,
    draining: bool,
    // Bumped by `clear` so a drain loop started before the clear stops.
    generation: u64,
}

/// How a call to [`OutboundQueue::drain`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The queue emptied after writing `frames` frames.
    Drained { frames: usize },
    /// Another drain loop was already running; nothing was written.
    AlreadyDraining,
    /// The queue was cleared while draining, after `frames` frames.
    Cleared { frames: usize },
}

/// Frames waiting to be written, shared by all senders on a session.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    state: Mutex<QueueState>,
}

/// Releases the drain claim however the drain loop exits.
struct DrainClaim<'a> {
    queue: &'a OutboundQueue,
    generation: u64,
    released: bool,
}

impl Drop for DrainClaim<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let mut state = self.queue.lock();
        if state.generation == self.generation {
            state.draining = false;
        }
    }
}

impl OutboundQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append every frame of one payload.
    ///
    /// The frames are appended under a single lock so concurrent senders
    /// never interleave within a payload.
    pub fn enqueue(&self, batch: FrameBatch) {
        let mut state = self.lock();
        state.frames.extend(batch);
    }

    /// Number of frames waiting.
    #[must_use]
    pub fn len(&self) -> usize { self.lock().frames.len() }

    /// Whether no frames are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.lock().frames.is_empty() }

    /// Whether a drain loop is currently running.
    #[must_use]
    pub fn is_draining(&self) -> bool { self.lock().draining }

    /// Discard every queued frame and stop any running drain loop.
    ///
    /// This may leave the peer holding half a payload. Use it only to get
    /// back to a clean slate after something has gone wrong.
    ///
    /// Returns the number of frames discarded.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let dropped = state.frames.len();
        state.frames.clear();
        state.draining = false;
        state.generation = state.generation.wrapping_add(1);
        dropped
    }

    fn claim(&self) -> Option<DrainClaim<'_>> {
        let mut state = self.lock();
        if state.draining {
            return None;
        }
        state.draining = true;
        Some(DrainClaim {
            queue: self,
            generation: state.generation,
            released: false,
        })
    }

    /// Write queued frames until the queue is empty.
    ///
    /// Only one drain loop runs at a time; a concurrent call returns
    /// [`DrainOutcome::AlreadyDraining`] at once and the running loop picks
    /// up whatever was enqueued. While `gate` reports an inbound payload in
    /// progress no frame is dequeued, and the loop re-checks after
    /// [`Pacing::backpressure_retry`]. After each successful write the loop
    /// waits [`Pacing::inter_frame`].
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Write`] when a write fails. The failed frame is
    /// dropped, the remaining frames stay queued and the drain claim is
    /// released; nothing is retried automatically.
    pub async fn drain<W, G>(
        &self,
        writer: &W,
        gate: &G,
        pacing: Pacing,
    ) -> Result<DrainOutcome, SendError>
    where
        W: FrameWriter + ?Sized,
        G: InboundGate + ?Sized,
    {
        let Some(mut claim) = self.claim() else {
            return Ok(DrainOutcome::AlreadyDraining);
        };
        let mut written = 0usize;

        loop {
            {
                let mut state = self.lock();
                if state.generation != claim.generation {
                    return Ok(DrainOutcome::Cleared { frames: written });
                }
                if state.frames.is_empty() {
                    // Released under this lock so a racing enqueue can claim.
                    state.draining = false;
                    claim.released = true;
                    return Ok(DrainOutcome::Drained { frames: written });
                }
            }

            if gate.is_receiving() {
                debug!("inbound payload in progress; holding outbound frames");
                sleep(pacing.backpressure_retry).await;
                continue;
            }

            let frame = {
                let mut state = self.lock();
                if state.generation != claim.generation {
                    return Ok(DrainOutcome::Cleared { frames: written });
                }
                match state.frames.pop_front() {
                    Some(frame) => frame,
                    None => {
                        state.draining = false;
                        claim.released = true;
                        return Ok(DrainOutcome::Drained { frames: written });
                    }
                }
            };

            debug!(kind = %frame.kind(), bytes = frame.wire_len(), "sending frame");
            if let Err(err) = writer.write_frame(frame.to_bytes()).await {
                error!(error = %err, "frame write failed");
                metrics::inc_write_failures();
                return Err(SendError::Write(err));
            }
            metrics::inc_frames(metrics::Direction::Outbound);
            written += 1;
            sleep(pacing.inter_frame).await;
        }
    }
}
