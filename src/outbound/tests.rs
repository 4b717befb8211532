//! Tests for the outbound queue drain loop.

use std::{
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use rstest::{fixture, rstest};
use tokio::time::{Instant, sleep};

use super::{DrainOutcome, FrameWriter, InboundGate, OutboundQueue, Pacing};
use crate::{chunk::Chunker, error::SendError, transport::TransportError};

#[derive(Default)]
struct RecordingWriter {
    written: Mutex<Vec<Bytes>>,
    fail_at: Option<usize>,
    calls: AtomicUsize,
}

impl RecordingWriter {
    fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    fn written(&self) -> Vec<Bytes> { self.written.lock().expect("writer lock").clone() }
}

#[async_trait]
impl FrameWriter for RecordingWriter {
    async fn write_frame(&self, frame: Bytes) -> Result<(), TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(call) {
            return Err(TransportError::failed("write", "link busy"));
        }
        self.written.lock().expect("writer lock").push(frame);
        Ok(())
    }
}

#[derive(Default)]
struct FlagGate(AtomicBool);

impl InboundGate for FlagGate {
    fn is_receiving(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
fn queue() -> OutboundQueue { OutboundQueue::new() }

fn enqueue_text(queue: &OutboundQueue, text: &str) {
    queue.enqueue(Chunker::default().encode(text.as_bytes()));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn drain_writes_frames_in_order(queue: OutboundQueue) {
    enqueue_text(&queue, r#"{"c":"ping","a":{"n":1}}"#);
    let writer = RecordingWriter::default();

    let outcome = queue
        .drain(&writer, &FlagGate::default(), Pacing::default())
        .await
        .expect("drain succeeds");

    assert_eq!(outcome, DrainOutcome::Drained { frames: 2 });
    let written = writer.written();
    assert_eq!(written[0].as_ref(), br#"S{"c":"ping","a":{"n"#);
    assert_eq!(written[1].as_ref(), br#"E":1}}"#);
    assert!(queue.is_empty());
    assert!(!queue.is_draining());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn drain_waits_between_frames(queue: OutboundQueue) {
    enqueue_text(&queue, &"x".repeat(19 * 3));
    let writer = RecordingWriter::default();
    let started = Instant::now();

    queue
        .drain(&writer, &FlagGate::default(), Pacing::default())
        .await
        .expect("drain succeeds");

    assert_eq!(writer.written().len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn drain_holds_back_while_inbound_payload_in_progress(queue: OutboundQueue) {
    enqueue_text(&queue, r#"{"c":"hello"}"#);
    let queue = Arc::new(queue);
    let writer = Arc::new(RecordingWriter::default());
    let gate = Arc::new(FlagGate(AtomicBool::new(true)));

    let task = {
        let (queue, writer, gate) = (queue.clone(), writer.clone(), gate.clone());
        tokio::spawn(async move { queue.drain(&*writer, &*gate, Pacing::default()).await })
    };

    sleep(Duration::from_secs(2)).await;
    assert!(writer.written().is_empty(), "no write while receiving");
    assert_eq!(queue.len(), 1);

    gate.0.store(false, Ordering::SeqCst);
    let outcome = task.await.expect("join").expect("drain succeeds");
    assert_eq!(outcome, DrainOutcome::Drained { frames: 1 });
    assert_eq!(writer.written().len(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn second_drain_defers_to_running_loop(queue: OutboundQueue) {
    enqueue_text(&queue, &"y".repeat(40));
    let queue = Arc::new(queue);
    let writer = Arc::new(RecordingWriter::default());

    let first = {
        let (queue, writer) = (queue.clone(), writer.clone());
        tokio::spawn(async move {
            queue
                .drain(&*writer, &FlagGate::default(), Pacing::default())
                .await
        })
    };
    tokio::task::yield_now().await;
    assert!(queue.is_draining());

    enqueue_text(&queue, r#"{"c":"late"}"#);
    let second = queue
        .drain(&*writer, &FlagGate::default(), Pacing::default())
        .await
        .expect("second drain returns");
    assert_eq!(second, DrainOutcome::AlreadyDraining);

    let first = first.await.expect("join").expect("drain succeeds");
    assert_eq!(first, DrainOutcome::Drained { frames: 4 });
    let last = writer.written().pop().expect("frames written");
    assert_eq!(last.as_ref(), br#"F{"c":"late"}"#);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn write_failure_stops_drain_and_keeps_remaining_frames(queue: OutboundQueue) {
    enqueue_text(&queue, &"z".repeat(19 * 3));
    let writer = RecordingWriter::failing_at(1);

    let err = queue
        .drain(&writer, &FlagGate::default(), Pacing::default())
        .await
        .expect_err("second write fails");

    assert!(matches!(err, SendError::Write(TransportError::Failed { .. })));
    assert_eq!(writer.written().len(), 1);
    assert_eq!(queue.len(), 1, "frames after the failed one stay queued");
    assert!(!queue.is_draining(), "claim released after failure");
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn clear_stops_running_drain(queue: OutboundQueue) {
    enqueue_text(&queue, &"q".repeat(19 * 5));
    let queue = Arc::new(queue);
    let writer = Arc::new(RecordingWriter::default());

    let task = {
        let (queue, writer) = (queue.clone(), writer.clone());
        tokio::spawn(async move {
            queue
                .drain(&*writer, &FlagGate::default(), Pacing::default())
                .await
        })
    };
    sleep(Duration::from_millis(60)).await;

    let dropped = queue.clear();
    assert!(dropped > 0);
    assert!(!queue.is_draining());

    let outcome = task.await.expect("join").expect("drain returns");
    assert!(matches!(outcome, DrainOutcome::Cleared { .. }));
    assert!(writer.written().len() < 5);
}
