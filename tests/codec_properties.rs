//! Generated checks for the frame chunker and reassembly buffer.

mod common;

use std::num::NonZeroUsize;

use common::deterministic_runner;
use peerlink::{Chunker, FrameKind, ReassemblyBuffer};
use proptest::{
    collection::vec,
    prelude::{Just, Strategy, any},
    prop_assert,
    prop_assert_eq,
};
use rstest::rstest;

fn payload_and_chunk_size() -> impl Strategy<Value = (Vec<u8>, usize)> {
    (1usize..=64).prop_flat_map(|chunk_size| (vec(any::<u8>(), 0..=chunk_size * 8), Just(chunk_size)))
}

fn chunker(chunk_size: usize) -> Chunker {
    Chunker::new(NonZeroUsize::new(chunk_size).expect("strategy yields non-zero sizes"))
}

#[rstest]
#[case(256)]
#[case(64)]
fn generated_payloads_round_trip(#[case] cases: u32) {
    let mut runner = deterministic_runner(cases);
    runner
        .run(&payload_and_chunk_size(), |(payload, chunk_size)| {
            let mut buffer = ReassemblyBuffer::new();
            let mut completed = Vec::new();
            for frame in chunker(chunk_size).encode(&payload) {
                completed.extend(buffer.push(frame));
            }

            prop_assert_eq!(completed.len(), 1);
            prop_assert_eq!(&completed[0][..], &payload[..]);
            prop_assert!(buffer.is_empty());
            Ok(())
        })
        .expect("generated payloads should round-trip");
}

#[test]
fn frame_shape_follows_payload_length() {
    let mut runner = deterministic_runner(256);
    runner
        .run(&payload_and_chunk_size(), |(payload, chunk_size)| {
            let batch = chunker(chunk_size).encode(&payload);
            let kinds: Vec<_> = batch.frames().iter().map(|frame| frame.kind()).collect();

            if payload.len() <= chunk_size {
                prop_assert_eq!(kinds, vec![FrameKind::Full]);
            } else {
                let middles = (payload.len() - chunk_size).div_ceil(chunk_size) - 1;
                prop_assert_eq!(kinds.first(), Some(&FrameKind::Start));
                prop_assert_eq!(kinds.last(), Some(&FrameKind::End));
                prop_assert_eq!(kinds.len(), middles + 2);
                prop_assert!(kinds[1..kinds.len() - 1].iter().all(|k| *k == FrameKind::Middle));
            }
            prop_assert!(batch.frames().iter().all(|f| f.segment().len() <= chunk_size));
            Ok(())
        })
        .expect("frame shape should match the chunking rule");
}

#[test]
fn arbitrary_notifications_never_panic() {
    let mut runner = deterministic_runner(512);
    runner
        .run(&vec(vec(any::<u8>(), 0..24), 0..32), |notifications| {
            let mut buffer = ReassemblyBuffer::new();
            for raw in &notifications {
                let before = buffer.len();
                if buffer.push_raw(raw).is_err() {
                    prop_assert_eq!(buffer.len(), before);
                }
            }
            Ok(())
        })
        .expect("arbitrary input must be handled");
}

#[rstest]
#[case(0)]
#[case(19)]
#[case(20)]
#[case(19 * 40)]
fn boundary_lengths_round_trip(#[case] len: usize) {
    let payload: Vec<u8> = (0..len).map(|i| i.to_le_bytes()[0]).collect();
    let mut buffer = ReassemblyBuffer::new();
    let completed: Vec<_> = Chunker::default()
        .encode(&payload)
        .into_iter()
        .filter_map(|frame| buffer.push(frame))
        .collect();

    assert_eq!(completed.len(), 1);
    assert_eq!(&completed[0][..], &payload[..]);
}
