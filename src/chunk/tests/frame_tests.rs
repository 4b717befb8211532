//! Tests for frame tags and wire parsing.

use rstest::rstest;

use crate::chunk::{Frame, FrameError, FrameKind};

#[rstest]
#[case(FrameKind::Start, b'S')]
#[case(FrameKind::Middle, b'M')]
#[case(FrameKind::End, b'E')]
#[case(FrameKind::Full, b'F')]
fn tags_map_both_ways(#[case] kind: FrameKind, #[case] tag: u8) {
    assert_eq!(kind.tag(), tag);
    assert_eq!(FrameKind::from_tag(tag), Some(kind));
}

#[test]
fn open_and_close_flags_follow_kind() {
    assert!(FrameKind::Start.opens_payload());
    assert!(FrameKind::Full.opens_payload());
    assert!(!FrameKind::Middle.opens_payload());
    assert!(FrameKind::End.closes_payload());
    assert!(FrameKind::Full.closes_payload());
    assert!(!FrameKind::Start.closes_payload());
}

#[test]
fn parse_splits_tag_from_segment() {
    let frame = Frame::parse(b"M\"ping\"").expect("valid frame");
    assert_eq!(frame.kind(), FrameKind::Middle);
    assert_eq!(frame.segment(), b"\"ping\"");
    assert_eq!(frame.wire_len(), 7);
}

#[test]
fn parse_accepts_tag_without_segment() {
    let frame = Frame::parse(b"F").expect("valid frame");
    assert_eq!(frame.kind(), FrameKind::Full);
    assert!(frame.segment().is_empty());
}

#[test]
fn parse_rejects_empty_notification() {
    assert_eq!(Frame::parse(b""), Err(FrameError::Empty));
}

#[test]
fn parse_rejects_unknown_tag() {
    assert_eq!(Frame::parse(b"X{}"), Err(FrameError::UnknownTag(b'X')));
}

#[test]
fn to_bytes_prefixes_tag() {
    let frame = Frame::new(FrameKind::Start, b"{\"c\"".to_vec());
    assert_eq!(frame.to_bytes().as_ref(), b"S{\"c\"");
    let (kind, segment) = frame.into_parts();
    assert_eq!(kind, FrameKind::Start);
    assert_eq!(segment.as_ref(), b"{\"c\"");
}
