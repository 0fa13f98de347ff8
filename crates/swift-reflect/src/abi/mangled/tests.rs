// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::*;

const WORD: usize = size_of::<usize>();

#[test]
fn test_payload_len_by_marker_range() {
    assert_eq!(payload_len(0x00), 0);
    assert_eq!(payload_len(0x01), 4);
    assert_eq!(payload_len(0x17), 4);
    assert_eq!(payload_len(0x18), WORD);
    assert_eq!(payload_len(0x1F), WORD);
    assert_eq!(payload_len(0x20), 0);
    assert_eq!(payload_len(b'S'), 0);
    assert!(RELATIVE_REFERENCE_MARKERS.contains(&0x02));
    assert!(ABSOLUTE_REFERENCE_MARKERS.contains(&0x1A));
}

#[test]
fn test_plain_name() {
    assert_eq!(scan_slice(b"Si\0"), Some(2));
    assert_eq!(scan_slice(b"\0"), Some(0));
    assert_eq!(scan_slice(b"SS\0trailing"), Some(2));
}

#[test]
fn test_relative_marker_skips_zero_payload() {
    // 0x01 followed by four zero bytes, then a literal suffix.
    let bytes = [0x01, 0, 0, 0, 0, b'X', b'y', 0];
    assert_eq!(scan_slice(&bytes), Some(7));
}

#[test]
fn test_absolute_marker_skips_pointer_width() {
    let mut bytes = vec![b'y', 0x18];
    bytes.extend(std::iter::repeat(0).take(WORD));
    bytes.extend_from_slice(b"G\0");
    assert_eq!(scan_slice(&bytes), Some(2 + WORD + 1));
}

#[test]
fn test_payload_may_hold_marker_bytes() {
    // The payload of the first marker looks like another marker followed by
    // zeros; it must be skipped wholesale.
    let bytes = [0x02, 0x18, 0, 0, 0, 0];
    assert_eq!(scan_slice(&bytes), Some(5));
}

#[test]
fn test_unterminated_or_overrun_is_none() {
    assert_eq!(scan_slice(b""), None);
    assert_eq!(scan_slice(b"Si"), None);
    // Payload runs past the end of the slice.
    assert_eq!(scan_slice(&[0x01, 0, 0]), None);
    // Payload fits but the terminator is missing.
    assert_eq!(scan_slice(&[0x01, 0, 0, 0, 0]), None);
}

#[test]
fn test_raw_scan_matches_slice_scan() {
    let bytes = Box::new([b'x', 0x05, 1, 0, 0, 0, b'z', 0, b'!', 0]);
    // SAFETY: the buffer is terminated within bounds.
    let name = unsafe { scan(bytes.as_ptr()) };
    assert_eq!(name.len(), 7);
    assert_eq!(Some(name.len()), scan_slice(bytes.as_slice()));
    assert_eq!(name.as_ptr(), bytes.as_ptr());
    assert!(name.has_symbolic_references());
}

#[test]
fn test_null_base_is_empty() {
    // SAFETY: null is explicitly allowed.
    let name = unsafe { scan(std::ptr::null()) };
    assert!(name.is_empty());
    assert_eq!(name, MangledName::EMPTY);
    assert!(!name.has_symbolic_references());
}

#[test]
fn test_rescan_is_idempotent() {
    let bytes = Box::new([0x19, 0, 0, 0, 0, 0, 0, 0, 0, b'a', 0x03, 0, 0, 0, 0, 0]);
    // SAFETY: terminated within bounds on every pointer width up to 64 bits.
    let first = unsafe { scan(bytes.as_ptr()) };
    let second = unsafe { scan(bytes.as_ptr()) };
    assert_eq!(first, second);
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn test_scan_never_ends_on_marker_or_payload() {
    let mut rng = fastrand::Rng::with_seed(0x5CA7);
    for _ in 0..5_000 {
        let len = rng.usize(0..64);
        let bytes: Vec<u8> = (0..len).map(|_| rng.u8(..)).collect();
        let Some(end) = scan_slice(&bytes) else {
            continue;
        };
        assert_eq!(bytes[end], 0);

        // Replay the walk and check `end` lands on a literal position.
        let mut index = 0;
        while index < end {
            index += payload_len(bytes[index]) + 1;
        }
        assert_eq!(index, end);
    }
}

#[test]
fn test_literal_name_has_no_symbolic_references() {
    let name = MangledName::from_bytes(b"4main5PointV");
    assert!(!name.has_symbolic_references());
    assert_eq!(format!("{:?}", name), "MangledName(\"4main5PointV\")");

    let symbolic = MangledName::from_bytes(&[0x01, 0xAA, 0, 0, 0]);
    assert!(symbolic.has_symbolic_references());
    assert_eq!(format!("{:?}", symbolic), "MangledName(\"\\x01\\xaa\\x00\\x00\\x00\")");
}
