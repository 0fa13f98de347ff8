// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use swift_reflect::abi::mangled::{payload_len, scan_slice};

fuzz_target!(|data: &[u8]| {
    let Some(len) = scan_slice(data) else {
        return;
    };
    assert!(len < data.len());
    assert_eq!(data[len], 0);

    // Rescanning the accepted prefix plus its terminator is stable.
    assert_eq!(scan_slice(&data[..=len]), Some(len));

    // Every zero before the terminator sits inside a reference payload.
    let mut i = 0;
    while i < len {
        assert_ne!(data[i], 0);
        i += 1 + payload_len(data[i]);
    }
    assert_eq!(i, len);
});
