// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use swift_reflect::metadata::TupleLabels;

fuzz_target!(|data: &[u8]| {
    let mut consumed = 0;
    for label in TupleLabels::new(data).take(data.len() + 2) {
        assert!(!label.contains(&b' '));
        assert!(!label.contains(&0));
        consumed += label.len();
    }
    assert!(consumed <= data.len());
});
