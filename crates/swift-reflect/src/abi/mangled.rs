// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length scanning for mangled names that embed symbolic references.
//!
//! A mangled type name is a NUL-terminated byte string, except that control
//! bytes introduce binary payloads which may themselves contain zero bytes:
//!
//! ```text
//! 0x01..=0x17  marker + 4-byte relative reference
//! 0x18..=0x1F  marker + pointer-sized absolute reference
//! ```
//!
//! The scanner only measures; it never decodes a reference.

use std::fmt;
use std::mem::size_of;
use std::slice;

/// Markers followed by a 32-bit relative reference.
pub const RELATIVE_REFERENCE_MARKERS: std::ops::RangeInclusive<u8> = 0x01..=0x17;

/// Markers followed by a pointer-sized absolute reference.
pub const ABSOLUTE_REFERENCE_MARKERS: std::ops::RangeInclusive<u8> = 0x18..=0x1F;

/// Payload bytes that follow `byte` when it is a symbolic reference marker.
#[inline]
pub const fn payload_len(byte: u8) -> usize {
    match byte {
        0x01..=0x17 => size_of::<u32>(),
        0x18..=0x1F => size_of::<usize>(),
        _ => 0,
    }
}

/// Walk bytes produced by `byte_at` until the terminating zero.
///
/// `byte_at` returns `None` past the end of readable memory, which makes the
/// whole scan `None`.
#[inline]
fn scan_with(mut byte_at: impl FnMut(usize) -> Option<u8>) -> Option<usize> {
    let mut end = 0;
    loop {
        let byte = byte_at(end)?;
        if byte == 0 {
            return Some(end);
        }
        let skip = payload_len(byte);
        if skip > 0 {
            // The last payload byte must exist for the name to be well formed.
            byte_at(end + skip)?;
        }
        end += skip + 1;
    }
}

/// Length of the mangled name at the start of `bytes`, excluding the
/// terminator. `None` when no terminator is found inside the slice.
pub fn scan_slice(bytes: &[u8]) -> Option<usize> {
    scan_with(|index| bytes.get(index).copied())
}

/// Measure the mangled name starting at `base`.
///
/// A null `base` yields an empty name.
///
/// # Safety
///
/// `base` must be null or point to a mangled name terminated by a zero byte
/// outside any symbolic-reference payload, readable for `'a`.
pub unsafe fn scan<'a>(base: *const u8) -> MangledName<'a> {
    if base.is_null() {
        return MangledName::EMPTY;
    }
    // The closure never reports end-of-memory: termination is the caller's
    // contract.
    let len = scan_with(|index| Some(*base.add(index))).unwrap_or(0);
    MangledName {
        bytes: slice::from_raw_parts(base, len),
    }
}

/// A mangled name borrowed in place.
///
/// The bytes stay at their original address: symbolic references are
/// relative to their own position, so a copy would not resolve.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MangledName<'a> {
    bytes: &'a [u8],
}

impl MangledName<'static> {
    pub const EMPTY: Self = Self { bytes: &[] };
}

impl<'a> MangledName<'a> {
    /// Wrap an already-measured name.
    pub const fn from_bytes(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub const fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when at least one symbolic reference marker is embedded.
    pub fn has_symbolic_references(&self) -> bool {
        // Payload bytes only ever follow a marker, so the first byte in a
        // marker range is a real marker.
        self.bytes.iter().any(|&byte| payload_len(byte) > 0)
    }
}

impl fmt::Debug for MangledName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MangledName(\"{}\")", self.bytes.escape_ascii())
    }
}

#[cfg(test)]
mod tests;
