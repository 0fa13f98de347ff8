// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Self-relative 32-bit pointers.
//!
//! Compiler-emitted metadata is position independent: instead of absolute
//! addresses, records store a signed 32-bit byte offset measured from the
//! address of the offset field itself.
//!
//! # Encoding
//!
//! ```text
//! direct:        target = &field + sign_extend(offset)
//! indirectable:  target = &field + sign_extend(offset & !1)
//!                if offset & 1: target = *(target as *const usize)
//! nullable:      offset == 0 -> absent
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::ptr;

/// Add a sign-extended 32-bit offset to `base`.
#[inline]
pub const fn apply_offset(base: usize, offset: i32) -> usize {
    base.wrapping_add(offset as isize as usize)
}

/// Offset that, stored at `base`, points to `target`.
///
/// Returns `None` when the two addresses are too far apart for 32 bits.
#[inline]
pub fn measure_offset(target: usize, base: usize) -> Option<i32> {
    i32::try_from(target.wrapping_sub(base) as isize).ok()
}

/// Resolve a relative offset stored at `base`.
///
/// A nullable offset of 0 is absent. An indirect target is loaded once more
/// and the loaded word is returned as-is (a null slot yields `Some(0)`).
///
/// # Safety
///
/// When `indirect` is set, `base + offset` must be readable as one
/// pointer-sized word for the duration of the call.
#[inline]
pub unsafe fn resolve(base: usize, offset: i32, indirect: bool, nullable: bool) -> Option<usize> {
    if nullable && offset == 0 {
        return None;
    }
    let target = apply_offset(base, offset);
    if !indirect {
        return Some(target);
    }
    Some(ptr::read_unaligned(target as *const usize))
}

/// Direct relative pointer to a `T`.
///
/// Only ever observed in place, inside metadata images; there is no public
/// constructor, so every instance sits at the address its offset is measured
/// from.
#[repr(transparent)]
pub struct RelativeDirectPointer<T, const NULLABLE: bool = true> {
    offset: i32,
    _target: PhantomData<fn() -> *const T>,
}

impl<T, const NULLABLE: bool> RelativeDirectPointer<T, NULLABLE> {
    /// Stored offset, exactly as emitted.
    #[inline]
    pub const fn raw_offset(&self) -> i32 {
        self.offset
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.offset == 0
    }

    /// Absolute target address, `None` when nullable and unset.
    #[inline]
    pub fn address(&self) -> Option<usize> {
        if NULLABLE && self.offset == 0 {
            return None;
        }
        Some(apply_offset(self.self_address(), self.offset))
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.address().map_or(ptr::null(), |addr| addr as *const T)
    }

    /// Borrow the target for as long as the pointer itself is borrowed.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: relative pointers only exist inside metadata images, which
        // are immutable and outlive any borrow of their fields. A valid image
        // never holds a dangling offset.
        unsafe { self.as_ptr().as_ref() }
    }

    #[inline]
    fn self_address(&self) -> usize {
        ptr::from_ref(self) as usize
    }
}

impl<T, const NULLABLE: bool> fmt::Debug for RelativeDirectPointer<T, NULLABLE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelativeDirectPointer")
            .field("offset", &self.offset)
            .field("target", &self.address())
            .finish()
    }
}

/// Relative pointer whose low bit selects one extra level of indirection.
///
/// Used where the target may live in another image and is reached through a
/// GOT-like slot.
#[repr(transparent)]
pub struct RelativeIndirectablePointer<T, const NULLABLE: bool = true> {
    offset_plus_indirect: i32,
    _target: PhantomData<fn() -> *const T>,
}

impl<T, const NULLABLE: bool> RelativeIndirectablePointer<T, NULLABLE> {
    #[inline]
    pub const fn raw_offset(&self) -> i32 {
        self.offset_plus_indirect
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.offset_plus_indirect == 0
    }

    #[inline]
    pub const fn is_indirect(&self) -> bool {
        self.offset_plus_indirect & 1 != 0
    }

    /// Absolute target address. A null indirection slot is reported as absent.
    pub fn address(&self) -> Option<usize> {
        let base = ptr::from_ref(self) as usize;
        // SAFETY: the indirection slot is part of the same metadata image as
        // this pointer and is pointer-sized by construction.
        let resolved = unsafe {
            resolve(
                base,
                self.offset_plus_indirect & !1,
                self.is_indirect(),
                NULLABLE,
            )
        }?;
        (resolved != 0).then_some(resolved)
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.address().map_or(ptr::null(), |addr| addr as *const T)
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: see `RelativeDirectPointer::get`.
        unsafe { self.as_ptr().as_ref() }
    }
}

impl<T, const NULLABLE: bool> fmt::Debug for RelativeIndirectablePointer<T, NULLABLE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelativeIndirectablePointer")
            .field("offset", &(self.offset_plus_indirect & !1))
            .field("indirect", &self.is_indirect())
            .finish()
    }
}

#[cfg(test)]
mod tests;
