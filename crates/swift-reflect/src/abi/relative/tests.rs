// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//! Tests for relative pointer resolution.

use super::*;

const WORD: i32 = std::mem::size_of::<usize>() as i32;

#[repr(C)]
struct DirectFixture {
    target: u64,
    pointer: RelativeDirectPointer<u64, true>,
    strict: RelativeDirectPointer<u32, false>,
}

#[repr(C)]
struct IndirectFixture {
    slot: usize,
    pointer: RelativeIndirectablePointer<u64, true>,
}

fn direct(offset: i32) -> RelativeDirectPointer<u64, true> {
    RelativeDirectPointer {
        offset,
        _target: PhantomData,
    }
}

#[test]
fn test_nullable_zero_offset_is_absent() {
    // SAFETY: direct resolution performs no memory access.
    assert_eq!(unsafe { resolve(0x1000, 0, false, true) }, None);
    assert_eq!(unsafe { resolve(0x1000, 0, true, true) }, None);
}

#[test]
fn test_non_nullable_zero_offset_points_at_itself() {
    // SAFETY: direct resolution performs no memory access.
    assert_eq!(unsafe { resolve(0x1000, 0, false, false) }, Some(0x1000));
}

#[test]
fn test_offset_is_sign_extended() {
    assert_eq!(apply_offset(0x1000, 0x10), 0x1010);
    assert_eq!(apply_offset(0x1000, -0x10), 0x0ff0);
    assert_eq!(apply_offset(0x1000, i32::MIN), 0x1000_usize.wrapping_sub(0x8000_0000));
}

#[test]
fn test_measure_offset_rejects_distant_targets() {
    assert_eq!(measure_offset(0x1010, 0x1000), Some(0x10));
    assert_eq!(measure_offset(0x0ff0, 0x1000), Some(-0x10));
    if cfg!(target_pointer_width = "64") {
        assert_eq!(measure_offset(i32::MAX as usize + 1, 0), None);
    }
}

#[test]
fn test_resolve_matches_address_plus_offset() {
    let mut rng = fastrand::Rng::with_seed(0x5EED);
    for _ in 0..10_000 {
        let base = rng.usize(0x1000..usize::MAX / 2);
        let offset = rng.i32(..);
        // SAFETY: direct resolution performs no memory access.
        let resolved = unsafe { resolve(base, offset, false, false) };
        assert_eq!(resolved, Some(base.wrapping_add(offset as isize as usize)));
        if let Some(target) = resolved {
            assert_eq!(measure_offset(target, base), Some(offset));
        }
    }
}

#[test]
fn test_direct_pointer_reaches_neighbouring_field() {
    let fixture = Box::new(DirectFixture {
        target: 0xDEAD_BEEF,
        pointer: direct(-8),
        strict: RelativeDirectPointer {
            offset: -12,
            _target: PhantomData,
        },
    });

    assert_eq!(fixture.pointer.get().copied(), Some(0xDEAD_BEEF));
    assert_eq!(
        fixture.pointer.address(),
        Some(ptr::from_ref(&fixture.target) as usize)
    );
    assert_eq!(
        fixture.strict.address(),
        Some(ptr::from_ref(&fixture.target) as usize)
    );
}

#[test]
fn test_null_direct_pointer() {
    let fixture = Box::new(DirectFixture {
        target: 1,
        pointer: direct(0),
        strict: RelativeDirectPointer {
            offset: 0,
            _target: PhantomData,
        },
    });

    assert!(fixture.pointer.is_null());
    assert!(fixture.pointer.get().is_none());
    assert!(fixture.pointer.as_ptr().is_null());
    // Non-nullable pointers never report absence.
    assert_eq!(
        fixture.strict.address(),
        Some(ptr::from_ref(&fixture.strict) as usize)
    );
}

#[test]
fn test_indirect_pointer_loads_slot() {
    let value = Box::new(42_u64);
    let fixture = Box::new(IndirectFixture {
        slot: ptr::from_ref(value.as_ref()) as usize,
        pointer: RelativeIndirectablePointer {
            offset_plus_indirect: -WORD | 1,
            _target: PhantomData,
        },
    });

    assert!(fixture.pointer.is_indirect());
    assert_eq!(fixture.pointer.get().copied(), Some(42));

    // SAFETY: the slot field is a live, pointer-sized word.
    let raw = unsafe {
        resolve(
            ptr::from_ref(&fixture.pointer) as usize,
            -WORD,
            true,
            true,
        )
    };
    assert_eq!(raw, Some(fixture.slot));
}

#[test]
fn test_indirect_pointer_with_null_slot_is_absent() {
    let fixture = Box::new(IndirectFixture {
        slot: 0,
        pointer: RelativeIndirectablePointer {
            offset_plus_indirect: -WORD | 1,
            _target: PhantomData,
        },
    });

    assert!(fixture.pointer.get().is_none());
}
