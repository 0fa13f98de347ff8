// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory metadata images.
//!
//! [`MetadataImage`] lays out descriptors and metadata byte-for-byte the way
//! the compiler and runtime do, in a zeroed arena that is leaked on purpose:
//! real metadata lives as long as the process, and every
//! [`MetadataRef`](crate::MetadataRef) handed out by the builders relies on that.
//!
//! Used by the test suites, benchmarks and fuzz targets, and by tooling that
//! wants to exercise reflection without a Swift runtime.
//!
//! ```
//! use swift_reflect::image::MetadataImage;
//! use swift_reflect::{FieldEnumerator, TypeTable};
//!
//! # fn main() -> Result<(), swift_reflect::ImageError> {
//! let mut image = MetadataImage::new();
//! let int = image.struct_type("Int").build()?;
//! let point = image
//!     .struct_type("Point")
//!     .field("x", b"Si", 0)
//!     .field("y", b"Si", 8)
//!     .build()?;
//!
//! let types = TypeTable::new().with(&b"Si"[..], int.metadata);
//! let fields = FieldEnumerator::new(&types).fields(point.metadata).unwrap_or_default();
//! assert_eq!(fields.len(), 2);
//! # Ok(())
//! # }
//! ```

mod types;

pub use types::{
    ClassBuilder, ClassType, FieldSpec, Parent, StructBuilder, StructType, SuperclassRef,
    TupleElementSpec,
};

use std::mem::size_of;
use std::ptr::NonNull;

use crate::abi::relative::measure_offset;
use crate::error::ImageError;

/// Leaked, zeroed, 8-byte aligned arena holding synthesized metadata.
///
/// Records are written once and only then handed out, so the raw writing
/// primitives stay crate-private.
pub struct MetadataImage {
    base: NonNull<u8>,
    capacity: usize,
    used: usize,
}

impl MetadataImage {
    pub const DEFAULT_CAPACITY: usize = 64 * 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(bytes: usize) -> Self {
        let words = bytes.div_ceil(size_of::<u64>()).max(1);
        let arena: &'static mut [u64] = Box::leak(vec![0_u64; words].into_boxed_slice());
        let capacity = arena.len() * size_of::<u64>();
        Self {
            base: NonNull::from(arena).cast::<u8>(),
            capacity,
            used: 0,
        }
    }

    pub fn base_address(&self) -> usize {
        self.base.as_ptr() as usize
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn contains(&self, address: usize, len: usize) -> bool {
        let base = self.base_address();
        address >= base
            && address
                .checked_add(len)
                .is_some_and(|end| end <= base + self.capacity)
    }

    /// Reserve `size` zeroed bytes aligned to `align` (at most 8).
    pub(crate) fn alloc(&mut self, size: usize, align: usize) -> Result<usize, ImageError> {
        debug_assert!(align.is_power_of_two() && align <= size_of::<u64>());
        let start = (self.used + align - 1) & !(align - 1);
        let end = start
            .checked_add(size)
            .filter(|&end| end <= self.capacity)
            .ok_or(ImageError::Allocation { bytes: size })?;
        self.used = end;
        Ok(self.base_address() + start)
    }

    fn write<T: Copy>(&mut self, address: usize, value: T) -> Result<(), ImageError> {
        if !self.contains(address, size_of::<T>()) {
            return Err(ImageError::OutOfBounds { address });
        }
        let offset = address - self.base_address();
        // SAFETY: the range was checked to lie inside the arena, and nothing
        // hands out references into it before a record is complete.
        unsafe {
            self.base
                .as_ptr()
                .add(offset)
                .cast::<T>()
                .write_unaligned(value);
        }
        Ok(())
    }

    pub(crate) fn put_u8(&mut self, address: usize, value: u8) -> Result<(), ImageError> {
        self.write(address, value)
    }

    pub(crate) fn put_u16(&mut self, address: usize, value: u16) -> Result<(), ImageError> {
        self.write(address, value)
    }

    pub(crate) fn put_u32(&mut self, address: usize, value: u32) -> Result<(), ImageError> {
        self.write(address, value)
    }

    pub(crate) fn put_i32(&mut self, address: usize, value: i32) -> Result<(), ImageError> {
        self.write(address, value)
    }

    pub(crate) fn put_usize(&mut self, address: usize, value: usize) -> Result<(), ImageError> {
        self.write(address, value)
    }

    pub(crate) fn put_bytes(&mut self, address: usize, bytes: &[u8]) -> Result<(), ImageError> {
        for (index, &byte) in bytes.iter().enumerate() {
            self.write(address + index, byte)?;
        }
        Ok(())
    }

    /// Store at `at` a relative offset to `target`; `None` stores the null
    /// offset.
    pub(crate) fn put_relative(&mut self, at: usize, target: Option<usize>) -> Result<(), ImageError> {
        let offset = match target {
            Some(to) => measure_offset(to, at).ok_or(ImageError::OffsetOutOfRange { from: at, to })?,
            None => 0,
        };
        self.put_i32(at, offset)
    }

    /// Store at `at` an indirect relative offset to the pointer-sized `slot`.
    pub(crate) fn put_indirect_relative(&mut self, at: usize, slot: usize) -> Result<(), ImageError> {
        let offset = measure_offset(slot, at).ok_or(ImageError::OffsetOutOfRange { from: at, to: slot })?;
        self.put_i32(at, offset | 1)
    }

    /// Copy raw bytes plus a terminating zero. Embedded zeros are kept, as
    /// symbolic reference payloads need them.
    pub(crate) fn bytes(&mut self, bytes: &[u8]) -> Result<usize, ImageError> {
        let address = self.alloc(bytes.len() + 1, 1)?;
        self.put_bytes(address, bytes)?;
        Ok(address)
    }

    /// Copy a NUL-terminated string.
    pub(crate) fn c_string(&mut self, s: &str) -> Result<usize, ImageError> {
        if s.as_bytes().contains(&0) {
            return Err(ImageError::InteriorNul(s.to_owned()));
        }
        self.bytes(s.as_bytes())
    }

    /// A pointer-sized slot holding `value`.
    pub(crate) fn slot(&mut self, value: usize) -> Result<usize, ImageError> {
        let address = self.alloc(size_of::<usize>(), size_of::<usize>())?;
        self.put_usize(address, value)?;
        Ok(address)
    }

    /// View a finished record.
    ///
    /// # Safety
    ///
    /// `address` must hold a complete, suitably aligned `T` inside this image,
    /// and must not be written through the builder afterwards.
    pub(crate) unsafe fn view<T>(&self, address: usize) -> &'static T {
        debug_assert!(self.contains(address, size_of::<T>()));
        &*(address as *const T)
    }
}

impl Default for MetadataImage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetadataImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataImage")
            .field("base", &format_args!("{:#x}", self.base_address()))
            .field("used", &self.used)
            .field("capacity", &self.capacity)
            .finish()
    }
}
