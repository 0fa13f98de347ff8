// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::ffi::c_void;

use super::{Metadata, MetadataRef};
use crate::config::SWIFT_TYPE_METADATA_BIT;
use crate::descriptor::ClassDescriptor;

/// Prefix shared by Swift and Objective-C class objects.
///
/// ```text
/// -2  destroy            (Swift only)
/// -1  value witnesses    (Swift only)
///  0  kind / isa         <- address point
///  1  superclass
///  2  cache[0]
///  3  cache[1]
///  4  data               bit 1 set for Swift type metadata
/// ```
#[repr(C)]
pub struct AnyClassMetadata {
    isa: usize,
    superclass: *const Metadata,
    cache: [usize; 2],
    data: usize,
}

impl AnyClassMetadata {
    /// Superclass metadata, absent for root classes.
    pub fn superclass(&self) -> Option<MetadataRef> {
        // SAFETY: class metadata links only to valid class metadata.
        unsafe { MetadataRef::from_ptr(self.superclass.cast()) }
    }

    /// False for pure Objective-C classes.
    pub fn is_type_metadata(&self) -> bool {
        self.data & SWIFT_TYPE_METADATA_BIT != 0
    }

    pub fn as_swift(&self) -> Option<&ClassMetadata> {
        if !self.is_type_metadata() {
            return None;
        }
        // SAFETY: the Swift bit guarantees the full class layout follows.
        Some(unsafe { &*(self as *const Self).cast::<ClassMetadata>() })
    }

    pub fn as_ptr(&self) -> *const c_void {
        (self as *const Self).cast()
    }
}

/// Swift class metadata, valid once [`AnyClassMetadata::is_type_metadata`]
/// holds.
#[repr(C)]
pub struct ClassMetadata {
    base: AnyClassMetadata,
    flags: u32,
    instance_address_point: u32,
    instance_size: u32,
    instance_align_mask: u16,
    reserved: u16,
    class_size: u32,
    class_address_point: u32,
    description: *const ClassDescriptor,
    ivar_destroyer: *const c_void,
}

impl ClassMetadata {
    pub fn as_any(&self) -> &AnyClassMetadata {
        &self.base
    }

    pub fn superclass(&self) -> Option<MetadataRef> {
        self.base.superclass()
    }

    /// Nominal descriptor. Absent for artificial subclasses created by the
    /// runtime, which have no declaration of their own.
    pub fn description(&self) -> Option<&'static ClassDescriptor> {
        // SAFETY: a non-null description is a descriptor in a loaded image.
        unsafe { self.description.as_ref() }
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn instance_size(&self) -> u32 {
        self.instance_size
    }

    pub fn instance_align_mask(&self) -> u16 {
        self.instance_align_mask
    }

    pub fn instance_address_point(&self) -> u32 {
        self.instance_address_point
    }

    /// Total size of the metadata object, prefix included, in bytes.
    pub fn class_size(&self) -> u32 {
        self.class_size
    }

    /// Offset of the address point within the metadata object, in bytes.
    pub fn class_address_point(&self) -> u32 {
        self.class_address_point
    }

    /// Word at `index` counted from the address point.
    ///
    /// # Safety
    ///
    /// `index` must stay within this metadata's bounds.
    pub unsafe fn word(&self, index: isize) -> usize {
        *(self as *const Self).cast::<usize>().offset(index)
    }

    /// True when `count` words starting at word `first` from the address
    /// point lie inside this metadata object.
    pub fn contains_words(&self, first: isize, count: usize) -> bool {
        let word = crate::config::WORD_SIZE as i64;
        let start = first as i64 * word;
        let end = start + count as i64 * word;
        let lowest = -i64::from(self.class_address_point);
        let highest = i64::from(self.class_size) + lowest;
        start >= lowest && end <= highest
    }

    /// Address of the word at `index` counted from the address point.
    pub fn word_address(&self, index: isize) -> usize {
        (self as *const Self as usize).wrapping_add_signed(index * crate::config::WORD_SIZE as isize)
    }

    pub fn as_ptr(&self) -> *const c_void {
        (self as *const Self).cast()
    }
}
