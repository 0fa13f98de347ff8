// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::ffi::{c_char, c_void};
use std::mem::size_of;

use super::generic::TypeGenericContextDescriptorHeader;
use super::TypeContextDescriptor;
use crate::abi::flags::TypeReferenceKind;
use crate::abi::mangled::{self, MangledName};
use crate::abi::relative::RelativeDirectPointer;
use crate::bounds::StoredClassMetadataBounds;

/// Descriptor of a Swift class.
///
/// ```text
/// TypeContextDescriptor                     20 bytes
/// superclassType: rel32 (mangled name)
/// negativeSize: u32 | resilientBounds: rel32
/// positiveSize: u32 | extraFlags: u32
/// numImmediateMembers: u32
/// numFields: u32
/// fieldOffsetVectorOffset: u32
/// [generic context]                         if generic
/// [resilient superclass: rel32]             if resilient superclass
/// ```
#[repr(C)]
pub struct ClassDescriptor {
    base: TypeContextDescriptor,
    superclass_type: RelativeDirectPointer<c_char, true>,
    negative_size_or_bounds: RelativeDirectPointer<StoredClassMetadataBounds, true>,
    positive_size_or_extra_flags: u32,
    num_immediate_members: u32,
    num_fields: u32,
    field_offset_vector_offset: u32,
}

/// Trailing reference to the superclass of a class with a resilient
/// superclass. How to interpret the target depends on the class's
/// [`TypeReferenceKind`].
#[repr(C)]
pub struct ResilientSuperclass {
    superclass: RelativeDirectPointer<c_void, true>,
}

impl ResilientSuperclass {
    /// Address of the referenced descriptor, name or slot.
    pub fn address(&self) -> Option<usize> {
        self.superclass.address()
    }
}

impl ClassDescriptor {
    pub fn as_type(&self) -> &TypeContextDescriptor {
        &self.base
    }

    /// Mangled name of the formal superclass, absent for root classes.
    pub fn superclass_type_name(&self) -> Option<MangledName<'_>> {
        let ptr = self.superclass_type.as_ptr();
        if ptr.is_null() {
            return None;
        }
        // SAFETY: mangled names in an image are terminated outside any
        // symbolic reference payload.
        Some(unsafe { mangled::scan(ptr.cast()) })
    }

    pub fn has_resilient_superclass(&self) -> bool {
        self.type_flags().class_has_resilient_superclass()
    }

    pub fn are_immediate_members_negative(&self) -> bool {
        self.type_flags().class_are_immediate_members_negative()
    }

    pub fn resilient_superclass_reference_kind(&self) -> TypeReferenceKind {
        self.type_flags().class_resilient_superclass_reference_kind()
    }

    /// Negative metadata size in words. Meaningless when the class has a
    /// resilient superclass.
    pub fn metadata_negative_size_in_words(&self) -> u32 {
        self.negative_size_or_bounds.raw_offset() as u32
    }

    /// Positive metadata size in words. Meaningless when the class has a
    /// resilient superclass.
    pub fn metadata_positive_size_in_words(&self) -> u32 {
        self.positive_size_or_extra_flags
    }

    pub fn num_immediate_members(&self) -> u32 {
        self.num_immediate_members
    }

    pub fn num_fields(&self) -> u32 {
        self.num_fields
    }

    /// Field offset vector offset as stored. For classes with a resilient
    /// superclass it is relative to the start of the immediate members.
    pub fn raw_field_offset_vector_offset(&self) -> u32 {
        self.field_offset_vector_offset
    }

    /// Bounds cache of a class with a resilient superclass.
    pub fn stored_bounds(&self) -> Option<&StoredClassMetadataBounds> {
        if !self.has_resilient_superclass() {
            return None;
        }
        self.negative_size_or_bounds.get()
    }

    pub fn generic_context(&self) -> Option<&TypeGenericContextDescriptorHeader> {
        if !self.is_generic() {
            return None;
        }
        let header = self.end_address() as *const TypeGenericContextDescriptorHeader;
        // SAFETY: generic class descriptors are followed by their generic
        // context header.
        Some(unsafe { &*header })
    }

    /// Trailing superclass reference, absent when the class has no resilient
    /// superclass or when its generic context cannot be skipped.
    pub fn resilient_superclass(&self) -> Option<&ResilientSuperclass> {
        if !self.has_resilient_superclass() {
            return None;
        }
        let mut address = self.end_address();
        if let Some(generic) = self.generic_context() {
            address += generic.trailing_size()?;
        }
        // SAFETY: the resilient superclass record is the first trailing object
        // after the generic context.
        Some(unsafe { &*(address as *const ResilientSuperclass) })
    }

    fn end_address(&self) -> usize {
        self as *const Self as usize + size_of::<Self>()
    }
}

impl std::ops::Deref for ClassDescriptor {
    type Target = TypeContextDescriptor;

    fn deref(&self) -> &TypeContextDescriptor {
        &self.base
    }
}

impl std::fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &String::from_utf8_lossy(self.name()))
            .field("generic", &self.is_generic())
            .field("resilient_superclass", &self.has_resilient_superclass())
            .field("num_immediate_members", &self.num_immediate_members)
            .field("num_fields", &self.num_fields)
            .finish()
    }
}
