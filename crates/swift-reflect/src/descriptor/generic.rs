// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic context trailing a generic type descriptor.
//!
//! ```text
//! TypeGenericContextDescriptorHeader   16 bytes
//! GenericParamDescriptor[numParams]    1 byte each, padded to 4
//! GenericRequirement[numRequirements]  12 bytes each
//! GenericPackShapeHeader               4 bytes      (if has type packs)
//! GenericPackShapeDescriptor[numPacks] 8 bytes each (if has type packs)
//! [conditional invertible protocols]   (if has conditional inverted protocols)
//! GenericValueHeader                   4 bytes      (if has values)
//! GenericValueDescriptor[numValues]    4 bytes each (if has values)
//! ```

use std::ffi::c_void;
use std::mem::size_of;
use std::slice;

use crate::abi::relative::RelativeDirectPointer;

pub(crate) const GENERIC_REQUIREMENT_SIZE: usize = 12;
pub(crate) const PACK_SHAPE_HEADER_SIZE: usize = 4;
pub(crate) const PACK_SHAPE_DESCRIPTOR_SIZE: usize = 8;
pub(crate) const VALUE_HEADER_SIZE: usize = 4;
pub(crate) const VALUE_DESCRIPTOR_SIZE: usize = 4;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GenericContextDescriptorHeader {
    pub num_params: u16,
    pub num_requirements: u16,
    pub num_key_arguments: u16,
    pub flags: u16,
}

impl GenericContextDescriptorHeader {
    const HAS_TYPE_PACKS: u16 = 0x1;
    const HAS_CONDITIONAL_INVERTED_PROTOCOLS: u16 = 0x2;
    const HAS_VALUES: u16 = 0x4;

    pub(crate) const fn flags_for(type_packs: bool, values: bool) -> u16 {
        let mut flags = 0;
        if type_packs {
            flags |= Self::HAS_TYPE_PACKS;
        }
        if values {
            flags |= Self::HAS_VALUES;
        }
        flags
    }

    pub fn has_type_packs(&self) -> bool {
        self.flags & Self::HAS_TYPE_PACKS != 0
    }

    pub fn has_conditional_inverted_protocols(&self) -> bool {
        self.flags & Self::HAS_CONDITIONAL_INVERTED_PROTOCOLS != 0
    }

    pub fn has_values(&self) -> bool {
        self.flags & Self::HAS_VALUES != 0
    }
}

#[repr(C)]
pub struct TypeGenericContextDescriptorHeader {
    instantiation_cache: RelativeDirectPointer<c_void, true>,
    default_instantiation_pattern: RelativeDirectPointer<c_void, true>,
    base: GenericContextDescriptorHeader,
}

impl TypeGenericContextDescriptorHeader {
    pub fn header(&self) -> &GenericContextDescriptorHeader {
        &self.base
    }

    /// Generic parameter descriptors, one byte each.
    pub fn params(&self) -> &[GenericParamDescriptor] {
        let start = (self as *const Self).wrapping_add(1).cast::<GenericParamDescriptor>();
        // SAFETY: the parameter bytes immediately follow the header in the
        // same image.
        unsafe { slice::from_raw_parts(start, usize::from(self.base.num_params)) }
    }

    /// Bytes from the start of this header to whatever trails the generic
    /// context.
    ///
    /// `None` when the context carries conditional invertible protocol
    /// records, whose variable layout is not decoded.
    pub(crate) fn trailing_size(&self) -> Option<usize> {
        if self.base.has_conditional_inverted_protocols() {
            return None;
        }
        let mut size = size_of::<Self>();
        size += align4(usize::from(self.base.num_params));
        size += usize::from(self.base.num_requirements) * GENERIC_REQUIREMENT_SIZE;
        if self.base.has_type_packs() {
            // SAFETY: the pack header follows the requirements when the flag
            // is set.
            let num_packs = unsafe { self.read_at::<u16>(size) };
            size += PACK_SHAPE_HEADER_SIZE + usize::from(num_packs) * PACK_SHAPE_DESCRIPTOR_SIZE;
        }
        if self.base.has_values() {
            // SAFETY: the value header follows the pack shapes when the flag
            // is set.
            let num_values = unsafe { self.read_at::<u32>(size) };
            size += VALUE_HEADER_SIZE + num_values as usize * VALUE_DESCRIPTOR_SIZE;
        }
        Some(size)
    }

    /// # Safety
    ///
    /// `offset` bytes past this header must hold a readable `T`.
    unsafe fn read_at<T: Copy>(&self, offset: usize) -> T {
        std::ptr::read_unaligned((self as *const Self).cast::<u8>().add(offset).cast::<T>())
    }
}

pub(crate) const fn align4(n: usize) -> usize {
    (n + 3) & !3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericParamKind {
    Type,
    TypePack,
    Value,
    Unknown(u8),
}

#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GenericParamDescriptor(u8);

impl GenericParamDescriptor {
    const KIND_MASK: u8 = 0x3F;
    const HAS_KEY_ARGUMENT: u8 = 0x80;

    /// A key type parameter, the common case.
    pub const KEY_TYPE: Self = Self(Self::HAS_KEY_ARGUMENT);

    /// A key value parameter, as in `<let N: Int>`.
    pub const KEY_VALUE: Self = Self(Self::HAS_KEY_ARGUMENT | 2);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn has_key_argument(self) -> bool {
        self.0 & Self::HAS_KEY_ARGUMENT != 0
    }

    pub const fn kind(self) -> GenericParamKind {
        match self.0 & Self::KIND_MASK {
            0 => GenericParamKind::Type,
            1 => GenericParamKind::TypePack,
            2 => GenericParamKind::Value,
            other => GenericParamKind::Unknown(other),
        }
    }
}

impl std::fmt::Debug for GenericParamDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericParamDescriptor")
            .field("kind", &self.kind())
            .field("key", &self.has_key_argument())
            .finish()
    }
}
