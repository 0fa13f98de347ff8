// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field descriptors: one type's own stored members.
//!
//! # Layout
//!
//! ```text
//! FieldDescriptor (16 bytes)
//!   0   mangledTypeName   rel32, nullable
//!   4   superclass        rel32, nullable
//!   8   kind              u16
//!   10  fieldRecordSize   u16
//!   12  numFields         u32
//! FieldRecord[numFields] at fieldRecordSize stride (12 bytes)
//!   0   flags             u32
//!   4   mangledTypeName   rel32, nullable
//!   8   fieldName         rel32, nullable
//! ```
//!
//! Records are read lazily, in place; nothing is copied.

use std::ffi::{c_char, CStr};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem::size_of;

use crate::abi::mangled::{self, MangledName};
use crate::abi::relative::{self, RelativeDirectPointer};
use crate::config::FIELD_RECORD_SIZE;

/// What kind of type a field descriptor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldDescriptorKind {
    Struct,
    Class,
    Enum,
    MultiPayloadEnum,
    Protocol,
    ClassProtocol,
    ObjCProtocol,
    ObjCClass,
    /// Emitted by a newer compiler; treated as having no fields.
    Unknown(u16),
}

impl FieldDescriptorKind {
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            0 => Self::Struct,
            1 => Self::Class,
            2 => Self::Enum,
            3 => Self::MultiPayloadEnum,
            4 => Self::Protocol,
            5 => Self::ClassProtocol,
            6 => Self::ObjCProtocol,
            7 => Self::ObjCClass,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_raw(self) -> u16 {
        match self {
            Self::Struct => 0,
            Self::Class => 1,
            Self::Enum => 2,
            Self::MultiPayloadEnum => 3,
            Self::Protocol => 4,
            Self::ClassProtocol => 5,
            Self::ObjCProtocol => 6,
            Self::ObjCClass => 7,
            Self::Unknown(raw) => raw,
        }
    }

    pub const fn is_enum(self) -> bool {
        matches!(self, Self::Enum | Self::MultiPayloadEnum)
    }

    pub const fn is_class(self) -> bool {
        matches!(self, Self::Class | Self::ObjCClass)
    }

    pub const fn is_protocol(self) -> bool {
        matches!(self, Self::Protocol | Self::ClassProtocol | Self::ObjCProtocol)
    }
}

/// Per-record flag word.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldRecordFlags(u32);

impl FieldRecordFlags {
    /// Enum case whose payload is boxed.
    pub const IS_INDIRECT_CASE: u32 = 0x1;
    /// Mutable (`var`) stored property.
    pub const IS_VAR: u32 = 0x2;

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_indirect_case(self) -> bool {
        self.0 & Self::IS_INDIRECT_CASE != 0
    }

    pub const fn is_var(self) -> bool {
        self.0 & Self::IS_VAR != 0
    }
}

/// One stored member.
///
/// Kept byte-aligned: records sit at whatever stride the descriptor
/// declares, which need not be a multiple of four.
#[repr(C)]
pub struct FieldRecord {
    flags: [u8; 4],
    mangled_type_name: [u8; 4],
    field_name: [u8; 4],
}

impl FieldRecord {
    pub fn flags(&self) -> FieldRecordFlags {
        FieldRecordFlags::from_bits(u32::from_ne_bytes(self.flags))
    }

    pub fn is_indirect_case(&self) -> bool {
        self.flags().is_indirect_case()
    }

    pub fn is_var(&self) -> bool {
        self.flags().is_var()
    }

    /// Field name; empty when the record carries none.
    pub fn field_name(&self) -> &[u8] {
        let ptr = relative_c_str(&self.field_name);
        if ptr.is_null() {
            return &[];
        }
        // SAFETY: field names are NUL-terminated strings in the same image.
        unsafe { CStr::from_ptr(ptr) }.to_bytes()
    }

    /// Mangled type name; absent for enum cases without a payload.
    pub fn mangled_type_name(&self) -> Option<MangledName<'_>> {
        scan_nullable(relative_c_str(&self.mangled_type_name))
    }

    pub fn has_mangled_type_name(&self) -> bool {
        self.mangled_type_name != [0; 4]
    }
}

/// Resolve a nullable direct rel32 stored in `field`.
fn relative_c_str(field: &[u8; 4]) -> *const c_char {
    let offset = i32::from_ne_bytes(*field);
    // SAFETY: a direct reference is never dereferenced while resolving.
    unsafe { relative::resolve(field.as_ptr() as usize, offset, false, true) }
        .map_or(std::ptr::null(), |address| address as *const c_char)
}

impl std::fmt::Debug for FieldRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRecord")
            .field("name", &String::from_utf8_lossy(self.field_name()))
            .field("type", &self.mangled_type_name())
            .field("flags", &self.flags())
            .finish()
    }
}

fn scan_nullable<'a>(ptr: *const c_char) -> Option<MangledName<'a>> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: mangled names in an image are terminated outside any symbolic
    // reference payload.
    Some(unsafe { mangled::scan(ptr.cast()) })
}

#[repr(C)]
pub struct FieldDescriptor {
    mangled_type_name: RelativeDirectPointer<c_char, true>,
    superclass: RelativeDirectPointer<c_char, true>,
    kind: u16,
    field_record_size: u16,
    num_fields: u32,
}

impl FieldDescriptor {
    pub fn kind(&self) -> FieldDescriptorKind {
        FieldDescriptorKind::from_raw(self.kind)
    }

    /// Number of records, as stored.
    pub fn num_fields(&self) -> u32 {
        self.num_fields
    }

    pub fn field_record_size(&self) -> u16 {
        self.field_record_size
    }

    /// Mangled name of the described type.
    pub fn mangled_type_name(&self) -> Option<MangledName<'_>> {
        scan_nullable(self.mangled_type_name.as_ptr())
    }

    /// Mangled name of the superclass, for class descriptors.
    pub fn superclass(&self) -> Option<MangledName<'_>> {
        scan_nullable(self.superclass.as_ptr())
    }

    /// Records in declaration order. Empty for unknown kinds.
    pub fn records(&self) -> FieldRecords<'_> {
        let remaining = match self.kind() {
            FieldDescriptorKind::Unknown(_) => 0,
            _ => self.num_fields as usize,
        };
        FieldRecords {
            next: self as *const Self as usize + size_of::<Self>(),
            stride: record_stride(self.field_record_size),
            remaining,
            _descriptor: PhantomData,
        }
    }
}

impl<'a> IntoIterator for &'a FieldDescriptor {
    type Item = &'a FieldRecord;
    type IntoIter = FieldRecords<'a>;

    fn into_iter(self) -> FieldRecords<'a> {
        self.records()
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("kind", &self.kind())
            .field("type", &self.mangled_type_name())
            .field("num_fields", &self.num_fields)
            .finish()
    }
}

/// Older images wrote a zero record size; anything too small to hold a
/// record falls back to the natural stride.
pub(crate) fn record_stride(stored: u16) -> usize {
    usize::from(stored).max(FIELD_RECORD_SIZE)
}

/// Lazy, restartable iterator over the records trailing a
/// [`FieldDescriptor`].
#[derive(Clone)]
pub struct FieldRecords<'a> {
    next: usize,
    stride: usize,
    remaining: usize,
    _descriptor: PhantomData<&'a FieldDescriptor>,
}

impl<'a> Iterator for FieldRecords<'a> {
    type Item = &'a FieldRecord;

    fn next(&mut self) -> Option<&'a FieldRecord> {
        if self.remaining == 0 {
            return None;
        }
        // SAFETY: `remaining` records follow the descriptor at `stride`.
        let record = unsafe { &*(self.next as *const FieldRecord) };
        self.next += self.stride;
        self.remaining -= 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }

    fn nth(&mut self, n: usize) -> Option<&'a FieldRecord> {
        if n >= self.remaining {
            self.remaining = 0;
            return None;
        }
        self.next += n * self.stride;
        self.remaining -= n;
        self.next()
    }
}

impl ExactSizeIterator for FieldRecords<'_> {}

impl FusedIterator for FieldRecords<'_> {}
