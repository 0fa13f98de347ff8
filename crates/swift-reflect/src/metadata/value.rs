// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::ffi::{c_char, CStr};
use std::slice;

use super::{GenericArguments, Metadata, MetadataRef};
use crate::config::{VALUE_GENERIC_ARGUMENTS_WORD, WORD_SIZE};
use crate::descriptor::StructDescriptor;

/// Struct metadata.
///
/// ```text
/// 0  kind = 0x200
/// 1  description
/// 2  generic arguments...     (if generic)
/// n  u32 field offsets        (at the descriptor's vector offset, in words)
/// ```
#[repr(C)]
pub struct StructMetadata {
    kind: usize,
    description: *const StructDescriptor,
}

impl StructMetadata {
    pub fn description(&self) -> Option<&'static StructDescriptor> {
        // SAFETY: a non-null description is a descriptor in a loaded image.
        unsafe { self.description.as_ref() }
    }

    /// Generic argument vector, absent for non-generic structs.
    pub fn generic_arguments(&self) -> Option<GenericArguments> {
        let description = self.description()?;
        if !description.is_generic() {
            return None;
        }
        GenericArguments::from_address(
            self as *const Self as usize + VALUE_GENERIC_ARGUMENTS_WORD * WORD_SIZE,
        )
    }

    /// The `u32` field offset vector, empty when the descriptor declares
    /// none.
    pub fn field_offsets(&self) -> &'static [u32] {
        let Some(description) = self.description() else {
            return &[];
        };
        let vector = description.field_offset_vector_offset() as usize;
        if vector == 0 {
            return &[];
        }
        let start = (self as *const Self as usize + vector * WORD_SIZE) as *const u32;
        // SAFETY: struct metadata carries `num_fields` offsets at the vector
        // offset its descriptor names.
        unsafe { slice::from_raw_parts(start, description.num_fields() as usize) }
    }
}

/// One element of a tuple type.
#[repr(C)]
pub struct TupleElement {
    ty: *const Metadata,
    offset: usize,
}

impl TupleElement {
    pub fn ty(&self) -> Option<MetadataRef> {
        // SAFETY: element types are valid metadata.
        unsafe { MetadataRef::from_ptr(self.ty.cast()) }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Tuple metadata.
///
/// ```text
/// 0  kind = 0x301
/// 1  numElements
/// 2  labels          space-separated, NUL-terminated; null when unlabeled
/// 3  elements[numElements] { type, offset }
/// ```
#[repr(C)]
pub struct TupleMetadata {
    kind: usize,
    num_elements: usize,
    labels: *const c_char,
    elements: [TupleElement; 0],
}

impl TupleMetadata {
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn elements(&self) -> &[TupleElement] {
        // SAFETY: `num_elements` elements trail the header.
        unsafe { slice::from_raw_parts(self.elements.as_ptr(), self.num_elements) }
    }

    /// Raw label blob, without the terminator.
    pub fn label_bytes(&self) -> &[u8] {
        if self.labels.is_null() {
            return &[];
        }
        // SAFETY: the label string is NUL-terminated and immutable.
        unsafe { CStr::from_ptr(self.labels) }.to_bytes()
    }

    pub fn labels(&self) -> TupleLabels<'_> {
        TupleLabels::new(self.label_bytes())
    }
}

/// Splits a tuple label blob into per-element labels.
///
/// Each label is terminated by a space; an unlabeled element contributes an
/// empty label. Once the blob runs out, every further label is empty.
///
/// ```
/// use swift_reflect::metadata::TupleLabels;
///
/// let labels: Vec<&[u8]> = TupleLabels::new(b"label  ").take(3).collect();
/// assert_eq!(labels, [&b"label"[..], b"", b""]);
/// ```
#[derive(Debug, Clone)]
pub struct TupleLabels<'a> {
    rest: &'a [u8],
}

impl<'a> TupleLabels<'a> {
    pub fn new(blob: &'a [u8]) -> Self {
        Self { rest: blob }
    }
}

impl<'a> Iterator for TupleLabels<'a> {
    type Item = &'a [u8];

    /// Never returns `None`: the label list is conceptually padded with
    /// empty labels.
    fn next(&mut self) -> Option<&'a [u8]> {
        let end = self
            .rest
            .iter()
            .position(|&b| b == b' ' || b == 0)
            .unwrap_or(self.rest.len());
        let label = &self.rest[..end];
        self.rest = match self.rest.get(end) {
            Some(b' ') => &self.rest[end + 1..],
            _ => &[],
        };
        Some(label)
    }
}

impl std::iter::FusedIterator for TupleLabels<'_> {}
