// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type metadata records, viewed from their address point.
//!
//! A [`MetadataRef`] is the only way in: it is created from a raw address
//! once (unsafely), after which every view it hands out is a plain shared
//! reference with `'static` lifetime, since metadata lives as long as the
//! process.

mod class;
mod kind;
mod value;

pub use class::{AnyClassMetadata, ClassMetadata};
pub use kind::MetadataKind;
pub use value::{StructMetadata, TupleElement, TupleLabels, TupleMetadata};

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

/// Common prefix of every metadata record.
#[repr(C)]
pub struct Metadata {
    kind: usize,
}

impl Metadata {
    pub fn kind(&self) -> MetadataKind {
        MetadataKind::from_raw(self.kind)
    }
}

/// Handle to a type metadata record.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetadataRef(NonNull<Metadata>);

// SAFETY: metadata is immutable and lives for the whole process; the only
// interior mutability (bounds caches) lives in descriptors and is atomic.
unsafe impl Send for MetadataRef {}
unsafe impl Sync for MetadataRef {}

impl MetadataRef {
    /// Wrap a raw metadata address. Null yields `None`.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be the address point of valid, immutable type
    /// metadata that stays alive for the rest of the process, and every
    /// record reachable from it must be valid too.
    pub unsafe fn from_ptr(ptr: *const c_void) -> Option<Self> {
        NonNull::new(ptr as *mut Metadata).map(Self)
    }

    pub(crate) fn from_static(metadata: &'static Metadata) -> Self {
        Self(NonNull::from(metadata))
    }

    pub fn as_ptr(self) -> *const c_void {
        self.0.as_ptr().cast_const().cast()
    }

    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }

    pub fn metadata(self) -> &'static Metadata {
        // SAFETY: guaranteed by the contract of `from_ptr`.
        unsafe { self.0.as_ref() }
    }

    pub fn kind(self) -> MetadataKind {
        self.metadata().kind()
    }

    pub fn as_class(self) -> Option<&'static AnyClassMetadata> {
        (self.kind() == MetadataKind::Class).then(|| self.cast())
    }

    pub fn as_struct(self) -> Option<&'static StructMetadata> {
        (self.kind() == MetadataKind::Struct).then(|| self.cast())
    }

    pub fn as_tuple(self) -> Option<&'static TupleMetadata> {
        (self.kind() == MetadataKind::Tuple).then(|| self.cast())
    }

    fn cast<T>(self) -> &'static T {
        // SAFETY: callers checked the kind tag, which fixes the layout.
        unsafe { &*self.0.as_ptr().cast::<T>() }
    }
}

impl fmt::Debug for MetadataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetadataRef({:?} @ {:#x})", self.kind(), self.addr())
    }
}

/// Generic argument vector of a generic type's metadata.
///
/// Passed through to the type resolver untouched.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GenericArguments(NonNull<*const Metadata>);

// SAFETY: see `MetadataRef`.
unsafe impl Send for GenericArguments {}
unsafe impl Sync for GenericArguments {}

impl GenericArguments {
    pub(crate) fn from_address(address: usize) -> Option<Self> {
        NonNull::new(address as *mut *const Metadata).map(Self)
    }

    pub fn as_ptr(self) -> *const *const c_void {
        self.0.as_ptr().cast_const().cast()
    }

    /// Argument at `index`.
    ///
    /// # Safety
    ///
    /// `index` must be below the number of key arguments of the generic
    /// context this vector belongs to.
    pub unsafe fn get(self, index: usize) -> Option<MetadataRef> {
        let arg = *self.0.as_ptr().add(index);
        MetadataRef::from_ptr(arg.cast())
    }
}

impl fmt::Debug for GenericArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenericArguments({:p})", self.0)
    }
}
