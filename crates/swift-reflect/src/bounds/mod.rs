// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Class metadata bounds and their publish-once cache.
//!
//! A class whose superclass is resilient cannot know at compile time where
//! its own members (generic arguments, field offsets) live in its metadata:
//! that depends on how big the superclass metadata turned out to be. The
//! bounds are computed on first use by walking the superclass references and
//! cached in a [`StoredClassMetadataBounds`] cell embedded in the class
//! descriptor.
//!
//! # Concurrency
//!
//! The cell is never locked. Threads racing into the slow path all compute
//! the same value (a pure function of immutable descriptors) and publish it
//! with a release store of the immediate-members offset, which doubles as
//! the "filled" flag (a real offset is never 0).
//!
//! ```text
//! try_get:     offset = load(Acquire); 0 => unfilled; else read sizes
//! initialize:  store sizes (Relaxed); store offset (Release)
//! ```

use std::ffi::{c_char, CStr};
use std::fmt;
use std::mem::size_of;
use std::sync::atomic::{AtomicIsize, AtomicU32, Ordering};

use crate::abi::flags::TypeReferenceKind;
use crate::config::{CLASS_METADATA_HEADER_WORDS, WORD_SIZE};
use crate::descriptor::ClassDescriptor;
use crate::error::LinkageError;
use crate::metadata::{AnyClassMetadata, ClassMetadata, MetadataRef};

/// Extent of a class metadata object around its address point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassMetadataBounds {
    /// Byte offset of the class's own members from the address point.
    pub immediate_members_offset: isize,
    /// Words before the address point.
    pub negative_size_in_words: u32,
    /// Words from the address point on.
    pub positive_size_in_words: u32,
}

impl ClassMetadataBounds {
    /// Bounds of a class with no Swift superclass.
    pub const fn for_swift_root_class() -> Self {
        let header = CLASS_METADATA_HEADER_WORDS as usize * WORD_SIZE;
        Self::for_address_point_and_size(header, header + size_of::<ClassMetadata>())
    }

    /// Bounds of metadata whose address point sits `address_point` bytes into
    /// an object of `total_size` bytes. The immediate-members offset is the
    /// end of the object.
    pub const fn for_address_point_and_size(address_point: usize, total_size: usize) -> Self {
        let positive = total_size.saturating_sub(address_point);
        Self {
            immediate_members_offset: positive as isize,
            negative_size_in_words: (address_point / WORD_SIZE) as u32,
            positive_size_in_words: (positive / WORD_SIZE) as u32,
        }
    }

    /// Extend superclass bounds by a subclass's own `num_members` words.
    pub fn adjust_for_subclass(&mut self, are_members_negative: bool, num_members: u32) {
        if are_members_negative {
            self.negative_size_in_words += num_members;
            self.immediate_members_offset =
                -(self.negative_size_in_words as isize) * WORD_SIZE as isize;
        } else {
            self.immediate_members_offset = self.positive_size_in_words as isize * WORD_SIZE as isize;
            self.positive_size_in_words += num_members;
        }
    }

    pub const fn total_size_in_words(&self) -> u32 {
        self.negative_size_in_words + self.positive_size_in_words
    }

    /// Address point offset within the metadata object, in bytes.
    pub const fn address_point(&self) -> usize {
        self.negative_size_in_words as usize * WORD_SIZE
    }
}

/// Publish-once bounds cell embedded in a resilient class descriptor.
#[repr(C)]
pub struct StoredClassMetadataBounds {
    immediate_members_offset: AtomicIsize,
    negative_size_in_words: AtomicU32,
    positive_size_in_words: AtomicU32,
}

impl StoredClassMetadataBounds {
    /// An unfilled cell.
    pub const fn new() -> Self {
        Self {
            immediate_members_offset: AtomicIsize::new(0),
            negative_size_in_words: AtomicU32::new(0),
            positive_size_in_words: AtomicU32::new(0),
        }
    }

    /// Published bounds, `None` until [`initialize`](Self::initialize) ran.
    pub fn try_get(&self) -> Option<ClassMetadataBounds> {
        let offset = self.immediate_members_offset.load(Ordering::Acquire);
        if offset == 0 {
            return None;
        }
        Some(ClassMetadataBounds {
            immediate_members_offset: offset,
            negative_size_in_words: self.negative_size_in_words.load(Ordering::Relaxed),
            positive_size_in_words: self.positive_size_in_words.load(Ordering::Relaxed),
        })
    }

    /// Published immediate-members offset alone. Needs no ordering: the
    /// offset is meaningful without the sizes.
    pub fn try_get_immediate_members_offset(&self) -> Option<isize> {
        let offset = self.immediate_members_offset.load(Ordering::Relaxed);
        (offset != 0).then_some(offset)
    }

    /// Publish `bounds`. Racing initializers must publish equal values.
    pub fn initialize(&self, bounds: ClassMetadataBounds) {
        self.negative_size_in_words
            .store(bounds.negative_size_in_words, Ordering::Relaxed);
        self.positive_size_in_words
            .store(bounds.positive_size_in_words, Ordering::Relaxed);
        self.immediate_members_offset
            .store(bounds.immediate_members_offset, Ordering::Release);
    }
}

impl Default for StoredClassMetadataBounds {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StoredClassMetadataBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_get() {
            Some(bounds) => f.debug_tuple("StoredClassMetadataBounds").field(&bounds).finish(),
            None => f.write_str("StoredClassMetadataBounds(unfilled)"),
        }
    }
}

/// Access to classes that have no Swift descriptor (Objective-C classes).
///
/// Only consulted for resilient classes whose superclass is named through a
/// foreign reference.
pub trait ForeignClassLookup {
    /// Look a class up by its runtime name.
    fn class_named(&self, name: &[u8]) -> Option<MetadataRef>;

    /// Make sure `class` is realized before its metadata is read.
    fn initialized(&self, class: MetadataRef) -> MetadataRef {
        class
    }
}

/// Lookup for processes without foreign classes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoForeignClasses;

impl ForeignClassLookup for NoForeignClasses {
    fn class_named(&self, _name: &[u8]) -> Option<MetadataRef> {
        None
    }
}

impl AnyClassMetadata {
    /// Bounds of this class when serving as the superclass of a Swift class,
    /// rounded up to at least the bounds of a Swift root class. The
    /// immediate-members offset is not meaningful.
    pub fn bounds_as_swift_superclass(&self) -> ClassMetadataBounds {
        let root = ClassMetadataBounds::for_swift_root_class();
        let Some(class) = self.as_swift() else {
            return root;
        };
        let mut bounds = ClassMetadataBounds::for_address_point_and_size(
            class.class_address_point() as usize,
            class.class_size() as usize,
        );
        bounds.negative_size_in_words = bounds.negative_size_in_words.max(root.negative_size_in_words);
        bounds.positive_size_in_words = bounds.positive_size_in_words.max(root.positive_size_in_words);
        bounds
    }
}

impl ClassDescriptor {
    /// Metadata bounds of this class.
    ///
    /// Aborts the process when a weak-linked ancestor is missing; see
    /// [`try_metadata_bounds`](Self::try_metadata_bounds).
    pub fn metadata_bounds<F>(&self, foreign: &F) -> ClassMetadataBounds
    where
        F: ForeignClassLookup + ?Sized,
    {
        match self.try_metadata_bounds(foreign) {
            Ok(bounds) => bounds,
            Err(err) => linkage_fault(&err),
        }
    }

    pub fn try_metadata_bounds<F>(&self, foreign: &F) -> Result<ClassMetadataBounds, LinkageError>
    where
        F: ForeignClassLookup + ?Sized,
    {
        if !self.has_resilient_superclass() {
            return Ok(ClassMetadataBounds {
                immediate_members_offset: self.non_resilient_immediate_members_offset()
                    * WORD_SIZE as isize,
                negative_size_in_words: self.metadata_negative_size_in_words(),
                positive_size_in_words: self.metadata_positive_size_in_words(),
            });
        }

        let stored = self.stored_bounds();
        if let Some(bounds) = stored.and_then(StoredClassMetadataBounds::try_get) {
            return Ok(bounds);
        }

        log::debug!(
            "computing metadata bounds of class {}",
            String::from_utf8_lossy(self.name())
        );
        let mut bounds = self.resilient_superclass_bounds(foreign)?;
        bounds.adjust_for_subclass(
            self.are_immediate_members_negative(),
            self.num_immediate_members(),
        );
        if let Some(stored) = stored {
            stored.initialize(bounds);
        }
        Ok(bounds)
    }

    /// Byte offset of this class's own members from the metadata address
    /// point.
    pub fn immediate_members_offset<F>(&self, foreign: &F) -> isize
    where
        F: ForeignClassLookup + ?Sized,
    {
        if !self.has_resilient_superclass() {
            return self.non_resilient_immediate_members_offset() * WORD_SIZE as isize;
        }
        if let Some(offset) = self
            .stored_bounds()
            .and_then(StoredClassMetadataBounds::try_get_immediate_members_offset)
        {
            return offset;
        }
        self.metadata_bounds(foreign).immediate_members_offset
    }

    /// Word offset of the field offset vector from the metadata address
    /// point.
    pub fn field_offset_vector_offset<F>(&self, foreign: &F) -> isize
    where
        F: ForeignClassLookup + ?Sized,
    {
        let raw = self.raw_field_offset_vector_offset() as isize;
        if self.has_resilient_superclass() {
            return self.immediate_members_offset(foreign) / WORD_SIZE as isize + raw;
        }
        raw
    }

    /// Word offset of the generic argument vector from the metadata address
    /// point. Generic arguments open the immediate members.
    pub fn generic_argument_offset<F>(&self, foreign: &F) -> isize
    where
        F: ForeignClassLookup + ?Sized,
    {
        self.immediate_members_offset(foreign) / WORD_SIZE as isize
    }

    fn non_resilient_immediate_members_offset(&self) -> isize {
        if self.are_immediate_members_negative() {
            -(self.metadata_negative_size_in_words() as isize)
        } else {
            self.metadata_positive_size_in_words() as isize - self.num_immediate_members() as isize
        }
    }

    fn resilient_superclass_bounds<F>(&self, foreign: &F) -> Result<ClassMetadataBounds, LinkageError>
    where
        F: ForeignClassLookup + ?Sized,
    {
        let Some(reference) = self.resilient_superclass() else {
            return Err(LinkageError::UnreadableSuperclassReference {
                class: String::from_utf8_lossy(self.name()).into_owned(),
            });
        };
        let Some(address) = reference.address() else {
            return Ok(ClassMetadataBounds::for_swift_root_class());
        };

        match self.resilient_superclass_reference_kind() {
            TypeReferenceKind::DirectTypeDescriptor => {
                // SAFETY: a direct reference targets a class descriptor.
                let superclass = unsafe { &*(address as *const ClassDescriptor) };
                superclass.try_metadata_bounds(foreign)
            }
            TypeReferenceKind::IndirectTypeDescriptor => {
                // SAFETY: an indirect reference targets a pointer-sized slot.
                let slot = unsafe { std::ptr::read_unaligned(address as *const *const ClassDescriptor) };
                // SAFETY: a filled slot holds a class descriptor.
                match unsafe { slot.as_ref() } {
                    Some(superclass) => superclass.try_metadata_bounds(foreign),
                    None => Err(LinkageError::MissingWeakAncestor {
                        class: String::from_utf8_lossy(self.name()).into_owned(),
                    }),
                }
            }
            TypeReferenceKind::DirectObjCClassName => {
                // SAFETY: a direct name reference targets a C string.
                let name = unsafe { CStr::from_ptr(address as *const c_char) }.to_bytes();
                match foreign.class_named(name) {
                    Some(class) => Ok(foreign_bounds(foreign, class)),
                    None => {
                        log::warn!(
                            "superclass {} of {} not found, assuming root class bounds",
                            String::from_utf8_lossy(name),
                            String::from_utf8_lossy(self.name())
                        );
                        Ok(ClassMetadataBounds::for_swift_root_class())
                    }
                }
            }
            TypeReferenceKind::IndirectObjCClass => {
                // SAFETY: an indirect reference targets a pointer-sized slot.
                let slot = unsafe { std::ptr::read_unaligned(address as *const *const std::ffi::c_void) };
                // SAFETY: a filled slot holds a class object.
                match unsafe { MetadataRef::from_ptr(slot) } {
                    Some(class) => Ok(foreign_bounds(foreign, class)),
                    None => {
                        log::warn!(
                            "superclass slot of {} is empty, assuming root class bounds",
                            String::from_utf8_lossy(self.name())
                        );
                        Ok(ClassMetadataBounds::for_swift_root_class())
                    }
                }
            }
            TypeReferenceKind::Unknown(kind) => {
                log::warn!(
                    "unknown superclass reference kind {} in {}, assuming root class bounds",
                    kind,
                    String::from_utf8_lossy(self.name())
                );
                Ok(ClassMetadataBounds::for_swift_root_class())
            }
        }
    }
}

fn foreign_bounds<F>(foreign: &F, class: MetadataRef) -> ClassMetadataBounds
where
    F: ForeignClassLookup + ?Sized,
{
    let class = foreign.initialized(class);
    match class.as_class() {
        Some(metadata) => metadata.bounds_as_swift_superclass(),
        None => ClassMetadataBounds::for_swift_root_class(),
    }
}

/// Report an ABI linkage fault and abort.
#[cold]
fn linkage_fault(err: &LinkageError) -> ! {
    log::error!("{}", err);
    eprintln!("swift-reflect: fatal: {}", err);
    std::process::abort()
}
