// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Context descriptors: the static, compiler-emitted records that describe
//! declared types.
//!
//! ```text
//! ContextDescriptor       flags: u32, parent: rel32 (indirectable)
//!   TypeContextDescriptor   + name, accessFunction, fields (rel32)
//!     StructDescriptor        + numFields, fieldOffsetVectorOffset
//!     ClassDescriptor         + superclassType, bounds/sizes, members, ...
//! ```
//!
//! All records are `#[repr(C)]` mirrors that are only ever observed in
//! place, behind shared references into a metadata image.

mod class;
mod generic;

pub use class::{ClassDescriptor, ResilientSuperclass};
pub(crate) use generic::{align4, VALUE_DESCRIPTOR_SIZE, VALUE_HEADER_SIZE};
pub use generic::{
    GenericContextDescriptorHeader, GenericParamDescriptor, GenericParamKind,
    TypeGenericContextDescriptorHeader,
};

use std::ffi::{c_char, c_void, CStr};
use std::iter;

use crate::abi::flags::{ContextDescriptorFlags, ContextDescriptorKind, TypeContextDescriptorFlags};
use crate::abi::relative::{RelativeDirectPointer, RelativeIndirectablePointer};
use crate::field::FieldDescriptor;

/// Read the NUL-terminated string at `ptr`, empty when null.
fn c_bytes<'a>(ptr: *const c_char) -> &'a [u8] {
    if ptr.is_null() {
        return &[];
    }
    // SAFETY: names in a metadata image are NUL-terminated and immutable for
    // the life of the image.
    unsafe { CStr::from_ptr(ptr) }.to_bytes()
}

/// Common header of every context descriptor.
#[repr(C)]
pub struct ContextDescriptor {
    flags: ContextDescriptorFlags,
    parent: RelativeIndirectablePointer<ContextDescriptor, true>,
}

impl ContextDescriptor {
    pub fn flags(&self) -> ContextDescriptorFlags {
        self.flags
    }

    pub fn kind(&self) -> ContextDescriptorKind {
        self.flags.kind()
    }

    pub fn is_generic(&self) -> bool {
        self.flags.is_generic()
    }

    /// Enclosing context (module, extension or outer type).
    pub fn parent(&self) -> Option<&ContextDescriptor> {
        self.parent.get()
    }

    /// Enclosing contexts, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = &ContextDescriptor> + '_ {
        iter::successors(self.parent(), |context| context.parent())
    }

    /// Name of the module this context is declared in.
    pub fn module_name(&self) -> Option<&[u8]> {
        iter::once(self)
            .chain(self.ancestors())
            .find_map(|context| context.as_module())
            .map(ModuleContextDescriptor::name)
    }

    pub fn as_module(&self) -> Option<&ModuleContextDescriptor> {
        if self.kind() != ContextDescriptorKind::Module {
            return None;
        }
        // SAFETY: the kind tag says this header starts a module descriptor.
        Some(unsafe { &*(self as *const Self).cast::<ModuleContextDescriptor>() })
    }

    pub fn as_type(&self) -> Option<&TypeContextDescriptor> {
        if !self.kind().is_type() {
            return None;
        }
        // SAFETY: type kinds are always emitted with the type context layout.
        Some(unsafe { &*(self as *const Self).cast::<TypeContextDescriptor>() })
    }

    pub fn as_struct(&self) -> Option<&StructDescriptor> {
        if self.kind() != ContextDescriptorKind::Struct {
            return None;
        }
        // SAFETY: the kind tag says this header starts a struct descriptor.
        Some(unsafe { &*(self as *const Self).cast::<StructDescriptor>() })
    }

    pub fn as_class(&self) -> Option<&ClassDescriptor> {
        if self.kind() != ContextDescriptorKind::Class {
            return None;
        }
        // SAFETY: the kind tag says this header starts a class descriptor.
        Some(unsafe { &*(self as *const Self).cast::<ClassDescriptor>() })
    }

    pub fn as_ptr(&self) -> *const c_void {
        (self as *const Self).cast()
    }
}

impl std::fmt::Debug for ContextDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("ContextDescriptor");
        s.field("flags", &self.flags);
        if let Some(ty) = self.as_type() {
            s.field("name", &String::from_utf8_lossy(ty.name()));
        }
        s.finish()
    }
}

#[repr(C)]
pub struct ModuleContextDescriptor {
    base: ContextDescriptor,
    name: RelativeDirectPointer<c_char, false>,
}

impl ModuleContextDescriptor {
    pub fn name(&self) -> &[u8] {
        c_bytes(self.name.as_ptr())
    }
}

/// Header shared by class, struct and enum descriptors.
#[repr(C)]
pub struct TypeContextDescriptor {
    base: ContextDescriptor,
    name: RelativeDirectPointer<c_char, false>,
    access_function: RelativeDirectPointer<c_void, true>,
    fields: RelativeDirectPointer<FieldDescriptor, true>,
}

impl TypeContextDescriptor {
    pub fn context(&self) -> &ContextDescriptor {
        &self.base
    }

    pub fn flags(&self) -> ContextDescriptorFlags {
        self.base.flags
    }

    pub fn type_flags(&self) -> TypeContextDescriptorFlags {
        self.base.flags.type_flags()
    }

    pub fn kind(&self) -> ContextDescriptorKind {
        self.base.kind()
    }

    pub fn is_generic(&self) -> bool {
        self.base.is_generic()
    }

    /// Unqualified type name.
    pub fn name(&self) -> &[u8] {
        c_bytes(self.name.as_ptr())
    }

    /// Metadata access function, absent for types without one.
    pub fn access_function(&self) -> Option<*const c_void> {
        let ptr = self.access_function.as_ptr();
        (!ptr.is_null()).then_some(ptr)
    }

    /// Stored-member description, absent when reflection metadata was
    /// stripped or never emitted.
    pub fn fields(&self) -> Option<&FieldDescriptor> {
        self.fields.get()
    }

    pub fn as_ptr(&self) -> *const c_void {
        (self as *const Self).cast()
    }
}

impl std::fmt::Debug for TypeContextDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeContextDescriptor")
            .field("kind", &self.kind())
            .field("name", &String::from_utf8_lossy(self.name()))
            .field("has_fields", &self.fields().is_some())
            .finish()
    }
}

#[repr(C)]
pub struct StructDescriptor {
    base: TypeContextDescriptor,
    num_fields: u32,
    field_offset_vector_offset: u32,
}

impl StructDescriptor {
    pub fn as_type(&self) -> &TypeContextDescriptor {
        &self.base
    }

    pub fn num_fields(&self) -> u32 {
        self.num_fields
    }

    /// Offset of the `u32` field offset vector, in words from the address
    /// point. Zero when the struct has no stored properties.
    pub fn field_offset_vector_offset(&self) -> u32 {
        self.field_offset_vector_offset
    }
}

impl std::ops::Deref for StructDescriptor {
    type Target = TypeContextDescriptor;

    fn deref(&self) -> &TypeContextDescriptor {
        &self.base
    }
}

impl std::fmt::Debug for StructDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructDescriptor")
            .field("name", &String::from_utf8_lossy(self.name()))
            .field("generic", &self.is_generic())
            .field("num_fields", &self.num_fields)
            .field("field_offset_vector_offset", &self.field_offset_vector_offset)
            .finish()
    }
}
