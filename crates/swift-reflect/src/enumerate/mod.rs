// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stored-field enumeration for classes, structs and tuples.
//!
//! # Walk order
//!
//! ```text
//! class   policy check -> superclass chain (root first) -> own records
//! struct  own records, zipped with the u32 offset vector
//! tuple   elements, labels split from the label blob
//! other   nothing; reported as complete
//! ```
//!
//! The callback returns `false` to stop; that `false` propagates out of
//! every level of the walk. No step allocates.

use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;

use crate::abi::mangled::MangledName;
use crate::bounds::{ForeignClassLookup, NoForeignClasses};
use crate::config::ReflectConfig;
use crate::descriptor::TypeContextDescriptor;
use crate::metadata::{
    AnyClassMetadata, GenericArguments, MetadataKind, MetadataRef, StructMetadata, TupleMetadata,
};

/// Turns a field's mangled type name into metadata.
///
/// `context` is the descriptor of the type declaring the field, against
/// which symbolic references and generic parameters are interpreted.
/// `generic_args` is that type's instantiated argument vector, when it is
/// generic.
pub trait TypeResolver {
    fn resolve_type(
        &self,
        name: MangledName<'_>,
        context: &TypeContextDescriptor,
        generic_args: Option<GenericArguments>,
    ) -> Option<MetadataRef>;
}

impl<R: TypeResolver + ?Sized> TypeResolver for &R {
    fn resolve_type(
        &self,
        name: MangledName<'_>,
        context: &TypeContextDescriptor,
        generic_args: Option<GenericArguments>,
    ) -> Option<MetadataRef> {
        (**self).resolve_type(name, context, generic_args)
    }
}

/// Resolver backed by a closure; see [`resolver_fn`].
#[derive(Clone, Copy)]
pub struct FnResolver<F>(F);

impl<F> TypeResolver for FnResolver<F>
where
    F: Fn(MangledName<'_>, &TypeContextDescriptor, Option<GenericArguments>) -> Option<MetadataRef>,
{
    fn resolve_type(
        &self,
        name: MangledName<'_>,
        context: &TypeContextDescriptor,
        generic_args: Option<GenericArguments>,
    ) -> Option<MetadataRef> {
        (self.0)(name, context, generic_args)
    }
}

impl<F> fmt::Debug for FnResolver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnResolver")
    }
}

/// Adapt a closure into a [`TypeResolver`].
pub fn resolver_fn<F>(f: F) -> FnResolver<F>
where
    F: Fn(MangledName<'_>, &TypeContextDescriptor, Option<GenericArguments>) -> Option<MetadataRef>,
{
    FnResolver(f)
}

/// Resolves mangled names by exact byte match against a prebuilt table.
///
/// Names with symbolic references only match when the table was keyed with
/// the same bytes, so this suits images whose names are plain. Also serves
/// as a [`ForeignClassLookup`] keyed by class name.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: HashMap<Vec<u8>, MetadataRef>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<Vec<u8>>, metadata: MetadataRef) -> Option<MetadataRef> {
        self.types.insert(name.into(), metadata)
    }

    pub fn with(mut self, name: impl Into<Vec<u8>>, metadata: MetadataRef) -> Self {
        self.insert(name, metadata);
        self
    }

    pub fn get(&self, name: &[u8]) -> Option<MetadataRef> {
        self.types.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeResolver for TypeTable {
    fn resolve_type(
        &self,
        name: MangledName<'_>,
        _context: &TypeContextDescriptor,
        _generic_args: Option<GenericArguments>,
    ) -> Option<MetadataRef> {
        self.get(name.as_bytes())
    }
}

impl ForeignClassLookup for TypeTable {
    fn class_named(&self, name: &[u8]) -> Option<MetadataRef> {
        self.get(name)
    }
}

type FieldCallback<'c> = dyn FnMut(&[u8], usize, Option<MetadataRef>) -> bool + 'c;

/// One enumerated field, owned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name, lossily decoded; empty for unnamed fields.
    pub name: String,
    /// Byte offset within the instance.
    pub offset: usize,
    /// Resolved field type, `None` when the resolver could not resolve it.
    pub ty: Option<MetadataRef>,
}

/// Walks the stored fields of a type.
pub struct FieldEnumerator<'e, R: ?Sized, F: ?Sized = NoForeignClasses> {
    resolver: &'e R,
    foreign: &'e F,
    config: ReflectConfig,
}

impl<'e, R> FieldEnumerator<'e, R, NoForeignClasses>
where
    R: TypeResolver + ?Sized,
{
    pub fn new(resolver: &'e R) -> Self {
        Self {
            resolver,
            foreign: &NoForeignClasses,
            config: ReflectConfig::default(),
        }
    }
}

impl<'e, R, F> FieldEnumerator<'e, R, F>
where
    R: TypeResolver + ?Sized,
    F: ForeignClassLookup + ?Sized,
{
    pub fn with_config(mut self, config: ReflectConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether classes with a resilient superclass may be enumerated.
    pub fn allow_resilient_superclasses(mut self, allow: bool) -> Self {
        self.config.allow_resilient_superclasses = allow;
        self
    }

    /// Lookup used for superclasses named through foreign references.
    pub fn with_foreign_classes<G>(self, foreign: &'e G) -> FieldEnumerator<'e, R, G>
    where
        G: ForeignClassLookup + ?Sized,
    {
        FieldEnumerator {
            resolver: self.resolver,
            foreign,
            config: self.config,
        }
    }

    pub fn config(&self) -> ReflectConfig {
        self.config
    }

    /// Invoke `callback(name, offset, type)` for every stored field of
    /// `metadata`, superclass fields first.
    ///
    /// Returns `true` when every field was visited, `false` when the
    /// callback stopped the walk or the type was refused by policy.
    pub fn enumerate<C>(&self, metadata: MetadataRef, mut callback: C) -> bool
    where
        C: FnMut(&[u8], usize, Option<MetadataRef>) -> bool,
    {
        self.walk(metadata, &mut callback)
    }

    /// Collect every field, `None` when the walk was refused.
    pub fn fields(&self, metadata: MetadataRef) -> Option<Vec<FieldInfo>> {
        let mut fields = Vec::new();
        let complete = self.enumerate(metadata, |name, offset, ty| {
            fields.push(FieldInfo {
                name: String::from_utf8_lossy(name).into_owned(),
                offset,
                ty,
            });
            true
        });
        complete.then_some(fields)
    }

    fn walk(&self, metadata: MetadataRef, callback: &mut FieldCallback<'_>) -> bool {
        log::trace!("enumerating fields of {:?}", metadata);
        match metadata.kind() {
            MetadataKind::Class => match metadata.as_class() {
                Some(class) => self.walk_class(class, callback),
                None => true,
            },
            MetadataKind::Struct => match metadata.as_struct() {
                Some(value) => self.walk_struct(value, callback),
                None => true,
            },
            MetadataKind::Tuple => match metadata.as_tuple() {
                Some(tuple) => walk_tuple(tuple, callback),
                None => true,
            },
            MetadataKind::Unknown(raw) => {
                log::debug!("metadata kind {:#x} has no stored fields", raw);
                true
            }
            _ => true,
        }
    }

    fn walk_class(
        &self,
        class: &AnyClassMetadata,
        callback: &mut FieldCallback<'_>,
    ) -> bool {
        // Pure Objective-C classes have no Swift fields.
        let Some(swift) = class.as_swift() else {
            return true;
        };
        let description = swift.description();

        if let Some(descriptor) = description {
            if descriptor.has_resilient_superclass() && !self.config.allow_resilient_superclasses {
                log::debug!(
                    "refusing class {} with resilient superclass",
                    String::from_utf8_lossy(descriptor.name())
                );
                return false;
            }
            if descriptor.has_resilient_superclass() && descriptor.resilient_superclass().is_none() {
                log::debug!(
                    "cannot locate superclass reference of class {}",
                    String::from_utf8_lossy(descriptor.name())
                );
                return false;
            }
        }

        if let Some(superclass) = swift.superclass() {
            if !self.walk(superclass, callback) {
                return false;
            }
        }

        let Some(descriptor) = description else {
            return true;
        };
        let Some(fields) = descriptor.fields() else {
            return true;
        };

        let raw_vector = descriptor.raw_field_offset_vector_offset();
        if !descriptor.has_resilient_superclass() && raw_vector == 0 {
            return true;
        }
        let vector = descriptor.field_offset_vector_offset(self.foreign);
        let count = descriptor.num_fields() as usize;
        if !swift.contains_words(vector, count) {
            log::warn!(
                "field offsets of class {} fall outside its metadata",
                String::from_utf8_lossy(descriptor.name())
            );
            return false;
        }
        let generic_args = match descriptor.generic_context() {
            Some(generic) => {
                let offset = descriptor.generic_argument_offset(self.foreign);
                let num_args = usize::from(generic.header().num_key_arguments);
                if !swift.contains_words(offset, num_args) {
                    log::warn!(
                        "generic arguments of class {} fall outside its metadata",
                        String::from_utf8_lossy(descriptor.name())
                    );
                    return false;
                }
                GenericArguments::from_address(swift.word_address(offset))
            }
            None => None,
        };

        let context = descriptor.as_type();
        for (index, record) in fields.records().take(count).enumerate() {
            // SAFETY: the `num_fields` vector words were checked to lie inside
            // this class's metadata.
            let offset = unsafe { swift.word(vector + index as isize) };
            let ty = record
                .mangled_type_name()
                .and_then(|name| self.resolver.resolve_type(name, context, generic_args));
            if !callback(record.field_name(), offset, ty) {
                return false;
            }
        }
        true
    }

    fn walk_struct(
        &self,
        value: &StructMetadata,
        callback: &mut FieldCallback<'_>,
    ) -> bool {
        let Some(descriptor) = value.description() else {
            return true;
        };
        let Some(fields) = descriptor.fields() else {
            return true;
        };

        let context = descriptor.as_type();
        let generic_args = value.generic_arguments();
        for (record, &offset) in fields.records().zip(value.field_offsets()) {
            let ty = record
                .mangled_type_name()
                .and_then(|name| self.resolver.resolve_type(name, context, generic_args));
            if !callback(record.field_name(), offset as usize, ty) {
                return false;
            }
        }
        true
    }
}

fn walk_tuple(
    tuple: &TupleMetadata,
    callback: &mut FieldCallback<'_>,
) -> bool {
    tuple
        .elements()
        .iter()
        .zip(tuple.labels())
        .all(|(element, label)| callback(label, element.offset(), element.ty()))
}

impl<R: ?Sized, F: ?Sized> fmt::Debug for FieldEnumerator<'_, R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldEnumerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Enumerate the stored fields of the type whose metadata lives at
/// `metadata`.
///
/// Null metadata yields `false`. See [`FieldEnumerator::enumerate`] for the
/// walk itself.
///
/// # Safety
///
/// A non-null `metadata` must satisfy the contract of
/// [`MetadataRef::from_ptr`].
pub unsafe fn enumerate_fields<R, C>(
    metadata: *const c_void,
    allow_resilient_superclasses: bool,
    resolver: &R,
    callback: C,
) -> bool
where
    R: TypeResolver + ?Sized,
    C: FnMut(&[u8], usize, Option<MetadataRef>) -> bool,
{
    let Some(metadata) = MetadataRef::from_ptr(metadata) else {
        return false;
    };
    FieldEnumerator::new(resolver)
        .allow_resilient_superclasses(allow_resilient_superclasses)
        .enumerate(metadata, callback)
}

#[cfg(test)]
mod tests;
