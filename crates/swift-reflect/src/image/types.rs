// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type-level builders on top of the [`MetadataImage`] arena.

use std::mem::{align_of, size_of};

use super::MetadataImage;
use crate::abi::flags::{
    ContextDescriptorFlags, ContextDescriptorKind, TypeContextDescriptorFlags, TypeReferenceKind,
};
use crate::bounds::{ClassMetadataBounds, StoredClassMetadataBounds};
use crate::config::{SWIFT_TYPE_METADATA_BIT, VALUE_GENERIC_ARGUMENTS_WORD, WORD_SIZE};
use crate::descriptor::{
    align4, ClassDescriptor, ContextDescriptor, GenericContextDescriptorHeader, GenericParamDescriptor,
    StructDescriptor, TypeGenericContextDescriptorHeader, VALUE_DESCRIPTOR_SIZE, VALUE_HEADER_SIZE,
};
use crate::error::ImageError;
use crate::field::{record_stride, FieldDescriptor, FieldDescriptorKind, FieldRecordFlags};
use crate::metadata::{Metadata, MetadataKind, MetadataRef};

/// Class flag: instances use Swift reference counting.
const CLASS_USES_SWIFT_REFCOUNTING: u32 = 0x2;

/// Natural record size, as the compiler emits it.
const RECORD_SIZE: u16 = 12;

// Byte offsets inside descriptors.
const CONTEXT_PARENT: usize = 4;
const TYPE_NAME: usize = 8;
const TYPE_ACCESS_FUNCTION: usize = 12;
const TYPE_FIELDS: usize = 16;
const STRUCT_NUM_FIELDS: usize = 20;
const STRUCT_FIELD_VECTOR: usize = 24;
const CLASS_SUPERCLASS_TYPE: usize = 20;
const CLASS_NEGATIVE_OR_BOUNDS: usize = 24;
const CLASS_POSITIVE_OR_EXTRA: usize = 28;
const CLASS_IMMEDIATE_MEMBERS: usize = 32;
const CLASS_NUM_FIELDS: usize = 36;
const CLASS_FIELD_VECTOR: usize = 40;

/// One stored field to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: Option<String>,
    pub type_name: Option<Vec<u8>>,
    pub flags: FieldRecordFlags,
    /// Byte offset within the instance.
    pub offset: usize,
}

impl FieldSpec {
    pub fn new(name: &str, type_name: &[u8], offset: usize) -> Self {
        Self {
            name: Some(name.to_owned()),
            type_name: Some(type_name.to_vec()),
            flags: FieldRecordFlags::default(),
            offset,
        }
    }

    /// A field whose record has no type name.
    pub fn untyped(name: &str, offset: usize) -> Self {
        Self {
            type_name: None,
            ..Self::new(name, b"", offset)
        }
    }

    /// A field whose record has no name.
    pub fn unnamed(type_name: &[u8], offset: usize) -> Self {
        Self {
            name: None,
            ..Self::new("", type_name, offset)
        }
    }

    pub fn var(mut self) -> Self {
        self.flags = FieldRecordFlags::from_bits(self.flags.bits() | FieldRecordFlags::IS_VAR);
        self
    }

    pub fn indirect_case(mut self) -> Self {
        self.flags =
            FieldRecordFlags::from_bits(self.flags.bits() | FieldRecordFlags::IS_INDIRECT_CASE);
        self
    }
}

/// How a descriptor names its enclosing context.
#[derive(Debug, Clone, Copy, Default)]
pub enum Parent {
    #[default]
    None,
    Direct(&'static ContextDescriptor),
    /// Through a pointer-sized slot, as for contexts in another image.
    Indirect(&'static ContextDescriptor),
}

/// Superclass reference of a class with a resilient superclass.
#[derive(Debug, Clone)]
pub enum SuperclassRef {
    /// No reference: the class is laid out after a Swift root class.
    Root,
    Direct(&'static ClassDescriptor),
    Indirect(&'static ClassDescriptor),
    /// Indirect reference whose weak-linked slot is null.
    IndirectMissing,
    /// Name of a foreign class, resolved through a lookup.
    ForeignName(String),
    /// Slot holding a foreign class object (possibly null).
    ForeignIndirect(Option<MetadataRef>),
    /// A reference kind no runtime understands (4..=7).
    UnknownKind(u8),
}

#[derive(Debug, Clone, Copy)]
pub struct StructType {
    pub metadata: MetadataRef,
    pub descriptor: &'static StructDescriptor,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassType {
    pub metadata: MetadataRef,
    /// Absent for artificial subclasses.
    pub descriptor: Option<&'static ClassDescriptor>,
    /// Layout the metadata object was built with.
    pub bounds: ClassMetadataBounds,
}

/// One element of a tuple type.
#[derive(Debug, Clone, Copy)]
pub struct TupleElementSpec<'a> {
    pub label: Option<&'a str>,
    pub ty: MetadataRef,
    pub offset: usize,
}

impl<'a> TupleElementSpec<'a> {
    pub fn new(label: Option<&'a str>, ty: MetadataRef, offset: usize) -> Self {
        Self { label, ty, offset }
    }
}

fn word_at(address_point: usize, index: isize) -> usize {
    address_point.wrapping_add_signed(index * WORD_SIZE as isize)
}

fn count_u32(what: &'static str, count: usize) -> Result<u32, ImageError> {
    u32::try_from(count).map_err(|_| ImageError::TooMany { what, count })
}

impl MetadataImage {
    /// A module context descriptor.
    pub fn module(&mut self, name: &str) -> Result<&'static ContextDescriptor, ImageError> {
        let name = self.c_string(name)?;
        let at = self.alloc(12, 4)?;
        let flags = ContextDescriptorFlags::new(
            ContextDescriptorKind::Module,
            false,
            true,
            TypeContextDescriptorFlags::default(),
        );
        self.put_u32(at, flags.bits())?;
        self.put_relative(at + TYPE_NAME, Some(name))?;
        // SAFETY: a complete module descriptor was written at `at`.
        Ok(unsafe { self.view(at) })
    }

    /// A standalone field descriptor.
    pub fn field_descriptor(
        &mut self,
        kind: FieldDescriptorKind,
        type_name: Option<&[u8]>,
        superclass: Option<&[u8]>,
        fields: &[FieldSpec],
        record_size: u16,
    ) -> Result<&'static FieldDescriptor, ImageError> {
        let at = self.write_field_descriptor(kind, type_name, superclass, fields, record_size)?;
        // SAFETY: a complete field descriptor was written at `at`.
        Ok(unsafe { self.view(at) })
    }

    pub fn struct_type(&mut self, name: &str) -> StructBuilder<'_> {
        StructBuilder {
            image: self,
            name: name.to_owned(),
            parent: Parent::None,
            fields: Vec::new(),
            generic_args: Vec::new(),
            field_descriptor: true,
        }
    }

    pub fn class_type(&mut self, name: &str) -> ClassBuilder<'_> {
        ClassBuilder {
            image: self,
            name: name.to_owned(),
            parent: Parent::None,
            superclass: None,
            resilient: None,
            fields: Vec::new(),
            generic_args: Vec::new(),
            generic_values: Vec::new(),
            negative_members: false,
            extra_members: 0,
            field_descriptor: true,
            description: true,
        }
    }

    /// A pure Objective-C class object: no Swift bit, no descriptor.
    pub fn objc_class(&mut self, superclass: Option<&ClassType>) -> Result<ClassType, ImageError> {
        // Any real address works as the ISA; it only has to sit above the
        // enumerated kind values.
        let isa = self.slot(0)?;
        let at = self.alloc(5 * WORD_SIZE, WORD_SIZE)?;
        self.put_usize(at, isa)?;
        self.put_usize(at + WORD_SIZE, superclass.map_or(0, |s| s.metadata.addr()))?;
        Ok(ClassType {
            // SAFETY: the class object was fully written.
            metadata: MetadataRef::from_static(unsafe { self.view::<Metadata>(at) }),
            descriptor: None,
            bounds: ClassMetadataBounds::for_swift_root_class(),
        })
    }

    /// Tuple metadata. Labels are emitted only when at least one element
    /// has one.
    pub fn tuple_type(&mut self, elements: &[TupleElementSpec<'_>]) -> Result<MetadataRef, ImageError> {
        let labels = if elements.iter().any(|e| e.label.is_some()) {
            let mut blob = String::new();
            for element in elements {
                let label = element.label.unwrap_or("");
                if label.contains(' ') {
                    return Err(ImageError::Unsupported("space in tuple label"));
                }
                blob.push_str(label);
                blob.push(' ');
            }
            Some(self.c_string(&blob)?)
        } else {
            None
        };

        // Value witness word, kind, count, labels, then {type, offset} pairs.
        let words = 4 + 2 * elements.len();
        let start = self.alloc(words * WORD_SIZE, WORD_SIZE)?;
        let metadata = start + WORD_SIZE;
        self.put_usize(metadata, MetadataKind::Tuple.to_raw())?;
        self.put_usize(word_at(metadata, 1), elements.len())?;
        self.put_usize(word_at(metadata, 2), labels.unwrap_or(0))?;
        for (index, element) in elements.iter().enumerate() {
            let slot = 3 + 2 * index as isize;
            self.put_usize(word_at(metadata, slot), element.ty.addr())?;
            self.put_usize(word_at(metadata, slot + 1), element.offset)?;
        }
        // SAFETY: the tuple metadata was fully written.
        Ok(MetadataRef::from_static(unsafe { self.view::<Metadata>(metadata) }))
    }

    /// Metadata carrying nothing but a kind tag and a null description.
    ///
    /// Kinds whose metadata views read past those words (classes, structs,
    /// tuples and foreign classes) are rejected; build them with their own
    /// builders.
    pub fn opaque_type(&mut self, kind: MetadataKind) -> Result<MetadataRef, ImageError> {
        // Raw values past the enumerated kinds decode as class ISA pointers.
        match MetadataKind::from_raw(kind.to_raw()) {
            MetadataKind::Class
            | MetadataKind::Struct
            | MetadataKind::Tuple
            | MetadataKind::ForeignClass => {
                return Err(ImageError::Unsupported("opaque metadata of a kind with a layout"))
            }
            _ => {}
        }
        let start = self.alloc(3 * WORD_SIZE, WORD_SIZE)?;
        let metadata = start + WORD_SIZE;
        self.put_usize(metadata, kind.to_raw())?;
        // SAFETY: the kind word was written.
        Ok(MetadataRef::from_static(unsafe { self.view::<Metadata>(metadata) }))
    }

    fn write_field_descriptor(
        &mut self,
        kind: FieldDescriptorKind,
        type_name: Option<&[u8]>,
        superclass: Option<&[u8]>,
        fields: &[FieldSpec],
        record_size: u16,
    ) -> Result<usize, ImageError> {
        let count = count_u32("fields", fields.len())?;
        let type_name = type_name.map(|name| self.bytes(name)).transpose()?;
        let superclass = superclass.map(|name| self.bytes(name)).transpose()?;

        let mut strings = Vec::with_capacity(fields.len());
        for field in fields {
            let ty = field.type_name.as_deref().map(|n| self.bytes(n)).transpose()?;
            let name = field.name.as_deref().map(|n| self.c_string(n)).transpose()?;
            strings.push((ty, name));
        }

        let stride = record_stride(record_size);
        let at = self.alloc(size_of::<FieldDescriptor>() + stride * fields.len(), 4)?;
        self.put_relative(at, type_name)?;
        self.put_relative(at + 4, superclass)?;
        self.put_u16(at + 8, kind.to_raw())?;
        self.put_u16(at + 10, record_size)?;
        self.put_u32(at + 12, count)?;
        for (index, (field, (ty, name))) in fields.iter().zip(strings).enumerate() {
            let record = at + size_of::<FieldDescriptor>() + index * stride;
            self.put_u32(record, field.flags.bits())?;
            self.put_relative(record + 4, ty)?;
            self.put_relative(record + 8, name)?;
        }
        Ok(at)
    }

    fn write_type_context(
        &mut self,
        at: usize,
        flags: ContextDescriptorFlags,
        parent: Parent,
        name: usize,
        fields: Option<usize>,
    ) -> Result<(), ImageError> {
        self.put_u32(at, flags.bits())?;
        match parent {
            Parent::None => self.put_relative(at + CONTEXT_PARENT, None)?,
            Parent::Direct(context) => {
                self.put_relative(at + CONTEXT_PARENT, Some(context.as_ptr() as usize))?
            }
            Parent::Indirect(context) => {
                let slot = self.slot(context.as_ptr() as usize)?;
                self.put_indirect_relative(at + CONTEXT_PARENT, slot)?;
            }
        }
        self.put_relative(at + TYPE_NAME, Some(name))?;
        self.put_relative(at + TYPE_ACCESS_FUNCTION, None)?;
        self.put_relative(at + TYPE_FIELDS, fields)
    }

    /// Header plus one key type parameter per type argument and one key
    /// value parameter per value; returns the bytes written.
    fn write_generic_context(
        &mut self,
        at: usize,
        type_params: usize,
        values: usize,
    ) -> Result<usize, ImageError> {
        let num_params = type_params + values;
        let count = u16::try_from(num_params).map_err(|_| ImageError::TooMany {
            what: "generic parameters",
            count: num_params,
        })?;
        // Instantiation cache and default pattern stay null.
        self.put_u16(at + 8, count)?;
        self.put_u16(at + 10, 0)?;
        self.put_u16(at + 12, count)?;
        self.put_u16(
            at + 14,
            GenericContextDescriptorHeader::flags_for(false, values > 0),
        )?;
        let params = at + size_of::<TypeGenericContextDescriptorHeader>();
        for index in 0..num_params {
            let param = if index < type_params {
                GenericParamDescriptor::KEY_TYPE
            } else {
                GenericParamDescriptor::KEY_VALUE
            };
            self.put_u8(params + index, param.bits())?;
        }
        let value_header = params + align4(num_params);
        if values > 0 {
            self.put_u32(value_header, count_u32("generic values", values)?)?;
            // Value descriptors stay zero, the `Int` value type.
        }
        Ok(generic_context_size(type_params, values))
    }

    fn superclass_target(
        &mut self,
        reference: &SuperclassRef,
    ) -> Result<(TypeReferenceKind, Option<usize>), ImageError> {
        Ok(match reference {
            SuperclassRef::Root => (TypeReferenceKind::DirectTypeDescriptor, None),
            SuperclassRef::Direct(descriptor) => (
                TypeReferenceKind::DirectTypeDescriptor,
                Some(descriptor.as_ptr() as usize),
            ),
            SuperclassRef::Indirect(descriptor) => (
                TypeReferenceKind::IndirectTypeDescriptor,
                Some(self.slot(descriptor.as_ptr() as usize)?),
            ),
            SuperclassRef::IndirectMissing => {
                (TypeReferenceKind::IndirectTypeDescriptor, Some(self.slot(0)?))
            }
            SuperclassRef::ForeignName(name) => {
                (TypeReferenceKind::DirectObjCClassName, Some(self.c_string(name)?))
            }
            SuperclassRef::ForeignIndirect(class) => (
                TypeReferenceKind::IndirectObjCClass,
                Some(self.slot(class.map_or(0, MetadataRef::addr))?),
            ),
            SuperclassRef::UnknownKind(kind) => {
                (TypeReferenceKind::Unknown(*kind), Some(self.slot(0)?))
            }
        })
    }
}

/// Builds a struct descriptor with its field descriptor and metadata.
pub struct StructBuilder<'i> {
    image: &'i mut MetadataImage,
    name: String,
    parent: Parent,
    fields: Vec<FieldSpec>,
    generic_args: Vec<MetadataRef>,
    field_descriptor: bool,
}

impl StructBuilder<'_> {
    pub fn parent(mut self, parent: Parent) -> Self {
        self.parent = parent;
        self
    }

    pub fn field(self, name: &str, type_name: &[u8], offset: usize) -> Self {
        self.field_spec(FieldSpec::new(name, type_name, offset))
    }

    pub fn field_spec(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Make the type generic, instantiated with `args`.
    pub fn generic_args(mut self, args: &[MetadataRef]) -> Self {
        self.generic_args = args.to_vec();
        self
    }

    /// Leave the descriptor's field descriptor pointer null.
    pub fn without_field_descriptor(mut self) -> Self {
        self.field_descriptor = false;
        self
    }

    pub fn build(self) -> Result<StructType, ImageError> {
        let Self {
            image,
            name,
            parent,
            fields,
            generic_args,
            field_descriptor,
        } = self;
        let generic = !generic_args.is_empty();
        let num_fields = count_u32("fields", fields.len())?;

        let name_address = image.c_string(&name)?;
        let fields_address = if field_descriptor {
            Some(image.write_field_descriptor(
                FieldDescriptorKind::Struct,
                Some(name.as_bytes()),
                None,
                &fields,
                RECORD_SIZE,
            )?)
        } else {
            None
        };

        let generic_size = if generic {
            generic_context_size(generic_args.len(), 0)
        } else {
            0
        };
        let descriptor = image.alloc(size_of::<StructDescriptor>() + generic_size, 4)?;
        let flags = ContextDescriptorFlags::new(
            ContextDescriptorKind::Struct,
            generic,
            true,
            TypeContextDescriptorFlags::default(),
        );
        image.write_type_context(descriptor, flags, parent, name_address, fields_address)?;

        let vector_word = VALUE_GENERIC_ARGUMENTS_WORD + generic_args.len();
        image.put_u32(descriptor + STRUCT_NUM_FIELDS, num_fields)?;
        let stored_vector = if fields.is_empty() { 0 } else { count_u32("words", vector_word)? };
        image.put_u32(descriptor + STRUCT_FIELD_VECTOR, stored_vector)?;
        if generic {
            image.write_generic_context(
                descriptor + size_of::<StructDescriptor>(),
                generic_args.len(),
                0,
            )?;
        }

        // Value witness word, then kind, description, arguments and offsets.
        let offset_words = (fields.len() * size_of::<u32>()).div_ceil(WORD_SIZE);
        let start = image.alloc((1 + vector_word + offset_words) * WORD_SIZE, WORD_SIZE)?;
        let metadata = start + WORD_SIZE;
        image.put_usize(metadata, MetadataKind::Struct.to_raw())?;
        image.put_usize(word_at(metadata, 1), descriptor)?;
        for (index, arg) in generic_args.iter().enumerate() {
            let word = (VALUE_GENERIC_ARGUMENTS_WORD + index) as isize;
            image.put_usize(word_at(metadata, word), arg.addr())?;
        }
        let vector = word_at(metadata, vector_word as isize);
        for (index, field) in fields.iter().enumerate() {
            let offset = count_u32("field offset bytes", field.offset)?;
            image.put_u32(vector + index * size_of::<u32>(), offset)?;
        }

        // SAFETY: descriptor and metadata were fully written.
        unsafe {
            Ok(StructType {
                metadata: MetadataRef::from_static(image.view::<Metadata>(metadata)),
                descriptor: image.view(descriptor),
            })
        }
    }
}

/// Builds a class descriptor with its field descriptor and metadata object.
///
/// The metadata object is laid out from the superclass's bounds exactly as
/// the runtime would: own members (generic arguments, field offsets, then
/// any extra members) start at the immediate-members offset.
pub struct ClassBuilder<'i> {
    image: &'i mut MetadataImage,
    name: String,
    parent: Parent,
    superclass: Option<ClassType>,
    resilient: Option<SuperclassRef>,
    fields: Vec<FieldSpec>,
    generic_args: Vec<MetadataRef>,
    generic_values: Vec<usize>,
    negative_members: bool,
    extra_members: u32,
    field_descriptor: bool,
    description: bool,
}

impl ClassBuilder<'_> {
    pub fn parent(mut self, parent: Parent) -> Self {
        self.parent = parent;
        self
    }

    /// Metadata superclass; also fixes where this class's members start.
    pub fn superclass(mut self, superclass: &ClassType) -> Self {
        self.superclass = Some(*superclass);
        self
    }

    /// Mark the superclass resilient, referenced through `reference`.
    pub fn resilient_superclass(mut self, reference: SuperclassRef) -> Self {
        self.resilient = Some(reference);
        self
    }

    pub fn field(self, name: &str, type_name: &[u8], offset: usize) -> Self {
        self.field_spec(FieldSpec::new(name, type_name, offset))
    }

    pub fn field_spec(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn generic_args(mut self, args: &[MetadataRef]) -> Self {
        self.generic_args = args.to_vec();
        self
    }

    /// Add value generic parameters (`<let N: Int>`) after the type
    /// parameters, instantiated with `values`.
    pub fn generic_values(mut self, values: &[usize]) -> Self {
        self.generic_values = values.to_vec();
        self
    }

    /// Place immediate members before the address point.
    pub fn negative_members(mut self) -> Self {
        self.negative_members = true;
        self
    }

    /// Additional immediate members after the field offsets (vtable
    /// entries and the like).
    pub fn extra_members(mut self, count: u32) -> Self {
        self.extra_members = count;
        self
    }

    pub fn without_field_descriptor(mut self) -> Self {
        self.field_descriptor = false;
        self
    }

    /// Emit metadata with a null description, as for artificial subclasses.
    pub fn without_description(mut self) -> Self {
        self.description = false;
        self
    }

    pub fn build(self) -> Result<ClassType, ImageError> {
        let Self {
            image,
            name,
            parent,
            superclass,
            resilient,
            fields,
            generic_args,
            generic_values,
            negative_members,
            extra_members,
            field_descriptor,
            description,
        } = self;
        if let Some(reference) = &resilient {
            check_resilient_superclass(superclass.as_ref(), reference)?;
        }
        let generic = !generic_args.is_empty() || !generic_values.is_empty();
        let num_args = generic_args.len() + generic_values.len();
        let num_fields = count_u32("fields", fields.len())?;
        let members = count_u32("immediate members", num_args + fields.len())?
            .checked_add(extra_members)
            .ok_or(ImageError::TooMany {
                what: "immediate members",
                count: usize::MAX,
            })?;

        let mut bounds = superclass
            .map_or_else(ClassMetadataBounds::for_swift_root_class, |s| s.bounds);
        bounds.adjust_for_subclass(negative_members, members);
        let members_word = bounds.immediate_members_offset / WORD_SIZE as isize;
        let vector_word = members_word + num_args as isize;
        let stored_vector = if resilient.is_some() {
            count_u32("generic arguments", num_args)?
        } else if fields.is_empty() {
            0
        } else {
            u32::try_from(vector_word)
                .map_err(|_| ImageError::Unsupported("field offset vector before the address point"))?
        };

        let name_address = image.c_string(&name)?;
        let superclass_name = superclass
            .and_then(|s| s.descriptor)
            .map(|d| d.name().to_vec());
        let superclass_type = superclass_name
            .as_deref()
            .map(|n| image.bytes(n))
            .transpose()?;
        let fields_address = if field_descriptor {
            Some(image.write_field_descriptor(
                FieldDescriptorKind::Class,
                Some(name.as_bytes()),
                superclass_name.as_deref(),
                &fields,
                RECORD_SIZE,
            )?)
        } else {
            None
        };
        let stored_bounds = match resilient {
            Some(_) => Some(image.alloc(
                size_of::<StoredClassMetadataBounds>(),
                align_of::<StoredClassMetadataBounds>(),
            )?),
            None => None,
        };
        let reference = match &resilient {
            Some(reference) => Some(image.superclass_target(reference)?),
            None => None,
        };

        let generic_size = if generic {
            generic_context_size(generic_args.len(), generic_values.len())
        } else {
            0
        };
        let reference_size = if reference.is_some() { size_of::<i32>() } else { 0 };
        let descriptor = image.alloc(size_of::<ClassDescriptor>() + generic_size + reference_size, 4)?;

        let mut type_flags =
            TypeContextDescriptorFlags::default().with_immediate_members_negative(negative_members);
        if let Some((kind, _)) = reference {
            type_flags = type_flags.with_resilient_superclass(kind);
        }
        let flags = ContextDescriptorFlags::new(ContextDescriptorKind::Class, generic, true, type_flags);
        image.write_type_context(descriptor, flags, parent, name_address, fields_address)?;
        image.put_relative(descriptor + CLASS_SUPERCLASS_TYPE, superclass_type)?;
        match stored_bounds {
            Some(cell) => {
                image.put_relative(descriptor + CLASS_NEGATIVE_OR_BOUNDS, Some(cell))?;
                image.put_u32(descriptor + CLASS_POSITIVE_OR_EXTRA, 0)?;
            }
            None => {
                image.put_u32(descriptor + CLASS_NEGATIVE_OR_BOUNDS, bounds.negative_size_in_words)?;
                image.put_u32(descriptor + CLASS_POSITIVE_OR_EXTRA, bounds.positive_size_in_words)?;
            }
        }
        image.put_u32(descriptor + CLASS_IMMEDIATE_MEMBERS, members)?;
        image.put_u32(descriptor + CLASS_NUM_FIELDS, num_fields)?;
        image.put_u32(descriptor + CLASS_FIELD_VECTOR, stored_vector)?;
        let mut trailing = descriptor + size_of::<ClassDescriptor>();
        if generic {
            trailing +=
                image.write_generic_context(trailing, generic_args.len(), generic_values.len())?;
        }
        if let Some((_, target)) = reference {
            image.put_relative(trailing, target)?;
        }

        let total = bounds.total_size_in_words() as usize * WORD_SIZE;
        let start = image.alloc(total, WORD_SIZE)?;
        let address_point = start + bounds.address_point();
        let instance_size = fields
            .iter()
            .map(|f| f.offset + WORD_SIZE)
            .max()
            .unwrap_or(2 * WORD_SIZE);

        // Destroy and value witness words stay null; kind 0 marks a Swift
        // class on platforms without Objective-C interop.
        image.put_usize(address_point, 0)?;
        image.put_usize(word_at(address_point, 1), superclass.map_or(0, |s| s.metadata.addr()))?;
        image.put_usize(word_at(address_point, 4), SWIFT_TYPE_METADATA_BIT)?;
        let class_fields = word_at(address_point, 5);
        image.put_u32(class_fields, CLASS_USES_SWIFT_REFCOUNTING)?;
        image.put_u32(class_fields + 8, count_u32("instance bytes", instance_size)?)?;
        image.put_u16(class_fields + 12, (WORD_SIZE - 1) as u16)?;
        image.put_u32(class_fields + 16, count_u32("metadata bytes", total)?)?;
        image.put_u32(class_fields + 20, count_u32("metadata bytes", bounds.address_point())?)?;
        if description {
            image.put_usize(class_fields + 24, descriptor)?;
        }
        let arguments = generic_args.iter().map(|arg| arg.addr()).chain(generic_values.iter().copied());
        for (index, word) in arguments.enumerate() {
            image.put_usize(word_at(address_point, members_word + index as isize), word)?;
        }
        for (index, field) in fields.iter().enumerate() {
            image.put_usize(word_at(address_point, vector_word + index as isize), field.offset)?;
        }

        // SAFETY: descriptor and metadata were fully written.
        unsafe {
            Ok(ClassType {
                metadata: MetadataRef::from_static(image.view::<Metadata>(address_point)),
                descriptor: description.then(|| image.view::<ClassDescriptor>(descriptor)),
                bounds,
            })
        }
    }
}

fn generic_context_size(type_params: usize, values: usize) -> usize {
    let mut size = size_of::<TypeGenericContextDescriptorHeader>() + align4(type_params + values);
    if values > 0 {
        size += VALUE_HEADER_SIZE + values * VALUE_DESCRIPTOR_SIZE;
    }
    size
}

/// A resilient superclass reference must describe the same bounds the
/// metadata was laid out from.
fn check_resilient_superclass(
    superclass: Option<&ClassType>,
    reference: &SuperclassRef,
) -> Result<(), ImageError> {
    let consistent = match reference {
        SuperclassRef::Direct(target) | SuperclassRef::Indirect(target) => superclass
            .and_then(|s| s.descriptor)
            .is_some_and(|descriptor| std::ptr::eq(descriptor, *target)),
        SuperclassRef::ForeignIndirect(Some(target)) => {
            superclass.is_some_and(|s| s.metadata == *target)
        }
        // Everything else resolves to root class bounds, or never resolves.
        SuperclassRef::Root
        | SuperclassRef::IndirectMissing
        | SuperclassRef::ForeignName(_)
        | SuperclassRef::ForeignIndirect(None)
        | SuperclassRef::UnknownKind(_) => superclass
            .map_or(true, |s| s.bounds == ClassMetadataBounds::for_swift_root_class()),
    };
    if consistent {
        Ok(())
    } else {
        Err(ImageError::Unsupported(
            "resilient superclass reference disagrees with the metadata superclass",
        ))
    }
}
