// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Context descriptor flag words.
//!
//! ```text
//! ContextDescriptorFlags (u32)
//!   bits 0-4    kind
//!   bit  6      unique
//!   bit  7      generic
//!   bits 8-15   version
//!   bits 16-31  kind-specific (TypeContextDescriptorFlags for types)
//!
//! TypeContextDescriptorFlags (u16), class-specific bits
//!   bits 0-1    metadata initialization
//!   bit  2      has import info
//!   bits 9-11   resilient superclass reference kind
//!   bit  12     immediate members are negative
//!   bit  13     has resilient superclass
//!   bit  14     has override table
//!   bit  15     has vtable
//! ```

use std::fmt;

/// What kind of context a descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextDescriptorKind {
    Module,
    Extension,
    Anonymous,
    Protocol,
    OpaqueType,
    Class,
    Struct,
    Enum,
    /// Reserved or future kind.
    Unknown(u8),
}

impl ContextDescriptorKind {
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Module,
            1 => Self::Extension,
            2 => Self::Anonymous,
            3 => Self::Protocol,
            4 => Self::OpaqueType,
            16 => Self::Class,
            17 => Self::Struct,
            18 => Self::Enum,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_raw(self) -> u8 {
        match self {
            Self::Module => 0,
            Self::Extension => 1,
            Self::Anonymous => 2,
            Self::Protocol => 3,
            Self::OpaqueType => 4,
            Self::Class => 16,
            Self::Struct => 17,
            Self::Enum => 18,
            Self::Unknown(raw) => raw,
        }
    }

    /// Kinds 16..=31 describe nominal types.
    pub const fn is_type(self) -> bool {
        matches!(self.to_raw(), 16..=31)
    }
}

/// How a resilient class names its superclass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeReferenceKind {
    /// Relative pointer to the superclass descriptor.
    DirectTypeDescriptor,
    /// Relative pointer to a slot holding the superclass descriptor.
    IndirectTypeDescriptor,
    /// Relative pointer to a C string naming a foreign class.
    DirectObjCClassName,
    /// Relative pointer to a slot holding the foreign class object.
    IndirectObjCClass,
    Unknown(u8),
}

impl TypeReferenceKind {
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::DirectTypeDescriptor,
            1 => Self::IndirectTypeDescriptor,
            2 => Self::DirectObjCClassName,
            3 => Self::IndirectObjCClass,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_raw(self) -> u8 {
        match self {
            Self::DirectTypeDescriptor => 0,
            Self::IndirectTypeDescriptor => 1,
            Self::DirectObjCClassName => 2,
            Self::IndirectObjCClass => 3,
            Self::Unknown(raw) => raw,
        }
    }
}

/// How a type's metadata gets initialized at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataInitializationKind {
    None,
    Singleton,
    Foreign,
    Unknown(u8),
}

impl MetadataInitializationKind {
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::Singleton,
            2 => Self::Foreign,
            other => Self::Unknown(other),
        }
    }
}

/// Leading flag word of every context descriptor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ContextDescriptorFlags(u32);

impl ContextDescriptorFlags {
    const KIND_MASK: u32 = 0x1F;
    const UNIQUE: u32 = 0x40;
    const GENERIC: u32 = 0x80;

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Compose a flag word; used when synthesizing descriptors.
    pub const fn new(
        kind: ContextDescriptorKind,
        generic: bool,
        unique: bool,
        type_flags: TypeContextDescriptorFlags,
    ) -> Self {
        let mut bits = (kind.to_raw() as u32) & Self::KIND_MASK;
        if unique {
            bits |= Self::UNIQUE;
        }
        if generic {
            bits |= Self::GENERIC;
        }
        bits |= (type_flags.bits() as u32) << 16;
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn kind(self) -> ContextDescriptorKind {
        ContextDescriptorKind::from_raw((self.0 & Self::KIND_MASK) as u8)
    }

    pub const fn is_unique(self) -> bool {
        self.0 & Self::UNIQUE != 0
    }

    pub const fn is_generic(self) -> bool {
        self.0 & Self::GENERIC != 0
    }

    pub const fn version(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn kind_specific_flags(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Kind-specific bits interpreted as type flags.
    pub const fn type_flags(self) -> TypeContextDescriptorFlags {
        TypeContextDescriptorFlags(self.kind_specific_flags())
    }
}

impl fmt::Debug for ContextDescriptorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextDescriptorFlags")
            .field("kind", &self.kind())
            .field("unique", &self.is_unique())
            .field("generic", &self.is_generic())
            .field("version", &self.version())
            .field("type_flags", &self.type_flags())
            .finish()
    }
}

/// Kind-specific flags of class, struct and enum descriptors.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct TypeContextDescriptorFlags(u16);

impl TypeContextDescriptorFlags {
    const METADATA_INITIALIZATION_MASK: u16 = 0x3;
    const HAS_IMPORT_INFO: u16 = 1 << 2;
    const RESILIENT_SUPERCLASS_REF_SHIFT: u16 = 9;
    const RESILIENT_SUPERCLASS_REF_MASK: u16 = 0x7;
    const IMMEDIATE_MEMBERS_NEGATIVE: u16 = 1 << 12;
    const HAS_RESILIENT_SUPERCLASS: u16 = 1 << 13;
    const HAS_OVERRIDE_TABLE: u16 = 1 << 14;
    const HAS_VTABLE: u16 = 1 << 15;

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn metadata_initialization(self) -> MetadataInitializationKind {
        MetadataInitializationKind::from_raw((self.0 & Self::METADATA_INITIALIZATION_MASK) as u8)
    }

    pub const fn has_import_info(self) -> bool {
        self.0 & Self::HAS_IMPORT_INFO != 0
    }

    pub const fn class_has_vtable(self) -> bool {
        self.0 & Self::HAS_VTABLE != 0
    }

    pub const fn class_has_override_table(self) -> bool {
        self.0 & Self::HAS_OVERRIDE_TABLE != 0
    }

    pub const fn class_has_resilient_superclass(self) -> bool {
        self.0 & Self::HAS_RESILIENT_SUPERCLASS != 0
    }

    pub const fn class_are_immediate_members_negative(self) -> bool {
        self.0 & Self::IMMEDIATE_MEMBERS_NEGATIVE != 0
    }

    pub const fn class_resilient_superclass_reference_kind(self) -> TypeReferenceKind {
        TypeReferenceKind::from_raw(
            ((self.0 >> Self::RESILIENT_SUPERCLASS_REF_SHIFT) & Self::RESILIENT_SUPERCLASS_REF_MASK)
                as u8,
        )
    }

    pub const fn with_resilient_superclass(self, kind: TypeReferenceKind) -> Self {
        let cleared = self.0
            & !(Self::RESILIENT_SUPERCLASS_REF_MASK << Self::RESILIENT_SUPERCLASS_REF_SHIFT);
        let reference =
            ((kind.to_raw() as u16) & Self::RESILIENT_SUPERCLASS_REF_MASK) << Self::RESILIENT_SUPERCLASS_REF_SHIFT;
        Self(cleared | reference | Self::HAS_RESILIENT_SUPERCLASS)
    }

    pub const fn with_immediate_members_negative(self, negative: bool) -> Self {
        if negative {
            Self(self.0 | Self::IMMEDIATE_MEMBERS_NEGATIVE)
        } else {
            Self(self.0 & !Self::IMMEDIATE_MEMBERS_NEGATIVE)
        }
    }

    pub const fn with_vtable(self) -> Self {
        Self(self.0 | Self::HAS_VTABLE)
    }
}

impl fmt::Debug for TypeContextDescriptorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeContextDescriptorFlags({:#06x})", self.0)
    }
}
