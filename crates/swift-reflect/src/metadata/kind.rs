// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::config::LAST_ENUMERATED_METADATA_KIND;

const NON_TYPE: usize = 0x400;
const NON_HEAP: usize = 0x200;
const RUNTIME_PRIVATE: usize = 0x100;

/// Kind tag stored in the first word of every metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    /// Swift class metadata (raw 0) or any Objective-C ISA pointer.
    Class,
    Struct,
    Enum,
    Optional,
    ForeignClass,
    ForeignReferenceType,
    Opaque,
    Tuple,
    Function,
    Existential,
    Metatype,
    ObjCClassWrapper,
    ExistentialMetatype,
    ExtendedExistential,
    HeapLocalVariable,
    HeapGenericLocalVariable,
    ErrorObject,
    Task,
    Job,
    /// A kind this crate does not know about.
    Unknown(usize),
}

impl MetadataKind {
    pub const fn from_raw(raw: usize) -> Self {
        if raw > LAST_ENUMERATED_METADATA_KIND {
            return Self::Class;
        }
        match raw {
            0 => Self::Class,
            0x200 => Self::Struct,
            0x201 => Self::Enum,
            0x202 => Self::Optional,
            0x203 => Self::ForeignClass,
            0x204 => Self::ForeignReferenceType,
            0x300 => Self::Opaque,
            0x301 => Self::Tuple,
            0x302 => Self::Function,
            0x303 => Self::Existential,
            0x304 => Self::Metatype,
            0x305 => Self::ObjCClassWrapper,
            0x306 => Self::ExistentialMetatype,
            0x307 => Self::ExtendedExistential,
            0x400 => Self::HeapLocalVariable,
            0x500 => Self::HeapGenericLocalVariable,
            0x501 => Self::ErrorObject,
            0x502 => Self::Task,
            0x503 => Self::Job,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_raw(self) -> usize {
        match self {
            Self::Class => 0,
            Self::Struct => 0x200,
            Self::Enum => 0x201,
            Self::Optional => 0x202,
            Self::ForeignClass => 0x203,
            Self::ForeignReferenceType => 0x204,
            Self::Opaque => 0x300,
            Self::Tuple => 0x301,
            Self::Function => 0x302,
            Self::Existential => 0x303,
            Self::Metatype => 0x304,
            Self::ObjCClassWrapper => 0x305,
            Self::ExistentialMetatype => 0x306,
            Self::ExtendedExistential => 0x307,
            Self::HeapLocalVariable => 0x400,
            Self::HeapGenericLocalVariable => 0x500,
            Self::ErrorObject => 0x501,
            Self::Task => 0x502,
            Self::Job => 0x503,
            Self::Unknown(raw) => raw,
        }
    }

    /// Kinds that describe a type, as opposed to runtime-internal heap
    /// objects.
    pub const fn is_type(self) -> bool {
        self.to_raw() & NON_TYPE == 0
    }

    /// Value types: structs, enums, optionals and the foreign kinds sharing
    /// the non-heap bit.
    pub const fn is_value(self) -> bool {
        let raw = self.to_raw();
        raw & NON_HEAP != 0 && raw & RUNTIME_PRIVATE == 0 && raw & NON_TYPE == 0
    }

    /// Kinds whose metadata carries a nominal type descriptor.
    pub const fn has_type_descriptor(self) -> bool {
        matches!(
            self,
            Self::Class | Self::Struct | Self::Enum | Self::Optional | Self::ForeignClass
        )
    }
}
