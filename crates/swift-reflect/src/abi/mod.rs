// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Low-level ABI building blocks shared by every metadata record.
//!
//! - [`relative`]: 32-bit self-relative pointers (direct and indirectable)
//! - [`mangled`]: length scanning of mangled names with symbolic references
//! - [`flags`]: context descriptor flag words and reference kinds

pub mod flags;
pub mod mangled;
pub mod relative;

pub use flags::{ContextDescriptorFlags, ContextDescriptorKind, TypeContextDescriptorFlags};
pub use flags::{MetadataInitializationKind, TypeReferenceKind};
pub use mangled::MangledName;
pub use relative::{RelativeDirectPointer, RelativeIndirectablePointer};
