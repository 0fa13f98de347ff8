// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # swift-reflect - field reflection over Swift type metadata
//!
//! Enumerates the stored fields (name, byte offset, field type) of Swift
//! classes, structs and tuples by reading the binary metadata records the
//! Swift compiler emits, without any cooperation from the described type.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swift_reflect::{resolver_fn, FieldEnumerator, MetadataRef};
//!
//! # fn demo(metadata: MetadataRef) {
//! let resolver = resolver_fn(|_name, _context, _generic_args| None);
//! let enumerator = FieldEnumerator::new(&resolver).allow_resilient_superclasses(true);
//!
//! let complete = enumerator.enumerate(metadata, |name, offset, ty| {
//!     println!("{} @ {} ({:?})", String::from_utf8_lossy(name), offset, ty);
//!     true
//! });
//! assert!(complete);
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |  enumerate   class chain / struct / tuple walk, caller callback     |
//! +---------------------------------------------------------------------+
//! |  bounds      resilient class metadata bounds, publish-once cache    |
//! +---------------------------------------------------------------------+
//! |  field       field descriptor header + trailing field records       |
//! +---------------------------------------------------------------------+
//! |  descriptor / metadata   #[repr(C)] mirrors of the ABI records      |
//! +---------------------------------------------------------------------+
//! |  abi         relative pointers, symbolic names, flag words          |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Safety model
//!
//! Metadata is process-owned and immutable for the lifetime of the process.
//! The only `unsafe` entry points are the ones that turn a raw address into a
//! [`MetadataRef`] (or call [`enumerate_fields`] with one); everything reachable
//! from a valid `MetadataRef` is then read through safe accessors.

pub mod abi;
pub mod bounds;
/// Runtime configuration and ABI-wide constants.
pub mod config;
pub mod descriptor;
pub mod enumerate;
/// Error types shared across the crate.
pub mod error;
pub mod field;
pub mod image;
pub mod metadata;

pub use abi::mangled::MangledName;
pub use bounds::{ClassMetadataBounds, ForeignClassLookup, NoForeignClasses};
pub use config::ReflectConfig;
pub use enumerate::{
    enumerate_fields, resolver_fn, FieldEnumerator, FieldInfo, FnResolver, TypeResolver, TypeTable,
};
pub use error::{ImageError, LinkageError};
pub use metadata::{GenericArguments, MetadataKind, MetadataRef};
