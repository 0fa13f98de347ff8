// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! swift-reflect configuration - ABI constants and runtime toggles
//!
//! - **Level 1 (Static)**: layout constants of the Swift metadata ABI
//! - **Level 2 (Dynamic)**: [`ReflectConfig`], enumeration policy
//!
//! # Example
//!
//! ```
//! use swift_reflect::config::{ReflectConfig, WORD_SIZE};
//!
//! assert_eq!(WORD_SIZE, std::mem::size_of::<usize>());
//! let config = ReflectConfig::default().with_resilient_superclasses(true);
//! assert!(config.allow_resilient_superclasses);
//! ```

use std::mem::size_of;

// =======================================================================
// Metadata layout
// =======================================================================

/// Size of one metadata word in bytes.
pub const WORD_SIZE: usize = size_of::<usize>();

/// Words in front of the class metadata address point (destroy function
/// and value witness table).
pub const CLASS_METADATA_HEADER_WORDS: u32 = 2;

/// Bit of the class `data` word set for Swift type metadata.
///
/// Clear for pure Objective-C classes, whose metadata ends after the
/// `data` word.
pub const SWIFT_TYPE_METADATA_BIT: usize = 0x2;

/// Raw kind values above this are an ISA pointer, i.e. a class.
pub const LAST_ENUMERATED_METADATA_KIND: usize = 0x7FF;

/// Word index of the generic argument vector in struct and enum metadata.
pub const VALUE_GENERIC_ARGUMENTS_WORD: usize = 2;

/// Natural size of one field record (flags, type name, field name).
pub const FIELD_RECORD_SIZE: usize = 12;

// =======================================================================
// Runtime policy
// =======================================================================

/// Environment variable read by [`ReflectConfig::from_env`].
pub const ALLOW_RESILIENT_ENV: &str = "SWIFT_REFLECT_ALLOW_RESILIENT";

/// Enumeration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReflectConfig {
    /// Walk classes whose superclass layout is only known at runtime.
    ///
    /// Off by default: such layouts may change under the caller without a
    /// recompile.
    pub allow_resilient_superclasses: bool,
}

impl ReflectConfig {
    pub const fn new() -> Self {
        Self {
            allow_resilient_superclasses: false,
        }
    }

    /// Defaults overridden by `SWIFT_REFLECT_ALLOW_RESILIENT`.
    pub fn from_env() -> Self {
        let allow = std::env::var(ALLOW_RESILIENT_ENV)
            .ok()
            .is_some_and(|value| parse_flag(&value));
        Self {
            allow_resilient_superclasses: allow,
        }
    }

    pub const fn with_resilient_superclasses(mut self, allow: bool) -> Self {
        self.allow_resilient_superclasses = allow;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
