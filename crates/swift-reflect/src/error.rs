// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;

/// ABI linkage faults found while computing class metadata bounds.
///
/// These are not recoverable: the metadata in the process is inconsistent
/// with what the compiler promised. [`crate::bounds`] aborts on them unless
/// the caller asked for the fallible entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkageError {
    /// A weak-linked superclass descriptor resolved to null.
    MissingWeakAncestor {
        /// Name of the class whose ancestor is missing.
        class: String,
    },
    /// The superclass reference sits behind generic context records that
    /// cannot be decoded.
    UnreadableSuperclassReference {
        class: String,
    },
}

impl fmt::Display for LinkageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingWeakAncestor { class } => write!(
                f,
                "instantiating class metadata for class {} with missing weak-linked ancestor",
                class
            ),
            Self::UnreadableSuperclassReference { class } => write!(
                f,
                "cannot locate the superclass reference of class {}",
                class
            ),
        }
    }
}

impl std::error::Error for LinkageError {}

/// Errors while synthesizing a metadata image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// A relative reference does not fit in 32 bits.
    OffsetOutOfRange { from: usize, to: usize },
    /// Allocation of the backing arena failed or overflowed.
    Allocation { bytes: usize },
    /// A count exceeds what its on-disk field can hold.
    TooMany { what: &'static str, count: usize },
    /// A string meant for a C string holds an interior NUL.
    InteriorNul(String),
    /// A write fell outside the image.
    OutOfBounds { address: usize },
    /// The requested layout cannot be expressed in metadata.
    Unsupported(&'static str),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OffsetOutOfRange { from, to } => write!(
                f,
                "relative reference from {:#x} to {:#x} does not fit in 32 bits",
                from, to
            ),
            Self::Allocation { bytes } => write!(f, "cannot allocate {} bytes of metadata", bytes),
            Self::TooMany { what, count } => write!(f, "too many {}: {}", what, count),
            Self::InteriorNul(s) => write!(f, "string contains interior NUL: {:?}", s),
            Self::OutOfBounds { address } => {
                write!(f, "write at {:#x} falls outside the image", address)
            }
            Self::Unsupported(what) => write!(f, "unsupported layout: {}", what),
        }
    }
}

impl std::error::Error for ImageError {}
