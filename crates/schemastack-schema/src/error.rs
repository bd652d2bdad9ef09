//! Compile-time error types
//!
//! Every failure here is fatal to the `compile` call. Validation never
//! produces these; instance mismatches are reported as
//! [`ValidationError`](crate::validation::ValidationError)s instead.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use schemastack_core::fetch::PolicyError;
use schemastack_core::{RemoteReason, RemoteResolutionError, UriError};
use thiserror::Error;

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Which kind of reference chain looped back on itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// `$ref` aliases inside one document
    Local,
    /// Documents pulling each other in through remote `$ref`s
    Remote,
}

/// Errors raised while compiling a schema
#[derive(Error, Debug)]
pub enum CompileError {
    /// A `$ref` is empty or its fragment is not a well-formed JSON Pointer
    #[error("Invalid pointer '{reference}': {reason}")]
    InvalidPointer { reference: String, reason: String },

    /// A `$ref` names a location that does not exist
    #[error("Unresolved $ref '{reference}' in {document}: {reason}")]
    UnresolvedRef {
        reference: String,
        document: String,
        reason: String,
    },

    /// A reference chain revisits one of its own members
    #[error("Cyclic $ref ({kind:?}): {}", .chain.join(" -> "))]
    Cycle { kind: CycleKind, chain: Vec<String> },

    /// A remote document could not be fetched or navigated
    #[error(transparent)]
    Remote(#[from] RemoteResolutionError),

    /// A keyword value has the wrong shape
    #[error("Invalid '{keyword}' at {pointer}: {reason}")]
    InvalidKeyword {
        pointer: String,
        keyword: String,
        reason: String,
    },

    /// A schema position holds something other than an object or boolean
    #[error("Invalid schema at {pointer}: {reason}")]
    InvalidSchema { pointer: String, reason: String },

    /// A JSON Pointer has more segments than the fetch policy allows
    #[error("Pointer '{pointer}' exceeds the maximum depth of {max} segments")]
    PointerDepthExceeded { pointer: String, max: usize },

    /// The fetch policy cannot be satisfied
    #[error(transparent)]
    InvalidPolicy(#[from] PolicyError),

    /// The configured base URI is unusable
    #[error(transparent)]
    InvalidUri(#[from] UriError),

    /// A document was compiled twice into one registry
    #[error("Document '{uri}' is already registered")]
    DuplicateDocument { uri: String },
}

impl CompileError {
    /// Create an invalid pointer error
    pub fn invalid_pointer(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPointer {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Create an unresolved reference error
    pub fn unresolved(
        reference: impl Into<String>,
        document: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnresolvedRef {
            reference: reference.into(),
            document: document.into(),
            reason: reason.into(),
        }
    }

    /// Create a local alias cycle error
    pub fn local_cycle(chain: Vec<String>) -> Self {
        Self::Cycle {
            kind: CycleKind::Local,
            chain,
        }
    }

    /// Create a cross-document cycle error
    pub fn remote_cycle(chain: Vec<String>) -> Self {
        Self::Cycle {
            kind: CycleKind::Remote,
            chain,
        }
    }

    /// Create an invalid keyword error
    pub fn invalid_keyword(
        pointer: impl Into<String>,
        keyword: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidKeyword {
            pointer: pointer.into(),
            keyword: keyword.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid schema error
    pub fn invalid_schema(pointer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            pointer: pointer.into(),
            reason: reason.into(),
        }
    }

    /// True for either kind of reference cycle
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }

    /// The chain of a cycle error
    pub fn cycle_chain(&self) -> Option<&[String]> {
        match self {
            Self::Cycle { chain, .. } => Some(chain),
            _ => None,
        }
    }

    /// The remote failure reason, for remote resolution errors
    pub fn remote_reason(&self) -> Option<RemoteReason> {
        match self {
            Self::Remote(err) => Some(err.reason()),
            _ => None,
        }
    }
}
