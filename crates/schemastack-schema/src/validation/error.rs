//! Validation error types
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Broad category of a validation failure.
///
/// Used by `oneOf` to tell a plain type mismatch apart from a more specific
/// failure when choosing which branch's errors to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Instance has the wrong JSON type
    Type,
    /// A required or dependent-required property is missing
    Required,
    /// Object forbids a property or dependent schema
    Property,
    /// A count bound (properties, items, length, contains) failed
    Count,
    /// Array elements repeat
    Unique,
    /// String does not match `pattern`
    Pattern,
    /// String does not match `format`
    Format,
    /// Number outside `minimum`/`maximum`
    Range,
    /// Number is not a multiple of `multipleOf`
    MultipleOf,
    /// `not`, `false` or a failed `const`/`enum`
    Mismatch,
    /// `oneOf` matched more than one branch
    Ambiguous,
    /// A `$ref` could not be resolved at validation time
    Reference,
}

/// A single failure at one instance location
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub struct ValidationError {
    /// Instance path: `""` for the root, `a.b` for properties, `a[0]` for items
    pub path: String,
    /// Human-readable message
    pub message: String,
    /// Failure category
    pub kind: ErrorKind,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "Validation error at root: {}", self.message)
        } else {
            write!(f, "Validation error at '{}': {}", self.path, self.message)
        }
    }
}

impl ValidationError {
    /// Create a new validation error
    pub fn new<P, M>(path: P, kind: ErrorKind, message: M) -> Self
    where
        P: Into<String>,
        M: Into<String>,
    {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// True for a plain type mismatch
    pub fn is_type_mismatch(&self) -> bool {
        self.kind == ErrorKind::Type
    }
}

/// All failures of one validation, as an error value
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub struct ValidationErrors {
    /// The collected errors, in report order
    pub errors: Vec<ValidationError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s):", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            write!(f, "\n{}. {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl ValidationErrors {
    /// Number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when there are no errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over the errors
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }
}

/// Outcome of validating one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when no errors were found
    pub valid: bool,
    /// Every failure found, in report order
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// A passing result
    pub fn success() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Result from collected errors; valid when there are none
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// True when validation passed
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Errors reported at exactly `path`
    pub fn errors_at<'r>(&'r self, path: &'r str) -> impl Iterator<Item = &'r ValidationError> + 'r {
        self.errors.iter().filter(move |e| e.path == path)
    }

    /// Convert into a `Result`
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.valid {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: self.errors,
            })
        }
    }
}
