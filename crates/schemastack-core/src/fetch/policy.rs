//! Guardrails for remote document retrieval
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// A policy field holds a value that can never be satisfied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid fetch policy '{field}': {reason}")]
pub struct PolicyError {
    pub field: &'static str,
    pub reason: String,
}

impl PolicyError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Limits applied to every remote document a compilation pulls in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchPolicy {
    /// URI schemes that may be fetched at all (lower-case)
    pub allowed_schemes: BTreeSet<String>,
    /// Largest single document, in bytes
    pub max_document_bytes: u64,
    /// Largest sum of all fetched documents in one compilation
    pub max_total_bytes: u64,
    /// Longest a single fetch may take
    pub timeout: Duration,
    /// Redirects followed before giving up
    pub max_redirects: usize,
    /// Distinct remote documents per compilation
    pub max_documents: usize,
    /// Segments allowed in a JSON Pointer being navigated
    pub max_depth: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            allowed_schemes: ["http", "https", "file"].into_iter().map(String::from).collect(),
            max_document_bytes: 1024 * 1024,
            max_total_bytes: 8 * 1024 * 1024,
            timeout: Duration::from_secs(5),
            max_redirects: 3,
            max_documents: 64,
            max_depth: 64,
        }
    }
}

impl FetchPolicy {
    /// Policy with the default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the scheme allow-list
    pub fn with_allowed_schemes<I, S>(mut self, schemes: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_schemes = schemes
            .into_iter()
            .map(|s| s.into().to_ascii_lowercase())
            .collect();
        self.validate()?;
        Ok(self)
    }

    /// Replace the per-document byte cap
    pub fn with_max_document_bytes(mut self, bytes: u64) -> Result<Self, PolicyError> {
        self.max_document_bytes = bytes;
        self.validate()?;
        Ok(self)
    }

    /// Replace the cumulative byte cap
    pub fn with_max_total_bytes(mut self, bytes: u64) -> Result<Self, PolicyError> {
        self.max_total_bytes = bytes;
        self.validate()?;
        Ok(self)
    }

    /// Replace the per-fetch timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, PolicyError> {
        self.timeout = timeout;
        self.validate()?;
        Ok(self)
    }

    /// Replace the redirect limit
    pub fn with_max_redirects(mut self, redirects: usize) -> Self {
        self.max_redirects = redirects;
        self
    }

    /// Replace the document-count cap
    pub fn with_max_documents(mut self, documents: usize) -> Result<Self, PolicyError> {
        self.max_documents = documents;
        self.validate()?;
        Ok(self)
    }

    /// Replace the pointer-navigation depth limit
    pub fn with_max_depth(mut self, depth: usize) -> Result<Self, PolicyError> {
        self.max_depth = depth;
        self.validate()?;
        Ok(self)
    }

    /// True when `scheme` may be fetched
    pub fn allows_scheme(&self, scheme: &str) -> bool {
        self.allowed_schemes.contains(&scheme.to_ascii_lowercase())
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.allowed_schemes.is_empty() {
            return Err(PolicyError::new("allowed_schemes", "at least one scheme is required"));
        }
        if self.max_document_bytes == 0 {
            return Err(PolicyError::new("max_document_bytes", "must be positive"));
        }
        if self.max_total_bytes == 0 {
            return Err(PolicyError::new("max_total_bytes", "must be positive"));
        }
        if self.timeout.is_zero() {
            return Err(PolicyError::new("timeout", "must be positive"));
        }
        if self.max_documents == 0 {
            return Err(PolicyError::new("max_documents", "must be positive"));
        }
        if self.max_depth == 0 {
            return Err(PolicyError::new("max_depth", "must be positive"));
        }
        Ok(())
    }
}
