//! Typed failures for remote document resolution
//!
//! Every way a remote `$ref` target can fail to materialize maps onto one of
//! six reasons. Transports keep their underlying cause as the error source.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for fetch and remote resolution operations
pub type RemoteResult<T> = Result<T, RemoteResolutionError>;

/// Why a remote document could not be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteReason {
    /// Transport or IO failure
    NetworkError,
    /// Rejected by the fetch policy before or after fetching
    PolicyDenied,
    /// The document does not exist (missing file, non-2xx response)
    NotFound,
    /// The document exists but the fragment does not resolve inside it
    PointerMissing,
    /// The document exceeded the per-document byte cap
    PayloadTooLarge,
    /// The fetch took longer than the policy allows
    Timeout,
}

impl RemoteReason {
    /// Stable upper-snake name used in messages and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteReason::NetworkError => "NETWORK_ERROR",
            RemoteReason::PolicyDenied => "POLICY_DENIED",
            RemoteReason::NotFound => "NOT_FOUND",
            RemoteReason::PointerMissing => "POINTER_MISSING",
            RemoteReason::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            RemoteReason::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for RemoteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote document failed to resolve
#[derive(Error, Debug)]
#[error("{reason}: {message} (uri: {uri})")]
pub struct RemoteResolutionError {
    /// Classified failure reason
    pub reason: RemoteReason,
    /// The URI that was being resolved, fragment included when relevant
    pub uri: String,
    /// Human-readable detail
    pub message: String,
    /// Underlying transport or IO error
    #[source]
    pub source: Option<anyhow::Error>,
}

impl RemoteResolutionError {
    /// Create an error with no underlying cause
    pub fn new<U, M>(reason: RemoteReason, uri: U, message: M) -> Self
    where
        U: Into<String>,
        M: Into<String>,
    {
        Self {
            reason,
            uri: uri.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Create a policy denial
    pub fn policy_denied(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RemoteReason::PolicyDenied, uri, message)
    }

    /// Create a not-found error
    pub fn not_found(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RemoteReason::NotFound, uri, message)
    }

    /// Create a pointer-missing error
    pub fn pointer_missing(uri: impl Into<String>, pointer: &str) -> Self {
        Self::new(
            RemoteReason::PointerMissing,
            uri,
            format!("Pointer not found in remote document: {}", pointer),
        )
    }

    /// Create a payload-too-large error
    pub fn payload_too_large(uri: impl Into<String>, limit: u64) -> Self {
        Self::new(
            RemoteReason::PayloadTooLarge,
            uri,
            format!("Remote document exceeds {} bytes", limit),
        )
    }

    /// Create a timeout error
    pub fn timeout(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(RemoteReason::Timeout, uri, message)
    }

    /// Create a network error wrapping its cause
    pub fn network(uri: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        Self::new(RemoteReason::NetworkError, uri, source.to_string()).with_source(source)
    }

    /// The classified reason
    pub fn reason(&self) -> RemoteReason {
        self.reason
    }

    /// The URI that failed
    pub fn uri(&self) -> &str {
        &self.uri
    }
}
