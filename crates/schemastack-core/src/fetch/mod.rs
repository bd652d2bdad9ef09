//! Remote document retrieval
//!
//! A [`RemoteFetcher`] turns a document URI into a parsed JSON value. The
//! compiler decides *whether* a fetch may happen (scheme allow-list, document
//! count, cumulative bytes); fetchers enforce the per-document byte cap while
//! reading and report transport failures as typed [`RemoteReason`]s.
//!
//! [`RemoteReason`]: crate::error::RemoteReason
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

mod cache;
mod file;
#[cfg(feature = "http")]
mod http;
mod policy;

pub use cache::{CachingFetcher, FetchCache};
pub use file::FileFetcher;
#[cfg(feature = "http")]
pub use http::HttpFetcher;
pub use policy::{FetchPolicy, PolicyError};

use crate::error::{RemoteResolutionError, RemoteResult};
use crate::json;
use crate::uri::DocumentUri;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

/// Size of each read while streaming a remote document
const CHUNK_SIZE: usize = 8 * 1024;

/// A fetched and parsed document
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Parsed document
    pub document: Arc<Value>,
    /// Bytes read from the transport
    pub byte_size: u64,
    /// Wall-clock time spent fetching, when measured
    pub elapsed: Option<Duration>,
}

impl FetchResult {
    /// Create a fetch result
    pub fn new(document: impl Into<Arc<Value>>, byte_size: u64, elapsed: Option<Duration>) -> Self {
        Self {
            document: document.into(),
            byte_size,
            elapsed,
        }
    }
}

/// Retrieves schema documents by URI
pub trait RemoteFetcher: Send + Sync {
    /// Fetch and parse the document at `uri`
    fn fetch(&self, uri: &DocumentUri, policy: &FetchPolicy) -> RemoteResult<FetchResult>;
}

impl<F: RemoteFetcher + ?Sized> RemoteFetcher for Arc<F> {
    fn fetch(&self, uri: &DocumentUri, policy: &FetchPolicy) -> RemoteResult<FetchResult> {
        (**self).fetch(uri, policy)
    }
}

/// Refuses every fetch. The default, so compilation is hermetic unless a
/// real fetcher is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisallowedFetcher;

impl RemoteFetcher for DisallowedFetcher {
    fn fetch(&self, uri: &DocumentUri, _policy: &FetchPolicy) -> RemoteResult<FetchResult> {
        tracing::debug!(uri = %uri, "remote fetch refused, no fetcher configured");
        Err(RemoteResolutionError::policy_denied(
            uri.as_str(),
            "Remote fetching is disabled",
        ))
    }
}

/// Serves documents from a fixed in-memory map
#[derive(Debug, Clone, Default)]
pub struct InMemoryFetcher {
    documents: HashMap<DocumentUri, (Arc<Value>, u64)>,
}

impl InMemoryFetcher {
    /// Create an empty fetcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under `uri` (fragment ignored)
    pub fn with_document(mut self, uri: DocumentUri, document: Value) -> Self {
        self.insert(uri, document);
        self
    }

    /// Register a document under `uri` (fragment ignored)
    pub fn insert(&mut self, uri: DocumentUri, document: Value) {
        let byte_size = serde_json::to_vec(&document).map(|b| b.len() as u64).unwrap_or(0);
        self.documents.insert(uri, (Arc::new(document), byte_size));
    }

    /// Number of registered documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl RemoteFetcher for InMemoryFetcher {
    fn fetch(&self, uri: &DocumentUri, policy: &FetchPolicy) -> RemoteResult<FetchResult> {
        let (document, byte_size) = self
            .documents
            .get(uri)
            .ok_or_else(|| RemoteResolutionError::not_found(uri.as_str(), "No such in-memory document"))?;
        if *byte_size > policy.max_document_bytes {
            return Err(RemoteResolutionError::payload_too_large(
                uri.as_str(),
                policy.max_document_bytes,
            ));
        }
        Ok(FetchResult::new(Arc::clone(document), *byte_size, Some(Duration::ZERO)))
    }
}

/// Read at most `limit` bytes, failing as soon as the stream goes past it
pub(crate) fn read_capped<R: Read>(
    mut reader: R,
    limit: u64,
    uri: &DocumentUri,
) -> RemoteResult<Vec<u8>> {
    let mut body = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                return Err(RemoteResolutionError::timeout(uri.as_str(), e.to_string()).with_source(e));
            }
            Err(e) => return Err(RemoteResolutionError::network(uri.as_str(), e)),
        };
        if body.len() as u64 + read as u64 > limit {
            return Err(RemoteResolutionError::payload_too_large(uri.as_str(), limit));
        }
        body.extend_from_slice(&chunk[..read]);
    }
    Ok(body)
}

/// Decode a fetched body into a JSON value
pub(crate) fn parse_body(body: &[u8], uri: &DocumentUri) -> RemoteResult<Value> {
    let text = std::str::from_utf8(body).map_err(|e| {
        RemoteResolutionError::new(
            crate::error::RemoteReason::NetworkError,
            uri.as_str(),
            "Remote document is not valid UTF-8",
        )
        .with_source(e)
    })?;
    json::parse(text).map_err(|e| {
        RemoteResolutionError::new(
            crate::error::RemoteReason::NetworkError,
            uri.as_str(),
            format!("Remote document is not valid JSON: {}", e),
        )
        .with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteReason;
    use serde_json::json;

    fn uri(text: &str) -> DocumentUri {
        DocumentUri::parse(text).unwrap()
    }

    #[test]
    fn test_disallowed_fetcher_denies() {
        let err = DisallowedFetcher
            .fetch(&uri("http://example.com/a.json"), &FetchPolicy::default())
            .unwrap_err();
        assert_eq!(err.reason(), RemoteReason::PolicyDenied);
    }

    #[test]
    fn test_in_memory_fetcher_serves_and_caps() {
        let fetcher = InMemoryFetcher::new()
            .with_document(uri("http://example.com/a.json"), json!({"type": "string"}));
        let result = fetcher
            .fetch(&uri("http://example.com/a.json#/ignored"), &FetchPolicy::default())
            .unwrap();
        assert_eq!(result.document["type"], "string");
        assert!(result.byte_size > 0);

        let tiny = FetchPolicy::default().with_max_document_bytes(4).unwrap();
        let err = fetcher.fetch(&uri("http://example.com/a.json"), &tiny).unwrap_err();
        assert_eq!(err.reason(), RemoteReason::PayloadTooLarge);

        let err = fetcher
            .fetch(&uri("http://example.com/missing.json"), &FetchPolicy::default())
            .unwrap_err();
        assert_eq!(err.reason(), RemoteReason::NotFound);
    }

    #[test]
    fn test_read_capped_stops_at_limit() {
        let data = vec![b' '; CHUNK_SIZE * 3];
        let target = uri("http://example.com/big.json");
        let err = read_capped(&data[..], (CHUNK_SIZE + 10) as u64, &target).unwrap_err();
        assert_eq!(err.reason(), RemoteReason::PayloadTooLarge);
        assert_eq!(read_capped(&data[..], data.len() as u64, &target).unwrap().len(), data.len());
    }

    #[test]
    fn test_parse_body_classifies_garbage() {
        let err = parse_body(b"{not json", &uri("http://example.com/x.json")).unwrap_err();
        assert_eq!(err.reason(), RemoteReason::NetworkError);
    }
}
