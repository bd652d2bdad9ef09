//! Memoizing fetcher
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use super::{FetchPolicy, FetchResult, RemoteFetcher};
use crate::error::RemoteResult;
use crate::uri::DocumentUri;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Shared store of fetched documents, keyed by normalized document URI.
///
/// Cloning shares the same store, so one cache can serve several
/// compilations.
#[derive(Debug, Clone, Default)]
pub struct FetchCache {
    entries: Arc<Mutex<HashMap<DocumentUri, FetchResult>>>,
}

impl FetchCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<DocumentUri, FetchResult>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached result for `uri`
    pub fn get(&self, uri: &DocumentUri) -> Option<FetchResult> {
        self.entries().get(uri).cloned()
    }

    /// Store a result
    pub fn insert(&self, uri: DocumentUri, result: FetchResult) {
        self.entries().insert(uri, result);
    }

    /// True when `uri` has been fetched
    pub fn contains(&self, uri: &DocumentUri) -> bool {
        self.entries().contains_key(uri)
    }

    /// Number of cached documents
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drop every cached document
    pub fn clear(&self) {
        self.entries().clear();
    }
}

/// Wraps another fetcher and serves repeat requests from a [`FetchCache`]
pub struct CachingFetcher {
    inner: Arc<dyn RemoteFetcher>,
    cache: FetchCache,
}

impl CachingFetcher {
    /// Cache in front of `inner` with a private store
    pub fn new(inner: Arc<dyn RemoteFetcher>) -> Self {
        Self::with_cache(inner, FetchCache::new())
    }

    /// Cache in front of `inner` using a shared store
    pub fn with_cache(inner: Arc<dyn RemoteFetcher>, cache: FetchCache) -> Self {
        Self { inner, cache }
    }

    /// The backing store
    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }
}

impl std::fmt::Debug for CachingFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingFetcher")
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl RemoteFetcher for CachingFetcher {
    fn fetch(&self, uri: &DocumentUri, policy: &FetchPolicy) -> RemoteResult<FetchResult> {
        if let Some(hit) = self.cache.get(uri) {
            tracing::trace!(uri = %uri, "fetch cache hit");
            return Ok(FetchResult {
                elapsed: Some(Duration::ZERO),
                ..hit
            });
        }
        let result = self.inner.fetch(uri, policy)?;
        self.cache.insert(uri.clone(), result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteResolutionError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl RemoteFetcher for Counting {
        fn fetch(&self, uri: &DocumentUri, _policy: &FetchPolicy) -> RemoteResult<FetchResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if uri.as_str().ends_with("missing.json") {
                return Err(RemoteResolutionError::not_found(uri.as_str(), "missing"));
            }
            Ok(FetchResult::new(json!({"uri": uri.as_str()}), 10, None))
        }
    }

    #[test]
    fn test_repeat_fetches_hit_cache() {
        let inner = Arc::new(Counting::default());
        let fetcher = CachingFetcher::new(inner.clone());
        let uri = DocumentUri::parse("http://example.com/a.json").unwrap();
        let policy = FetchPolicy::default();

        fetcher.fetch(&uri, &policy).unwrap();
        let again = fetcher.fetch(&uri, &policy).unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(again.byte_size, 10);
        assert_eq!(fetcher.cache().len(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let inner = Arc::new(Counting::default());
        let fetcher = CachingFetcher::new(inner.clone());
        let uri = DocumentUri::parse("http://example.com/missing.json").unwrap();
        assert!(fetcher.fetch(&uri, &FetchPolicy::default()).is_err());
        assert!(fetcher.fetch(&uri, &FetchPolicy::default()).is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert!(fetcher.cache().is_empty());
    }

    #[test]
    fn test_shared_cache_spans_fetchers() {
        let cache = FetchCache::new();
        let first_inner = Arc::new(Counting::default());
        let second_inner = Arc::new(Counting::default());
        let uri = DocumentUri::parse("http://example.com/a.json").unwrap();

        CachingFetcher::with_cache(first_inner.clone(), cache.clone())
            .fetch(&uri, &FetchPolicy::default())
            .unwrap();
        CachingFetcher::with_cache(second_inner.clone(), cache.clone())
            .fetch(&uri, &FetchPolicy::default())
            .unwrap();
        assert_eq!(first_inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_inner.calls.load(Ordering::SeqCst), 0);
        assert!(cache.contains(&uri));
    }
}
