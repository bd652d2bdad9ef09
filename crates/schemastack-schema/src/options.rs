//! Compilation options
//!
//! [`JsonSchemaOptions`] controls how keywords are interpreted;
//! [`CompileOptions`] controls how remote documents are obtained.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use schemastack_core::{
    CachingFetcher, DisallowedFetcher, DocumentUri, FetchCache, FetchPolicy, RemoteFetcher,
};
use std::env;
use std::sync::Arc;

/// Environment variable read by [`JsonSchemaOptions::from_env`]
pub const FORMAT_ASSERTION_ENV: &str = "SCHEMASTACK_FORMAT_ASSERTION";

/// Keyword interpretation settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonSchemaOptions {
    /// Report `format` failures instead of treating `format` as an annotation
    pub assert_formats: bool,
}

impl JsonSchemaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assert_formats(mut self, assert_formats: bool) -> Self {
        self.assert_formats = assert_formats;
        self
    }

    /// Defaults, overridden by `SCHEMASTACK_FORMAT_ASSERTION` when it holds
    /// `true`/`false`/`1`/`0`
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(value) = env::var(FORMAT_ASSERTION_ENV) {
            match parse_flag(&value) {
                Some(flag) => options.assert_formats = flag,
                None => tracing::warn!(
                    variable = FORMAT_ASSERTION_ENV,
                    value = %value,
                    "ignoring unrecognized boolean"
                ),
            }
        }
        options
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Remote retrieval settings
#[derive(Clone)]
pub struct CompileOptions {
    fetcher: Arc<dyn RemoteFetcher>,
    fetch_policy: FetchPolicy,
    base_uri: DocumentUri,
    cache: Option<FetchCache>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            fetcher: Arc::new(DisallowedFetcher),
            fetch_policy: FetchPolicy::default(),
            base_uri: DocumentUri::entry(),
            cache: None,
        }
    }
}

impl std::fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileOptions")
            .field("fetch_policy", &self.fetch_policy)
            .field("base_uri", &self.base_uri)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetcher for remote `$ref` targets; remote fetching is off by default
    pub fn with_fetcher(mut self, fetcher: impl RemoteFetcher + 'static) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_shared_fetcher(mut self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    /// URI of the entry document, used to resolve its relative references
    pub fn with_base_uri(mut self, base_uri: DocumentUri) -> Self {
        self.base_uri = base_uri;
        self
    }

    /// Reuse fetched documents across compilations
    pub fn with_cache(mut self, cache: FetchCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn fetch_policy(&self) -> &FetchPolicy {
        &self.fetch_policy
    }

    pub fn base_uri(&self) -> &DocumentUri {
        &self.base_uri
    }

    pub fn cache(&self) -> Option<&FetchCache> {
        self.cache.as_ref()
    }

    /// The fetcher to use, wrapped in the cache when one is configured
    pub(crate) fn effective_fetcher(&self) -> Arc<dyn RemoteFetcher> {
        match &self.cache {
            Some(cache) => Arc::new(CachingFetcher::with_cache(self.fetcher.clone(), cache.clone())),
            None => self.fetcher.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_compile_option_defaults() {
        let options = CompileOptions::default();
        assert_eq!(options.base_uri(), &DocumentUri::entry());
        assert!(options.cache().is_none());
        assert_eq!(options.fetch_policy().max_documents, FetchPolicy::default().max_documents);
    }

    #[test]
    fn test_builders() {
        let base = DocumentUri::parse("https://example.com/root.json").unwrap();
        let options = CompileOptions::new()
            .with_base_uri(base.clone())
            .with_cache(FetchCache::new());
        assert_eq!(options.base_uri(), &base);
        assert!(options.cache().is_some());
        assert!(JsonSchemaOptions::new().with_assert_formats(true).assert_formats);
    }
}
