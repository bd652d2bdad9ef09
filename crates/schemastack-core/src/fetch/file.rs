//! Filesystem fetcher confined to a root directory
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use super::{parse_body, read_capped, FetchPolicy, FetchResult, RemoteFetcher};
use crate::error::{RemoteResolutionError, RemoteResult};
use crate::uri::DocumentUri;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Reads `file:` documents that live under a jail directory
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
    canonical_root: PathBuf,
}

impl FileFetcher {
    /// Create a fetcher confined to `root`, which must exist
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        let canonical_root = std::fs::canonicalize(&root)?;
        Ok(Self {
            root,
            canonical_root,
        })
    }

    /// The jail directory as configured
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn inside_jail(&self, path: &Path) -> bool {
        path.starts_with(&self.root) || path.starts_with(&self.canonical_root)
    }
}

impl RemoteFetcher for FileFetcher {
    fn fetch(&self, uri: &DocumentUri, policy: &FetchPolicy) -> RemoteResult<FetchResult> {
        if uri.scheme() != "file" {
            return Err(RemoteResolutionError::policy_denied(
                uri.as_str(),
                "FileFetcher only handles file: URIs",
            ));
        }
        let path = uri.as_url().to_file_path().map_err(|_| {
            RemoteResolutionError::policy_denied(uri.as_str(), "URI is not a local file path")
        })?;
        // Dot segments are already gone after URI normalization, so a lexical
        // prefix check catches `../` escapes before touching the filesystem.
        if !self.inside_jail(&path) {
            tracing::debug!(uri = %uri, root = %self.root.display(), "file fetch outside jail");
            return Err(RemoteResolutionError::policy_denied(
                uri.as_str(),
                format!("Path outside allowed root {}", self.root.display()),
            ));
        }

        let started = Instant::now();
        let canonical = std::fs::canonicalize(&path).map_err(|e| io_error(uri, e))?;
        if !canonical.starts_with(&self.canonical_root) {
            return Err(RemoteResolutionError::policy_denied(
                uri.as_str(),
                format!("Path resolves outside allowed root {}", self.root.display()),
            ));
        }

        let metadata = std::fs::metadata(&canonical).map_err(|e| io_error(uri, e))?;
        if !metadata.is_file() {
            return Err(RemoteResolutionError::not_found(uri.as_str(), "Not a regular file"));
        }
        if metadata.len() > policy.max_document_bytes {
            return Err(RemoteResolutionError::payload_too_large(
                uri.as_str(),
                policy.max_document_bytes,
            ));
        }

        let file = File::open(&canonical).map_err(|e| io_error(uri, e))?;
        let body = read_capped(file, policy.max_document_bytes, uri)?;
        let document = parse_body(&body, uri)?;
        let elapsed = started.elapsed();
        tracing::trace!(uri = %uri, bytes = body.len(), ?elapsed, "read schema file");
        Ok(FetchResult::new(document, body.len() as u64, Some(elapsed)))
    }
}

fn io_error(uri: &DocumentUri, error: io::Error) -> RemoteResolutionError {
    match error.kind() {
        io::ErrorKind::NotFound => {
            RemoteResolutionError::not_found(uri.as_str(), "File does not exist").with_source(error)
        }
        _ => RemoteResolutionError::network(uri.as_str(), error),
    }
}
