//! Reference resolution
//!
//! A [`ResolverContext`] turns a `(document, RefToken)` pair into the compiled
//! node it designates. It reads either the frozen registry (validation) or
//! the builder's roots just before freezing (compile-time cycle checks), and
//! never mutates either.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use crate::compiler::RefToken;
use crate::registry::CompiledRoot;
use crate::schema::SchemaRef;
use schemastack_core::{DocumentUri, RemoteResolutionError};
use std::collections::HashMap;
use thiserror::Error;

/// A reference that does not resolve
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The referenced document is not in the registry
    #[error("Document '{uri}' is not compiled")]
    UnknownDocument { uri: String },

    /// The document exists but the fragment is not indexed
    #[error("Fragment '#{fragment}' not found in '{uri}'")]
    PointerMissing { uri: String, fragment: String },
}

impl From<ResolveError> for RemoteResolutionError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnknownDocument { uri } => {
                RemoteResolutionError::not_found(uri, "Document is not compiled")
            }
            ResolveError::PointerMissing { uri, fragment } => {
                RemoteResolutionError::pointer_missing(format!("{}#{}", uri, fragment), &fragment)
            }
        }
    }
}

/// Read-only view over compiled roots for resolving references
#[derive(Debug, Clone, Copy)]
pub struct ResolverContext<'r> {
    roots: &'r HashMap<DocumentUri, CompiledRoot>,
}

impl<'r> ResolverContext<'r> {
    pub(crate) fn new(roots: &'r HashMap<DocumentUri, CompiledRoot>) -> Self {
        Self { roots }
    }

    /// The compiled root of `doc`
    pub fn document(&self, doc: &DocumentUri) -> Result<&'r CompiledRoot, ResolveError> {
        self.roots.get(doc).ok_or_else(|| ResolveError::UnknownDocument {
            uri: doc.to_string(),
        })
    }

    /// Root schema of `doc`, the target of `#`
    pub fn root(&self, doc: &DocumentUri) -> Result<&'r SchemaRef, ResolveError> {
        Ok(self.document(doc)?.schema())
    }

    /// Resolve `token` as written inside document `doc`
    pub fn resolve(&self, doc: &DocumentUri, token: &RefToken) -> Result<&'r SchemaRef, ResolveError> {
        let (target, fragment) = match token {
            RefToken::Local { fragment } => (doc, fragment.as_str()),
            RefToken::Remote {
                target, fragment, ..
            } => (target, fragment.as_deref().unwrap_or("")),
        };
        let root = self.document(target)?;
        root.get(fragment).ok_or_else(|| ResolveError::PointerMissing {
            uri: target.to_string(),
            fragment: fragment.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PointerIndex;
    use crate::schema::Schema;

    fn roots() -> HashMap<DocumentUri, CompiledRoot> {
        let entry = DocumentUri::entry();
        let remote = DocumentUri::parse("http://example.com/r.json").unwrap();
        let mut index = PointerIndex::new();
        index.insert("#/$defs/s".to_string(), Schema::never());
        index.insert("#top".to_string(), Schema::any());
        let mut roots = HashMap::new();
        roots.insert(entry.clone(), CompiledRoot::new(entry, Schema::any(), PointerIndex::new()));
        roots.insert(remote.clone(), CompiledRoot::new(remote, Schema::any(), index));
        roots
    }

    #[test]
    fn test_resolves_local_remote_and_anchor() {
        let roots = roots();
        let ctx = ResolverContext::new(&roots);
        let entry = DocumentUri::entry();
        let remote = DocumentUri::parse("http://example.com/r.json").unwrap();

        let root = ctx
            .resolve(&entry, &RefToken::Local { fragment: String::new() })
            .unwrap();
        assert!(root.is_any());

        let pointer = RefToken::Remote {
            base: entry.clone(),
            target: remote.clone(),
            fragment: Some("/$defs/s".to_string()),
        };
        assert!(ctx.resolve(&entry, &pointer).unwrap().is_never());

        let anchor = RefToken::Local { fragment: "top".to_string() };
        assert!(ctx.resolve(&remote, &anchor).unwrap().is_any());
    }

    #[test]
    fn test_missing_fragment_and_document() {
        let roots = roots();
        let ctx = ResolverContext::new(&roots);
        let entry = DocumentUri::entry();
        let missing = RefToken::Local { fragment: "/nope".to_string() };
        assert!(matches!(
            ctx.resolve(&entry, &missing),
            Err(ResolveError::PointerMissing { .. })
        ));

        let other = RefToken::Remote {
            base: entry.clone(),
            target: DocumentUri::parse("http://example.com/other.json").unwrap(),
            fragment: None,
        };
        let err = ctx.resolve(&entry, &other).unwrap_err();
        let remote: RemoteResolutionError = err.into();
        assert_eq!(remote.reason(), schemastack_core::RemoteReason::NotFound);
    }
}
