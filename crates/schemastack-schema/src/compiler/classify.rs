//! `$ref` classification
//!
//! [`classify`] depends only on its two arguments. Whether a remote target
//! is actually fetched, aliased or already compiled is decided by the
//! compiler afterwards.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use super::pointer;
use crate::error::{CompileError, CompileResult};
use schemastack_core::uri::decode_fragment;
use schemastack_core::DocumentUri;

/// Where a `$ref` points
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefToken {
    /// Inside the referring document; `fragment` is a decoded JSON Pointer
    /// (`/a/b`), an anchor name, or empty for the root
    Local { fragment: String },
    /// Another document
    Remote {
        /// Base URI the reference was resolved against
        base: DocumentUri,
        /// Normalized target document, without fragment
        target: DocumentUri,
        /// Decoded fragment, when the reference carried one
        fragment: Option<String>,
    },
}

impl RefToken {
    pub fn is_local(&self) -> bool {
        matches!(self, RefToken::Local { .. })
    }

    /// The fragment, empty for the document root
    pub fn fragment(&self) -> &str {
        match self {
            RefToken::Local { fragment } => fragment,
            RefToken::Remote { fragment, .. } => fragment.as_deref().unwrap_or(""),
        }
    }
}

/// Classify `reference` as written in a document whose base URI is `base`
pub fn classify(reference: &str, base: &DocumentUri) -> CompileResult<RefToken> {
    if reference.is_empty() {
        return Err(CompileError::invalid_pointer(reference, "empty $ref"));
    }

    if let Some(fragment) = reference.strip_prefix('#') {
        return local(reference, decode_fragment(fragment));
    }

    match base.join(reference) {
        Ok((target, fragment)) if &target == base => local(reference, fragment.unwrap_or_default()),
        Ok((target, fragment)) => {
            if let Some(fragment) = fragment.as_deref().filter(|f| f.starts_with('/')) {
                pointer::check_escapes(fragment)
                    .map_err(|reason| CompileError::invalid_pointer(reference, reason))?;
            }
            Ok(RefToken::Remote {
                base: base.clone(),
                target,
                fragment,
            })
        }
        // Bases such as `urn:` cannot take relative references; treat the
        // text as a pointer or anchor inside the same document.
        Err(_) if reference.starts_with('/') => local(reference, reference.to_string()),
        Err(err) if reference.contains(':') || reference.contains(char::is_whitespace) => {
            Err(CompileError::invalid_pointer(reference, err.to_string()))
        }
        Err(_) => local(reference, reference.to_string()),
    }
}

fn local(reference: &str, fragment: String) -> CompileResult<RefToken> {
    if fragment.starts_with('/') {
        pointer::check_escapes(&fragment)
            .map_err(|reason| CompileError::invalid_pointer(reference, reason))?;
    }
    Ok(RefToken::Local { fragment })
}
