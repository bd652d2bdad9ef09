//! Deferred `$ref` nodes
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use crate::compiler::RefToken;
use crate::validation::{ErrorKind, Frame, Traversal};
use schemastack_core::DocumentUri;

/// `$ref` to a pointer, anchor or remote document.
///
/// Holds the lookup key only; the target is found through the resolver each
/// time the node is evaluated.
#[derive(Debug, Clone)]
pub struct RefSchema {
    /// Document the `$ref` was written in
    pub(crate) doc: DocumentUri,
    pub(crate) token: RefToken,
    /// The `$ref` value as written
    pub(crate) reference: String,
}

impl RefSchema {
    pub(crate) fn new(doc: DocumentUri, token: RefToken, reference: impl Into<String>) -> Self {
        Self {
            doc,
            token,
            reference: reference.into(),
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn token(&self) -> &RefToken {
        &self.token
    }

    pub(crate) fn evaluate<'a>(&'a self, frame: &Frame<'a>, cx: &mut Traversal<'a>) {
        match cx.resolver().resolve(&self.doc, &self.token) {
            Ok(target) => cx.defer(frame, target),
            Err(err) => {
                tracing::warn!(reference = %self.reference, error = %err, "unresolvable $ref during validation");
                cx.report(
                    frame,
                    ErrorKind::Reference,
                    format!("unresolvable $ref: {}", self.reference),
                );
            }
        }
    }
}

/// `$ref: "#"`
#[derive(Debug, Clone)]
pub struct RootRef {
    pub(crate) doc: DocumentUri,
}

impl RootRef {
    pub(crate) fn new(doc: DocumentUri) -> Self {
        Self { doc }
    }

    pub(crate) fn evaluate<'a>(&'a self, frame: &Frame<'a>, cx: &mut Traversal<'a>) {
        match cx.resolver().root(&self.doc) {
            Ok(root) => cx.defer(frame, root),
            Err(err) => {
                tracing::warn!(error = %err, "unresolvable root $ref during validation");
                cx.report(frame, ErrorKind::Reference, "unresolvable $ref: #");
            }
        }
    }
}
