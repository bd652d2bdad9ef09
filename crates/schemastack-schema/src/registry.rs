//! Compiled roots and the frozen registry
//!
//! The compiler fills a [`RegistryBuilder`]; once its work stack is empty the
//! builder is consumed by [`RegistryBuilder::freeze`]. A [`Registry`] has no
//! mutating methods, so sharing it across threads needs no locking.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use crate::error::{CompileError, CompileResult};
use crate::schema::SchemaRef;
use schemastack_core::DocumentUri;
use std::collections::HashMap;

/// Fragment keys (`#`, `#/a/b`, `#anchor`) to compiled nodes
pub type PointerIndex = HashMap<String, SchemaRef>;

/// Index key for a decoded fragment (`""`, `/a/b` or `anchor`)
pub(crate) fn fragment_key(fragment: &str) -> String {
    format!("#{}", fragment)
}

/// One compiled document
#[derive(Debug)]
pub struct CompiledRoot {
    doc_uri: DocumentUri,
    schema: SchemaRef,
    pointer_index: PointerIndex,
}

impl CompiledRoot {
    pub(crate) fn new(doc_uri: DocumentUri, schema: SchemaRef, pointer_index: PointerIndex) -> Self {
        Self {
            doc_uri,
            schema,
            pointer_index,
        }
    }

    /// The document's normalized URI
    pub fn doc_uri(&self) -> &DocumentUri {
        &self.doc_uri
    }

    /// The document's root schema
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Every indexed pointer and anchor of the document
    pub fn pointer_index(&self) -> &PointerIndex {
        &self.pointer_index
    }

    /// Look up a decoded fragment; empty means the root
    pub fn get(&self, fragment: &str) -> Option<&SchemaRef> {
        if fragment.is_empty() {
            return Some(&self.schema);
        }
        self.pointer_index.get(&fragment_key(fragment))
    }
}

/// Registry under construction
#[derive(Debug, Default)]
pub(crate) struct RegistryBuilder {
    roots: HashMap<DocumentUri, CompiledRoot>,
}

impl RegistryBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a compiled document; each URI may be inserted once
    pub(crate) fn insert(&mut self, root: CompiledRoot) -> CompileResult<()> {
        if self.roots.contains_key(root.doc_uri()) {
            return Err(CompileError::DuplicateDocument {
                uri: root.doc_uri().to_string(),
            });
        }
        self.roots.insert(root.doc_uri().clone(), root);
        Ok(())
    }

    pub(crate) fn roots(&self) -> &HashMap<DocumentUri, CompiledRoot> {
        &self.roots
    }

    /// Stop accepting documents
    pub(crate) fn freeze(self) -> Registry {
        Registry { roots: self.roots }
    }
}

/// Frozen map from document URI to compiled root
#[derive(Debug)]
pub struct Registry {
    roots: HashMap<DocumentUri, CompiledRoot>,
}

impl Registry {
    /// The compiled root of a document
    pub fn get(&self, uri: &DocumentUri) -> Option<&CompiledRoot> {
        self.roots.get(uri)
    }

    /// True when the document was compiled
    pub fn contains(&self, uri: &DocumentUri) -> bool {
        self.roots.contains_key(uri)
    }

    /// Number of compiled documents
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// True when no document was compiled
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// URIs of every compiled document
    pub fn documents(&self) -> impl Iterator<Item = &DocumentUri> {
        self.roots.keys()
    }

    pub(crate) fn roots(&self) -> &HashMap<DocumentUri, CompiledRoot> {
        &self.roots
    }
}
