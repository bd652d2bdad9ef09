//! Schemastack Schema - multi-document JSON Schema compiler and validator
//!
//! A schema is compiled once into an immutable graph that can validate any
//! number of instances, from any number of threads.
//!
//! ## Features
//!
//! - **Work-stack compilation**: remote `$ref` targets are fetched once per
//!   document URI under a [`FetchPolicy`], and reference cycles fail with the
//!   full chain
//! - **Keyed references**: `$ref` nodes are looked up at validation time, so
//!   recursive and forward references need no special handling
//! - **Stack-based validation**: no recursion, so deeply nested instances
//!   cannot exhaust the native stack
//! - **Exact numbers**: bounds, `multipleOf`, `enum` and `const` compare JSON
//!   numbers as decimals
//!
//! ## Quick Start
//!
//! ```rust
//! use schemastack_schema::JsonSchema;
//! use serde_json::json;
//!
//! let schema = JsonSchema::compile(&json!({
//!     "type": "object",
//!     "properties": {"name": {"type": "string"}},
//!     "required": ["name"]
//! }))
//! .unwrap();
//!
//! assert!(schema.validate(&json!({"name": "Alice"})).is_valid());
//!
//! let result = schema.validate(&json!({}));
//! assert_eq!(result.errors[0].message, "missing required property: name");
//! ```
//!
//! ## Remote references
//!
//! Remote fetching is off unless a fetcher is configured:
//!
//! ```rust
//! use schemastack_core::{DocumentUri, InMemoryFetcher};
//! use schemastack_schema::{compile, CompileOptions, JsonSchemaOptions};
//! use serde_json::json;
//!
//! let fetcher = InMemoryFetcher::new().with_document(
//!     DocumentUri::parse("https://example.com/common.json").unwrap(),
//!     json!({"$defs": {"id": {"type": "integer"}}}),
//! );
//! let options = CompileOptions::new()
//!     .with_base_uri(DocumentUri::parse("https://example.com/root.json").unwrap())
//!     .with_fetcher(fetcher);
//!
//! let schema = compile(
//!     &json!({"$ref": "common.json#/$defs/id"}),
//!     &JsonSchemaOptions::default(),
//!     &options,
//! )
//! .unwrap();
//! assert!(!schema.validate(&json!("7")).is_valid());
//! ```
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

mod compiler;
pub mod error;
pub mod options;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod validation;

pub use compiler::{classify, RefToken};
pub use error::{CompileError, CompileResult, CycleKind};
pub use options::{CompileOptions, JsonSchemaOptions};
pub use registry::{CompiledRoot, PointerIndex, Registry};
pub use resolver::{ResolveError, ResolverContext};
pub use schema::{Schema, SchemaRef};
pub use validation::{ErrorKind, ValidationError, ValidationErrors, ValidationResult};

pub use schemastack_core::{
    DocumentUri, FetchCache, FetchPolicy, RemoteFetcher, RemoteReason, RemoteResolutionError,
};

use serde_json::Value;
use std::sync::Arc;

/// Compile `schema` and every document it references
pub fn compile(
    schema: &Value,
    options: &JsonSchemaOptions,
    compile_options: &CompileOptions,
) -> CompileResult<JsonSchema> {
    let registry = compiler::compile_registry(schema, options, compile_options)?;
    let entry = compile_options.base_uri().clone();
    let root = registry
        .get(&entry)
        .map(|compiled| compiled.schema().clone())
        .ok_or_else(|| CompileError::unresolved("#", entry.as_str(), "entry document missing from registry"))?;
    Ok(JsonSchema {
        registry: Arc::new(registry),
        entry,
        root,
    })
}

/// A compiled schema, ready to validate instances.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Debug, Clone)]
pub struct JsonSchema {
    registry: Arc<Registry>,
    entry: DocumentUri,
    root: SchemaRef,
}

impl JsonSchema {
    /// Compile with default options: no format assertion, no remote fetching
    pub fn compile(schema: &Value) -> CompileResult<Self> {
        compile(schema, &JsonSchemaOptions::default(), &CompileOptions::default())
    }

    /// Validate an instance, collecting every error
    pub fn validate(&self, instance: &Value) -> ValidationResult {
        validation::validate(&self.registry, &self.root, instance)
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_valid()
    }

    /// Every compiled document
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// URI of the entry document
    pub fn entry(&self) -> &DocumentUri {
        &self.entry
    }

    /// Root node of the entry document
    pub fn root(&self) -> &SchemaRef {
        &self.root
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
