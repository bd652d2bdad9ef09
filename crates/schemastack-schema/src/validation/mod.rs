//! Instance validation against a compiled registry
//!
//! [`JsonSchema::validate`](crate::JsonSchema::validate) runs the engine in
//! [`engine`]. Every call owns its task stack, visited sets, path arena and
//! error lists, so one compiled schema can validate from many threads at
//! once without locks.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

mod engine;
mod error;
mod path;

pub use error::{ErrorKind, ValidationError, ValidationErrors, ValidationResult};

pub(crate) use engine::{Frame, Instance, Join, Traversal};

use crate::registry::Registry;
use crate::schema::Schema;
use serde_json::Value;

/// Validate `instance` against `root`, resolving references through `registry`
pub(crate) fn validate(registry: &Registry, root: &Schema, instance: &Value) -> ValidationResult {
    let errors = Traversal::new(registry).run(root, instance);
    tracing::debug!(errors = errors.len(), "validation finished");
    ValidationResult::from_errors(errors)
}
