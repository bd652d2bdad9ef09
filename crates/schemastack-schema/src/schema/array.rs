//! Array keywords
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use super::SchemaRef;
use crate::validation::{ErrorKind, Frame, Instance, Join, Traversal};
use schemastack_core::json::canonical_form;
use std::collections::HashSet;

/// Array keywords
#[derive(Debug, Clone, Default)]
pub struct ArraySchema {
    pub(crate) typed: bool,
    /// Applies to items past `prefix_items`, or to all items without a prefix
    pub(crate) items: Option<SchemaRef>,
    pub(crate) prefix_items: Vec<SchemaRef>,
    pub(crate) min_items: Option<u64>,
    pub(crate) max_items: Option<u64>,
    pub(crate) unique_items: bool,
    pub(crate) contains: Option<SchemaRef>,
    pub(crate) min_contains: Option<u64>,
    pub(crate) max_contains: Option<u64>,
}

impl ArraySchema {
    pub(crate) fn evaluate<'a>(&'a self, frame: &Frame<'a>, cx: &mut Traversal<'a>) {
        let Some(items) = frame.instance.as_array() else {
            if self.typed {
                cx.report_type(frame, "array");
            }
            return;
        };

        let count = items.len() as u64;
        if let Some(min) = self.min_items.filter(|min| count < *min) {
            cx.report(
                frame,
                ErrorKind::Count,
                format!("too few items: expected at least {}", min),
            );
        }
        if let Some(max) = self.max_items.filter(|max| count > *max) {
            cx.report(
                frame,
                ErrorKind::Count,
                format!("too many items: expected at most {}", max),
            );
        }

        if self.unique_items && !all_unique(items) {
            cx.report(frame, ErrorKind::Unique, "array items must be unique");
        }

        if let Some(contains) = &self.contains {
            let min = self.min_contains.unwrap_or(1);
            let scopes: Vec<_> = items.iter().map(|_| cx.isolate(frame.scope)).collect();
            cx.join(Join::Contains {
                frame: *frame,
                min,
                max: self.max_contains,
                scopes: scopes.clone(),
            });
            for (index, (item, scope)) in items.iter().zip(scopes).enumerate() {
                let path = cx.index_path(frame.path, index);
                cx.defer_at(scope, path, contains, Instance::Value(item));
            }
        }

        for (index, item) in items.iter().enumerate().rev() {
            let schema = match self.prefix_items.get(index) {
                Some(schema) => schema,
                None => match &self.items {
                    Some(schema) => schema,
                    None => continue,
                },
            };
            let path = cx.index_path(frame.path, index);
            cx.defer_at(frame.scope, path, schema, Instance::Value(item));
        }
    }
}

/// Structural uniqueness; object key order and number spelling do not matter
fn all_unique(items: &[serde_json::Value]) -> bool {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().all(|item| seen.insert(canonical_form(item)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uniqueness_ignores_key_order() {
        let items = vec![json!({"a": 1, "b": 2}), json!({"b": 2, "a": 1})];
        assert!(!all_unique(&items));
    }

    #[test]
    fn test_uniqueness_compares_numbers_by_value() {
        assert!(!all_unique(&[json!(1), json!(1.0)]));
        assert!(all_unique(&[json!(1), json!("1"), json!([1])]));
    }
}
