//! `const` and `enum` forms
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use super::SchemaRef;
use crate::validation::{ErrorKind, Frame, Traversal};
use schemastack_core::json::{canonical_form, json_equal};
use serde_json::Value;
use std::collections::HashSet;

/// `const`
#[derive(Debug)]
pub struct ConstSchema {
    pub(crate) value: Value,
}

impl ConstSchema {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn evaluate<'a>(&'a self, frame: &Frame<'a>, cx: &mut Traversal<'a>) {
        if !json_equal(&frame.instance.to_value(), &self.value) {
            cx.report(frame, ErrorKind::Mismatch, "value must equal const value");
        }
    }
}

/// `enum` together with the form built from its sibling keywords
#[derive(Debug)]
pub struct EnumSchema {
    pub(crate) base: SchemaRef,
    pub(crate) values: Vec<Value>,
    /// Canonical forms of `values`, for membership without pairwise compares
    pub(crate) canonical: HashSet<String>,
}

impl EnumSchema {
    pub(crate) fn new(base: SchemaRef, values: Vec<Value>) -> Self {
        let canonical = values.iter().map(canonical_form).collect();
        Self {
            base,
            values,
            canonical,
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn evaluate<'a>(&'a self, frame: &Frame<'a>, cx: &mut Traversal<'a>) {
        let instance = frame.instance.to_value();
        if !self.canonical.contains(&canonical_form(&instance)) {
            cx.report(frame, ErrorKind::Mismatch, "value not in enum");
        }
        if !self.base.is_any() {
            cx.defer(frame, &self.base);
        }
    }
}
