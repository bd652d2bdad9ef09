//! Compiled schema graph
//!
//! One [`Schema`] variant per schema form. Sub-schemas are shared through
//! [`SchemaRef`] (`Arc<Schema>`), so a document's pointer index and its
//! parents point at the same node. `$ref` never owns its target: a
//! [`RefSchema`] holds a lookup key that the resolver turns into a node when
//! the reference is evaluated, which is what lets recursive and forward
//! references exist in an immutable graph.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

mod array;
mod composition;
mod format;
mod number;
mod object;
mod reference;
mod string;
mod value;

pub use array::ArraySchema;
pub use composition::ConditionalSchema;
pub use format::Format;
pub use number::{Bound, NumberSchema};
pub use object::{AdditionalProperties, ObjectSchema};
pub use reference::{RefSchema, RootRef};
pub use string::StringSchema;
pub use value::{ConstSchema, EnumSchema};

use crate::validation::{Frame, Traversal};
use crate::validation::ErrorKind;
use std::sync::Arc;

/// Shared handle to a compiled node
pub type SchemaRef = Arc<Schema>;

/// A compiled schema node
#[derive(Debug)]
pub enum Schema {
    /// `true` or `{}`: accepts everything
    Any,
    /// `false`: rejects everything
    Never,
    /// Object keywords
    Object(ObjectSchema),
    /// Array keywords
    Array(ArraySchema),
    /// String keywords
    String(StringSchema),
    /// Numeric keywords, including `type: integer`
    Number(NumberSchema),
    /// `type: boolean`
    Boolean,
    /// `type: null`
    Null,
    /// `$ref` to a pointer, anchor or another document
    Ref(RefSchema),
    /// `$ref: "#"`, the containing document's root
    RootRef(RootRef),
    /// Every branch must pass
    AllOf(Vec<SchemaRef>),
    /// At least one branch must pass
    AnyOf(Vec<SchemaRef>),
    /// Exactly one branch must pass
    OneOf(Vec<SchemaRef>),
    /// The inner schema must fail
    Not(SchemaRef),
    /// `if`/`then`/`else`
    Conditional(ConditionalSchema),
    /// Deep equality with a fixed value
    Const(ConstSchema),
    /// Base schema plus membership in a fixed value set
    Enum(EnumSchema),
}

impl Schema {
    /// Shared `true` node
    pub fn any() -> SchemaRef {
        Arc::new(Schema::Any)
    }

    /// Shared `false` node
    pub fn never() -> SchemaRef {
        Arc::new(Schema::Never)
    }

    /// True for the always-passing node
    pub fn is_any(&self) -> bool {
        matches!(self, Schema::Any)
    }

    /// True for the always-failing node
    pub fn is_never(&self) -> bool {
        matches!(self, Schema::Never)
    }

    /// Short name of the form, for logs
    pub fn form_name(&self) -> &'static str {
        match self {
            Schema::Any => "any",
            Schema::Never => "never",
            Schema::Object(_) => "object",
            Schema::Array(_) => "array",
            Schema::String(_) => "string",
            Schema::Number(_) => "number",
            Schema::Boolean => "boolean",
            Schema::Null => "null",
            Schema::Ref(_) => "ref",
            Schema::RootRef(_) => "root-ref",
            Schema::AllOf(_) => "allOf",
            Schema::AnyOf(_) => "anyOf",
            Schema::OneOf(_) => "oneOf",
            Schema::Not(_) => "not",
            Schema::Conditional(_) => "conditional",
            Schema::Const(_) => "const",
            Schema::Enum(_) => "enum",
        }
    }

    /// Evaluate this node for one frame, deferring child work onto the
    /// traversal stack.
    pub(crate) fn evaluate<'a>(&'a self, frame: &Frame<'a>, cx: &mut Traversal<'a>) {
        match self {
            Schema::Any => {}
            Schema::Never => cx.report(frame, ErrorKind::Mismatch, "schema should not match"),
            Schema::Object(object) => object.evaluate(frame, cx),
            Schema::Array(array) => array.evaluate(frame, cx),
            Schema::String(string) => string.evaluate(frame, cx),
            Schema::Number(number) => number.evaluate(frame, cx),
            Schema::Boolean => {
                if !frame.instance.is_boolean() {
                    cx.report_type(frame, "boolean");
                }
            }
            Schema::Null => {
                if !frame.instance.is_null() {
                    cx.report_type(frame, "null");
                }
            }
            Schema::Ref(reference) => reference.evaluate(frame, cx),
            Schema::RootRef(root) => root.evaluate(frame, cx),
            Schema::AllOf(branches) => composition::all_of(branches, frame, cx),
            Schema::AnyOf(branches) => composition::any_of(branches, frame, cx),
            Schema::OneOf(branches) => composition::one_of(branches, frame, cx),
            Schema::Not(inner) => composition::not(inner, frame, cx),
            Schema::Conditional(conditional) => conditional.evaluate(frame, cx),
            Schema::Const(constant) => constant.evaluate(frame, cx),
            Schema::Enum(enumeration) => enumeration.evaluate(frame, cx),
        }
    }
}
