//! Object keywords and property precedence
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use super::SchemaRef;
use crate::validation::{ErrorKind, Frame, Instance, Join, Traversal};
use regex::Regex;
use std::collections::HashMap;

/// What happens to properties matched by neither `properties` nor
/// `patternProperties`
#[derive(Debug, Clone, Default)]
pub enum AdditionalProperties {
    /// `true` or absent
    #[default]
    Allowed,
    /// `false`
    Forbidden,
    /// Deferred against each additional property
    Schema(SchemaRef),
}

/// Object keywords
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    /// False when the form was inferred from keywords rather than `type`
    pub(crate) typed: bool,
    pub(crate) properties: HashMap<String, SchemaRef>,
    pub(crate) required: Vec<String>,
    pub(crate) additional: AdditionalProperties,
    pub(crate) pattern_properties: Vec<(Regex, SchemaRef)>,
    pub(crate) property_names: Option<SchemaRef>,
    pub(crate) min_properties: Option<u64>,
    pub(crate) max_properties: Option<u64>,
    pub(crate) dependent_required: Vec<(String, Vec<String>)>,
    pub(crate) dependent_schemas: Vec<(String, SchemaRef)>,
}

impl ObjectSchema {
    /// Schema declared for an exact property name
    pub fn property(&self, name: &str) -> Option<&SchemaRef> {
        self.properties.get(name)
    }

    /// Names listed in `required`
    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub(crate) fn evaluate<'a>(&'a self, frame: &Frame<'a>, cx: &mut Traversal<'a>) {
        let Some(object) = frame.instance.as_object() else {
            if self.typed {
                cx.report_type(frame, "object");
            }
            return;
        };

        let count = object.len() as u64;
        if let Some(min) = self.min_properties.filter(|min| count < *min) {
            cx.report(
                frame,
                ErrorKind::Count,
                format!("too few properties: expected at least {}", min),
            );
        }
        if let Some(max) = self.max_properties.filter(|max| count > *max) {
            cx.report(
                frame,
                ErrorKind::Count,
                format!("too many properties: expected at most {}", max),
            );
        }

        for name in &self.required {
            if !object.contains_key(name) {
                cx.report(
                    frame,
                    ErrorKind::Required,
                    format!("missing required property: {}", name),
                );
            }
        }

        for (trigger, dependents) in &self.dependent_required {
            if !object.contains_key(trigger) {
                continue;
            }
            for dependent in dependents {
                if !object.contains_key(dependent) {
                    cx.report(
                        frame,
                        ErrorKind::Required,
                        format!("property '{}' requires property '{}'", trigger, dependent),
                    );
                }
            }
        }

        for (trigger, schema) in &self.dependent_schemas {
            if !object.contains_key(trigger) {
                continue;
            }
            if schema.is_never() {
                cx.report(
                    frame,
                    ErrorKind::Property,
                    format!("property '{}' forbids this object (dependentSchemas is false)", trigger),
                );
            } else {
                cx.defer(frame, schema);
            }
        }

        if let Some(names) = &self.property_names {
            let mut keys = Vec::with_capacity(object.len());
            for key in object.keys() {
                keys.push((key.as_str(), cx.isolate(frame.scope)));
            }
            let branches = keys.clone();
            cx.join(Join::PropertyNames { frame: *frame, keys });
            for (key, scope) in branches {
                cx.defer_at(scope, frame.path, names, Instance::Key(key));
            }
        }

        // Reverse so the first property is evaluated first.
        for (name, value) in object.iter().rev() {
            let path = cx.property_path(frame.path, name);
            let exact = self.properties.get(name);
            let mut matched = exact.is_some();

            let mut patterned = Vec::new();
            for (regex, schema) in &self.pattern_properties {
                if regex.is_match(name) {
                    patterned.push(schema);
                    matched = true;
                }
            }

            if !matched {
                match &self.additional {
                    AdditionalProperties::Allowed => {}
                    AdditionalProperties::Forbidden => cx.report_at(
                        frame.scope,
                        path,
                        ErrorKind::Property,
                        "additional properties not allowed",
                    ),
                    AdditionalProperties::Schema(schema) => {
                        cx.defer_at(frame.scope, path, schema, Instance::Value(value))
                    }
                }
                continue;
            }

            for schema in patterned.into_iter().rev() {
                cx.defer_at(frame.scope, path, schema, Instance::Value(value));
            }
            if let Some(schema) = exact {
                cx.defer_at(frame.scope, path, schema, Instance::Value(value));
            }
        }
    }
}
