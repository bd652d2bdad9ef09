//! Compiling the JSON of one document into schema nodes
//!
//! A [`Walker`] turns raw schema objects into [`Schema`] nodes and records
//! every compiled location in the document's pointer index. `$ref`s become
//! keyed [`RefSchema`] nodes immediately; whether their targets exist is
//! settled by the session once the walk is done.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use super::classify::{classify, RefToken};
use super::keywords::{
    self, has_any, location, Keywords, ARRAY_KEYWORDS, NUMBER_KEYWORDS, OBJECT_KEYWORDS,
    STRING_KEYWORDS,
};
use super::pointer::child;
use crate::error::{CompileError, CompileResult};
use crate::registry::{fragment_key, PointerIndex};
use crate::schema::{
    AdditionalProperties, ArraySchema, Bound, ConditionalSchema, ConstSchema, EnumSchema, Format,
    NumberSchema, ObjectSchema, RefSchema, RootRef, Schema, SchemaRef, StringSchema,
};
use schemastack_core::json::type_name;
use schemastack_core::DocumentUri;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Deepest subschema nesting accepted in one walk
pub(crate) const MAX_NESTING: usize = 128;

/// Deepest array/object nesting accepted in a whole document, keywords and
/// `const`/`enum` values included
pub(crate) const MAX_VALUE_DEPTH: usize = 1024;

/// A `$ref` met during a walk, not yet checked against its target
#[derive(Debug, Clone)]
pub(crate) struct PendingRef {
    pub(crate) reference: String,
    pub(crate) token: RefToken,
}

/// Forms built from one schema object's keywords, before `type` picks
/// among them
#[derive(Default)]
struct Families {
    object: Option<ObjectSchema>,
    array: Option<ArraySchema>,
    string: Option<StringSchema>,
    number: Option<NumberSchema>,
}

pub(crate) struct Walker<'d> {
    doc: &'d DocumentUri,
    base: &'d DocumentUri,
    aliases: &'d HashMap<DocumentUri, DocumentUri>,
    assert_formats: bool,
    index: &'d mut PointerIndex,
    pending: &'d mut Vec<PendingRef>,
}

impl<'d> Walker<'d> {
    pub(crate) fn new(
        doc: &'d DocumentUri,
        base: &'d DocumentUri,
        aliases: &'d HashMap<DocumentUri, DocumentUri>,
        assert_formats: bool,
        index: &'d mut PointerIndex,
        pending: &'d mut Vec<PendingRef>,
    ) -> Self {
        Self {
            doc,
            base,
            aliases,
            assert_formats,
            index,
            pending,
        }
    }

    /// Compile the subschema found at `pointer` (`""` for the root)
    pub(crate) fn compile(&mut self, value: &Value, pointer: &str) -> CompileResult<SchemaRef> {
        self.compile_at(value, pointer, 0)
    }

    fn compile_at(&mut self, value: &Value, pointer: &str, depth: usize) -> CompileResult<SchemaRef> {
        let key = fragment_key(pointer);
        if let Some(existing) = self.index.get(&key) {
            return Ok(existing.clone());
        }
        if depth > MAX_NESTING {
            return Err(CompileError::invalid_schema(
                location(pointer),
                format!("subschemas nest deeper than {} levels", MAX_NESTING),
            ));
        }

        let schema = match value {
            Value::Bool(true) => Schema::any(),
            Value::Bool(false) => Schema::never(),
            Value::Object(map) => self.object(map, pointer, depth)?,
            other => {
                return Err(CompileError::invalid_schema(
                    location(pointer),
                    format!("expected an object or boolean, found {}", type_name(other)),
                ))
            }
        };

        self.index.insert(key, schema.clone());
        if let Some(anchor) = value.get("$anchor").and_then(Value::as_str) {
            let anchor_key = fragment_key(anchor);
            if self.index.contains_key(&anchor_key) {
                tracing::warn!(anchor, document = %self.doc, "duplicate $anchor, keeping the first");
            } else {
                self.index.insert(anchor_key, schema.clone());
            }
        }
        Ok(schema)
    }

    fn child(&mut self, value: &Value, pointer: &str, depth: usize) -> CompileResult<SchemaRef> {
        self.compile_at(value, pointer, depth + 1)
    }

    fn children(
        &mut self,
        items: &[Value],
        pointer: &str,
        depth: usize,
    ) -> CompileResult<Vec<SchemaRef>> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| self.child(item, &format!("{}/{}", pointer, index), depth))
            .collect()
    }

    fn object(&mut self, map: &Map<String, Value>, pointer: &str, depth: usize) -> CompileResult<SchemaRef> {
        let kw = Keywords::new(map, pointer);

        if let Some(defs) = kw.object("$defs")? {
            let defs_pointer = child(pointer, "$defs");
            for (name, def) in defs {
                self.child(def, &child(&defs_pointer, name), depth)?;
            }
        }

        let mut parts: Vec<SchemaRef> = Vec::new();

        if let Some(reference) = kw.get("$ref") {
            let reference = reference
                .as_str()
                .ok_or_else(|| kw.keyword_error("$ref", "expected a string"))?;
            parts.push(self.reference(reference)?);
        }

        let families = self.families(&kw, depth)?;
        let typed = type_part(&kw, families)?;
        match kw.get("enum") {
            Some(Value::Array(values)) => {
                let base = typed.unwrap_or_else(Schema::any);
                parts.push(Arc::new(Schema::Enum(EnumSchema::new(base, values.clone()))));
            }
            Some(_) => return Err(kw.keyword_error("enum", "expected an array")),
            None => parts.extend(typed),
        }

        if let Some(value) = kw.get("const") {
            parts.push(Arc::new(Schema::Const(ConstSchema {
                value: value.clone(),
            })));
        }

        if let Some(items) = kw.schema_array("allOf")? {
            let branches = self.children(items, &child(pointer, "allOf"), depth)?;
            parts.push(Arc::new(Schema::AllOf(branches)));
        }
        if let Some(items) = kw.schema_array("anyOf")? {
            let branches = self.children(items, &child(pointer, "anyOf"), depth)?;
            parts.push(Arc::new(Schema::AnyOf(branches)));
        }
        if let Some(items) = kw.schema_array("oneOf")? {
            let branches = self.children(items, &child(pointer, "oneOf"), depth)?;
            parts.push(Arc::new(Schema::OneOf(branches)));
        }
        if let Some(inner) = kw.get("not") {
            let inner = self.child(inner, &child(pointer, "not"), depth)?;
            parts.push(Arc::new(Schema::Not(inner)));
        }
        if let Some(condition) = kw.get("if") {
            let if_schema = self.child(condition, &child(pointer, "if"), depth)?;
            let then_schema = match kw.get("then") {
                Some(value) => Some(self.child(value, &child(pointer, "then"), depth)?),
                None => None,
            };
            let else_schema = match kw.get("else") {
                Some(value) => Some(self.child(value, &child(pointer, "else"), depth)?),
                None => None,
            };
            parts.push(Arc::new(Schema::Conditional(ConditionalSchema {
                if_schema,
                then_schema,
                else_schema,
            })));
        }

        Ok(match parts.len() {
            0 => Schema::any(),
            1 => parts.remove(0),
            _ => Arc::new(Schema::AllOf(parts)),
        })
    }

    fn reference(&mut self, reference: &str) -> CompileResult<SchemaRef> {
        let token = match classify(reference, self.base)? {
            RefToken::Remote {
                base,
                target,
                fragment,
            } => {
                let target = self.aliases.get(&target).cloned().unwrap_or(target);
                if &target == self.doc {
                    RefToken::Local {
                        fragment: fragment.unwrap_or_default(),
                    }
                } else {
                    RefToken::Remote {
                        base,
                        target,
                        fragment,
                    }
                }
            }
            local => local,
        };

        if let RefToken::Local { fragment } = &token {
            if fragment.is_empty() {
                return Ok(Arc::new(Schema::RootRef(RootRef::new(self.doc.clone()))));
            }
        }
        self.pending.push(PendingRef {
            reference: reference.to_string(),
            token: token.clone(),
        });
        Ok(Arc::new(Schema::Ref(RefSchema::new(self.doc.clone(), token, reference))))
    }

    fn families(&mut self, kw: &Keywords<'_>, depth: usize) -> CompileResult<Families> {
        let mut families = Families::default();
        if has_any(kw.map, OBJECT_KEYWORDS) {
            families.object = Some(self.object_form(kw, depth)?);
        }
        if has_any(kw.map, ARRAY_KEYWORDS) {
            families.array = Some(self.array_form(kw, depth)?);
        }
        if has_any(kw.map, STRING_KEYWORDS) {
            families.string = Some(self.string_form(kw)?);
        }
        if has_any(kw.map, NUMBER_KEYWORDS) {
            families.number = Some(number_form(kw)?);
        }
        Ok(families)
    }

    fn object_form(&mut self, kw: &Keywords<'_>, depth: usize) -> CompileResult<ObjectSchema> {
        let pointer = kw.pointer;
        let mut form = ObjectSchema::default();

        if let Some(properties) = kw.object("properties")? {
            let base = child(pointer, "properties");
            for (name, value) in properties {
                let schema = self.child(value, &child(&base, name), depth)?;
                form.properties.insert(name.clone(), schema);
            }
        }

        form.required = kw.string_list("required")?.unwrap_or_default();

        form.additional = match kw.get("additionalProperties") {
            None | Some(Value::Bool(true)) => AdditionalProperties::Allowed,
            Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
            Some(value) => AdditionalProperties::Schema(self.child(
                value,
                &child(pointer, "additionalProperties"),
                depth,
            )?),
        };

        if let Some(patterns) = kw.object("patternProperties")? {
            let base = child(pointer, "patternProperties");
            for (source, value) in patterns {
                let regex = kw.regex("patternProperties", source)?;
                let schema = self.child(value, &child(&base, source), depth)?;
                form.pattern_properties.push((regex, schema));
            }
        }

        if let Some(value) = kw.get("propertyNames") {
            form.property_names = Some(self.child(value, &child(pointer, "propertyNames"), depth)?);
        }

        form.min_properties = kw.count("minProperties")?;
        form.max_properties = kw.count("maxProperties")?;

        if let Some(dependent) = kw.object("dependentRequired")? {
            for (trigger, value) in dependent {
                let names = keywords::string_list(value).ok_or_else(|| {
                    kw.keyword_error("dependentRequired", "expected arrays of property names")
                })?;
                form.dependent_required.push((trigger.clone(), names));
            }
        }

        if let Some(dependent) = kw.object("dependentSchemas")? {
            let base = child(pointer, "dependentSchemas");
            for (trigger, value) in dependent {
                let schema = self.child(value, &child(&base, trigger), depth)?;
                form.dependent_schemas.push((trigger.clone(), schema));
            }
        }

        // Older drafts spell both dependent forms as `dependencies`.
        if let Some(dependencies) = kw.object("dependencies")? {
            let base = child(pointer, "dependencies");
            for (trigger, value) in dependencies {
                match keywords::string_list(value) {
                    Some(names) => form.dependent_required.push((trigger.clone(), names)),
                    None => {
                        let schema = self.child(value, &child(&base, trigger), depth)?;
                        form.dependent_schemas.push((trigger.clone(), schema));
                    }
                }
            }
        }

        Ok(form)
    }

    fn array_form(&mut self, kw: &Keywords<'_>, depth: usize) -> CompileResult<ArraySchema> {
        let pointer = kw.pointer;
        let mut form = ArraySchema::default();

        if let Some(Value::Array(prefix)) = kw.get("prefixItems") {
            form.prefix_items = self.children(prefix, &child(pointer, "prefixItems"), depth)?;
        } else if kw.get("prefixItems").is_some() {
            return Err(kw.keyword_error("prefixItems", "expected an array of schemas"));
        }

        match kw.get("items") {
            None => {}
            // Tuple spelling of older drafts: `items` as an array plus
            // `additionalItems` for the rest.
            Some(Value::Array(tuple)) => {
                if kw.get("prefixItems").is_some() {
                    return Err(kw.keyword_error("items", "array form cannot be combined with prefixItems"));
                }
                form.prefix_items = self.children(tuple, &child(pointer, "items"), depth)?;
                if let Some(rest) = kw.get("additionalItems") {
                    form.items = Some(self.child(rest, &child(pointer, "additionalItems"), depth)?);
                }
            }
            Some(value) => {
                form.items = Some(self.child(value, &child(pointer, "items"), depth)?);
            }
        }

        form.min_items = kw.count("minItems")?;
        form.max_items = kw.count("maxItems")?;
        form.unique_items = kw.boolean("uniqueItems")?.unwrap_or(false);

        if let Some(value) = kw.get("contains") {
            form.contains = Some(self.child(value, &child(pointer, "contains"), depth)?);
        }
        form.min_contains = kw.count("minContains")?;
        form.max_contains = kw.count("maxContains")?;

        Ok(form)
    }

    fn string_form(&self, kw: &Keywords<'_>) -> CompileResult<StringSchema> {
        let mut form = StringSchema {
            min_length: kw.count("minLength")?,
            max_length: kw.count("maxLength")?,
            assert_format: self.assert_formats,
            ..StringSchema::default()
        };
        if let Some(source) = kw.string("pattern")? {
            form.pattern = Some(kw.regex("pattern", source)?);
        }
        if let Some(name) = kw.string("format")? {
            form.format = Format::from_name(name);
            if form.format.is_none() {
                tracing::warn!(
                    format = name,
                    pointer = %location(kw.pointer),
                    document = %self.doc,
                    "unknown format ignored"
                );
            }
        }
        Ok(form)
    }
}

/// Choose forms according to `type`, or infer them from the keywords
fn type_part(kw: &Keywords<'_>, families: Families) -> CompileResult<Option<SchemaRef>> {
    match kw.get("type") {
        None => {
            let mut inferred: Vec<SchemaRef> = Vec::new();
            if let Some(object) = families.object {
                inferred.push(Arc::new(Schema::Object(object)));
            }
            if let Some(array) = families.array {
                inferred.push(Arc::new(Schema::Array(array)));
            }
            if let Some(string) = families.string {
                inferred.push(Arc::new(Schema::String(string)));
            }
            if let Some(number) = families.number {
                inferred.push(Arc::new(Schema::Number(number)));
            }
            Ok(match inferred.len() {
                0 => None,
                1 => Some(inferred.remove(0)),
                _ => Some(Arc::new(Schema::AllOf(inferred))),
            })
        }
        Some(Value::String(name)) => Ok(Some(Arc::new(typed_form(kw, name, &families)?))),
        Some(Value::Array(names)) => {
            let names = names
                .iter()
                .map(Value::as_str)
                .collect::<Option<Vec<&str>>>()
                .filter(|names| !names.is_empty())
                .ok_or_else(|| kw.keyword_error("type", "expected a non-empty array of type names"))?;
            let mut forms = names
                .iter()
                .map(|name| typed_form(kw, name, &families).map(Arc::new))
                .collect::<CompileResult<Vec<SchemaRef>>>()?;
            Ok(Some(if forms.len() == 1 {
                forms.remove(0)
            } else {
                Arc::new(Schema::AnyOf(forms))
            }))
        }
        Some(_) => Err(kw.keyword_error("type", "expected a string or an array of strings")),
    }
}

/// The form a single `type` name selects, marked as typed
fn typed_form(kw: &Keywords<'_>, name: &str, families: &Families) -> CompileResult<Schema> {
    Ok(match name {
        "object" => Schema::Object(ObjectSchema {
            typed: true,
            ..families.object.clone().unwrap_or_default()
        }),
        "array" => Schema::Array(ArraySchema {
            typed: true,
            ..families.array.clone().unwrap_or_default()
        }),
        "string" => Schema::String(StringSchema {
            typed: true,
            ..families.string.clone().unwrap_or_default()
        }),
        "number" | "integer" => Schema::Number(NumberSchema {
            typed: true,
            integer: name == "integer",
            ..families.number.clone().unwrap_or_default()
        }),
        "boolean" => Schema::Boolean,
        "null" => Schema::Null,
        other => return Err(kw.keyword_error("type", format!("unknown type '{}'", other))),
    })
}

fn number_form(kw: &Keywords<'_>) -> CompileResult<NumberSchema> {
    let mut form = NumberSchema {
        minimum: lower_bound(kw)?,
        maximum: upper_bound(kw)?,
        ..NumberSchema::default()
    };
    if let Some((divisor, text)) = kw.number("multipleOf")? {
        if divisor.is_zero() || divisor.is_negative() {
            return Err(kw.keyword_error("multipleOf", "must be greater than 0"));
        }
        form.multiple_of = Some((divisor, text));
    }
    Ok(form)
}

/// `minimum` and `exclusiveMinimum` folded into the tighter single bound
fn lower_bound(kw: &Keywords<'_>) -> CompileResult<Option<Bound>> {
    let inclusive = kw.number("minimum")?;
    match kw.get("exclusiveMinimum") {
        None => Ok(inclusive.map(|(value, text)| Bound::new(value, false, text))),
        Some(Value::Bool(exclusive)) => {
            Ok(inclusive.map(|(value, text)| Bound::new(value, *exclusive, text)))
        }
        Some(_) => {
            let exclusive = kw.number("exclusiveMinimum")?;
            Ok(match (inclusive, exclusive) {
                (Some((min, min_text)), Some((excl, excl_text))) => Some(if excl >= min {
                    Bound::new(excl, true, excl_text)
                } else {
                    Bound::new(min, false, min_text)
                }),
                (Some((min, text)), None) => Some(Bound::new(min, false, text)),
                (None, Some((excl, text))) => Some(Bound::new(excl, true, text)),
                (None, None) => None,
            })
        }
    }
}

fn upper_bound(kw: &Keywords<'_>) -> CompileResult<Option<Bound>> {
    let inclusive = kw.number("maximum")?;
    match kw.get("exclusiveMaximum") {
        None => Ok(inclusive.map(|(value, text)| Bound::new(value, false, text))),
        Some(Value::Bool(exclusive)) => {
            Ok(inclusive.map(|(value, text)| Bound::new(value, *exclusive, text)))
        }
        Some(_) => {
            let exclusive = kw.number("exclusiveMaximum")?;
            Ok(match (inclusive, exclusive) {
                (Some((max, max_text)), Some((excl, excl_text))) => Some(if excl <= max {
                    Bound::new(excl, true, excl_text)
                } else {
                    Bound::new(max, false, max_text)
                }),
                (Some((max, text)), None) => Some(Bound::new(max, false, text)),
                (None, Some((excl, text))) => Some(Bound::new(excl, true, text)),
                (None, None) => None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn walk(value: &Value) -> (SchemaRef, PointerIndex, Vec<PendingRef>) {
        let doc = DocumentUri::entry();
        let aliases = HashMap::new();
        let mut index = PointerIndex::new();
        let mut pending = Vec::new();
        let root = Walker::new(&doc, &doc, &aliases, false, &mut index, &mut pending)
            .compile(value, "")
            .unwrap();
        (root, index, pending)
    }

    #[test]
    fn test_indexes_every_walked_location() {
        let (_, index, _) = walk(&json!({
            "type": "object",
            "properties": {"a/b": {"type": "string"}},
            "$defs": {"n": {"$anchor": "num", "type": "number"}},
            "items": [true, false]
        }));
        for key in ["#", "#/properties/a~1b", "#/$defs/n", "#num", "#/items/0", "#/items/1"] {
            assert!(index.contains_key(key), "missing {}", key);
        }
    }

    #[test]
    fn test_pure_ref_stays_a_ref() {
        let (root, _, pending) = walk(&json!({"$ref": "#/$defs/a", "title": "t", "$defs": {"a": true}}));
        assert!(matches!(&*root, Schema::Ref(_)));
        assert_eq!(pending.len(), 1);

        let (root, _, pending) = walk(&json!({"$ref": "#"}));
        assert!(matches!(&*root, Schema::RootRef(_)));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_ref_with_siblings_becomes_all_of() {
        let (root, _, _) = walk(&json!({"$ref": "#/$defs/a", "minLength": 1, "$defs": {"a": true}}));
        match &*root {
            Schema::AllOf(parts) => {
                assert!(matches!(&*parts[0], Schema::Ref(_)));
                assert!(matches!(&*parts[1], Schema::String(s) if !s.typed));
            }
            other => panic!("unexpected form {}", other.form_name()),
        }
    }

    #[test]
    fn test_type_array_and_enum_base() {
        let (root, _, _) = walk(&json!({"type": ["string", "null"], "maxLength": 3}));
        assert!(matches!(&*root, Schema::AnyOf(forms) if forms.len() == 2));

        let (root, _, _) = walk(&json!({"type": "integer", "enum": [1, 2]}));
        match &*root {
            Schema::Enum(e) => assert!(matches!(&*e.base, Schema::Number(n) if n.integer)),
            other => panic!("unexpected form {}", other.form_name()),
        }
    }

    #[test]
    fn test_bounds_fold_to_tighter() {
        let (root, _, _) = walk(&json!({"minimum": 1, "exclusiveMinimum": 5, "maximum": 10, "exclusiveMaximum": true}));
        match &*root {
            Schema::Number(n) => {
                let min = n.minimum.as_ref().unwrap();
                assert!(min.exclusive);
                assert_eq!(min.text, "5");
                let max = n.maximum.as_ref().unwrap();
                assert!(max.exclusive);
                assert_eq!(max.text, "10");
            }
            other => panic!("unexpected form {}", other.form_name()),
        }
    }

    #[test]
    fn test_rejects_malformed_keywords() {
        let doc = DocumentUri::entry();
        let aliases = HashMap::new();
        for schema in [
            json!({"multipleOf": 0}),
            json!({"type": "text"}),
            json!({"minLength": -1}),
            json!({"pattern": "("}),
            json!({"anyOf": []}),
            json!({"properties": {"a": 3}}),
        ] {
            let mut index = PointerIndex::new();
            let mut pending = Vec::new();
            let result = Walker::new(&doc, &doc, &aliases, false, &mut index, &mut pending).compile(&schema, "");
            assert!(result.is_err(), "accepted {}", schema);
        }
    }

    #[test]
    fn test_nesting_guard() {
        let mut schema = json!(true);
        for _ in 0..(MAX_NESTING + 5) {
            schema = json!({"not": schema});
        }
        let doc = DocumentUri::entry();
        let aliases = HashMap::new();
        let mut index = PointerIndex::new();
        let mut pending = Vec::new();
        let err = Walker::new(&doc, &doc, &aliases, false, &mut index, &mut pending)
            .compile(&schema, "")
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidSchema { .. }));
    }
}
