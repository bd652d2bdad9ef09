//! JSON value boundary
//!
//! `serde_json::Value` is the value model (ordered objects, numbers kept as
//! lexical text). This module adds the pieces the compiler and validator need
//! on top of it: a parser that rejects duplicate keys instead of silently
//! keeping the last one, and stack-safe structural equality and
//! canonicalization that never recurse on the instance depth.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use crate::decimal::Decimal;
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Result type for parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// JSON text could not be turned into a value
#[derive(Error, Debug)]
pub enum ParseError {
    /// Syntax error reported by the tokenizer
    #[error("Invalid JSON at line {line}, column {column}: {source}")]
    Syntax {
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The same key appeared twice in one object
    #[error("Duplicate key '{key}' at line {line}, column {column}")]
    DuplicateKey {
        key: String,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    /// Line of the offending token (1-based)
    pub fn line(&self) -> usize {
        match self {
            Self::Syntax { line, .. } | Self::DuplicateKey { line, .. } => *line,
        }
    }

    /// Column of the offending token (1-based)
    pub fn column(&self) -> usize {
        match self {
            Self::Syntax { column, .. } | Self::DuplicateKey { column, .. } => *column,
        }
    }
}

/// Parse JSON text, rejecting duplicate object keys at any depth
pub fn parse(text: &str) -> ParseResult<Value> {
    let duplicate = RefCell::new(None);
    let mut de = serde_json::Deserializer::from_str(text);
    let checked = DuplicateCheck {
        duplicate: &duplicate,
    }
    .deserialize(&mut de)
    .and_then(|_| de.end());

    if let Err(err) = checked {
        let (line, column) = (err.line(), err.column());
        return Err(match duplicate.into_inner() {
            Some(key) => ParseError::DuplicateKey { key, line, column },
            None => ParseError::Syntax {
                line,
                column,
                source: err,
            },
        });
    }

    serde_json::from_str(text).map_err(|err| ParseError::Syntax {
        line: err.line(),
        column: err.column(),
        source: err,
    })
}

/// Walks the token stream once without building values, failing on the
/// first repeated key. Depth is bounded by the deserializer's recursion limit.
#[derive(Clone, Copy)]
struct DuplicateCheck<'c> {
    duplicate: &'c RefCell<Option<String>>,
}

impl<'de, 'c> DeserializeSeed<'de> for DuplicateCheck<'c> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de, 'c> Visitor<'de> for DuplicateCheck<'c> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<(), E> {
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<(), E> {
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<(), E> {
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<(), E> {
        Ok(())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<(), E> {
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        Ok(())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        while seq.next_element_seed(self)?.is_some() {}
        Ok(())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let mut seen = HashSet::new();
        while let Some(key) = map.next_key::<String>()? {
            if !seen.insert(key.clone()) {
                *self.duplicate.borrow_mut() = Some(key.clone());
                return Err(de::Error::custom(format!("duplicate key `{}`", key)));
            }
            map.next_value_seed(self)?;
        }
        Ok(())
    }
}

/// Name of a value's JSON type as used in messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// True when arrays and objects nest more than `limit` levels. Scalars and
/// empty containers sit at depth 0. Iterative, so any depth can be checked.
pub fn exceeds_depth(value: &Value, limit: usize) -> bool {
    let mut pending = vec![(value, 0usize)];
    while let Some((value, depth)) = pending.pop() {
        match value {
            Value::Array(items) if !items.is_empty() => {
                if depth == limit {
                    return true;
                }
                pending.extend(items.iter().map(|item| (item, depth + 1)));
            }
            Value::Object(map) if !map.is_empty() => {
                if depth == limit {
                    return true;
                }
                pending.extend(map.values().map(|item| (item, depth + 1)));
            }
            _ => {}
        }
    }
    false
}

fn numbers_equal(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    let (a_text, b_text) = (a.to_string(), b.to_string());
    if a_text == b_text {
        return true;
    }
    match (Decimal::parse(&a_text), Decimal::parse(&b_text)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Structural equality: object key order is ignored and numbers compare by
/// exact decimal value (`1` equals `1.0`). Iterative in the value depth.
pub fn json_equal(left: &Value, right: &Value) -> bool {
    let mut pending = vec![(left, right)];
    while let Some((a, b)) = pending.pop() {
        match (a, b) {
            (Value::Null, Value::Null) => {}
            (Value::Bool(x), Value::Bool(y)) if x == y => {}
            (Value::String(x), Value::String(y)) if x == y => {}
            (Value::Number(x), Value::Number(y)) if numbers_equal(x, y) => {}
            (Value::Array(xs), Value::Array(ys)) if xs.len() == ys.len() => {
                pending.extend(xs.iter().zip(ys.iter()));
            }
            (Value::Object(xs), Value::Object(ys)) if xs.len() == ys.len() => {
                for (key, x) in xs {
                    match ys.get(key) {
                        Some(y) => pending.push((x, y)),
                        None => return false,
                    }
                }
            }
            _ => return false,
        }
    }
    true
}

enum Emit<'v> {
    Value(&'v Value),
    Text(&'static str),
    Key(&'v str),
}

/// Canonical text of a value: object keys sorted, numbers in normalized
/// decimal form, no whitespace. Two values have the same canonical form
/// exactly when [`json_equal`] holds. Used for comparison only.
pub fn canonical_form(value: &Value) -> String {
    let mut out = String::new();
    let mut pending = vec![Emit::Value(value)];
    while let Some(item) = pending.pop() {
        match item {
            Emit::Text(text) => out.push_str(text),
            Emit::Key(key) => {
                push_json_string(&mut out, key);
                out.push(':');
            }
            Emit::Value(Value::Null) => out.push_str("null"),
            Emit::Value(Value::Bool(b)) => out.push_str(if *b { "true" } else { "false" }),
            Emit::Value(Value::Number(n)) => {
                let text = n.to_string();
                match Decimal::parse(&text) {
                    Ok(decimal) => out.push_str(&decimal.to_string()),
                    Err(_) => out.push_str(&text),
                }
            }
            Emit::Value(Value::String(s)) => push_json_string(&mut out, s),
            Emit::Value(Value::Array(items)) => {
                out.push('[');
                pending.push(Emit::Text("]"));
                for (i, item) in items.iter().enumerate().rev() {
                    pending.push(Emit::Value(item));
                    if i > 0 {
                        pending.push(Emit::Text(","));
                    }
                }
            }
            Emit::Value(Value::Object(map)) => {
                out.push('{');
                pending.push(Emit::Text("}"));
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                for (i, (key, item)) in entries.into_iter().enumerate().rev() {
                    pending.push(Emit::Value(item));
                    pending.push(Emit::Key(key));
                    if i > 0 {
                        pending.push(Emit::Text(","));
                    }
                }
            }
        }
    }
    out
}

fn push_json_string(out: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}
