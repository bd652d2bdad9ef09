//! JSON Pointer helpers (RFC 6901)
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use crate::error::{CompileError, CompileResult};
use serde_json::Value;

/// Escape one reference token (`~` → `~0`, `/` → `~1`)
pub(crate) fn escape_token(token: &str) -> String {
    if !token.contains(['~', '/']) {
        return token.to_string();
    }
    token.replace('~', "~0").replace('/', "~1")
}

/// Pointer of a child location
pub(crate) fn child(pointer: &str, token: &str) -> String {
    format!("{}/{}", pointer, escape_token(token))
}

/// Check that every `~` in a pointer starts a valid escape
pub(crate) fn check_escapes(pointer: &str) -> Result<(), String> {
    let bytes = pointer.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'~' && !matches!(bytes.get(i + 1), Some(b'0') | Some(b'1')) {
            return Err(format!("invalid escape at offset {}", i));
        }
    }
    Ok(())
}

/// Split a pointer (`""` or `/a/b`) into unescaped tokens
pub(crate) fn parse(pointer: &str) -> Result<Vec<String>, String> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return Err("pointer must start with '/'".to_string());
    };
    check_escapes(pointer)?;
    Ok(rest
        .split('/')
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Follow `pointer` through `document`.
///
/// `reference` and `document_uri` only label errors. Pointers with more than
/// `max_depth` tokens are refused before any navigation.
pub(crate) fn navigate<'v>(
    document: &'v Value,
    pointer: &str,
    max_depth: usize,
    reference: &str,
    document_uri: &str,
) -> CompileResult<&'v Value> {
    let tokens = parse(pointer).map_err(|reason| CompileError::invalid_pointer(reference, reason))?;
    if tokens.len() > max_depth {
        return Err(CompileError::PointerDepthExceeded {
            pointer: pointer.to_string(),
            max: max_depth,
        });
    }

    let mut current = document;
    for token in &tokens {
        current = match current {
            Value::Object(map) => map.get(token).ok_or_else(|| {
                CompileError::unresolved(reference, document_uri, format!("Property '{}' not found", token))
            })?,
            Value::Array(items) => {
                let index = parse_index(token).ok_or_else(|| {
                    CompileError::unresolved(reference, document_uri, format!("Invalid array index '{}'", token))
                })?;
                items.get(index).ok_or_else(|| {
                    CompileError::unresolved(
                        reference,
                        document_uri,
                        format!("Array index {} out of bounds", index),
                    )
                })?
            }
            _ => {
                return Err(CompileError::unresolved(
                    reference,
                    document_uri,
                    format!("Cannot access '{}' on a non-container value", token),
                ))
            }
        };
    }
    Ok(current)
}

/// Array index token: digits only, no leading zeros
fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Find the pointer of the subschema declaring `$anchor: name`
pub(crate) fn find_anchor(document: &Value, name: &str) -> Option<String> {
    let mut pending = vec![(document, String::new())];
    while let Some((value, pointer)) = pending.pop() {
        match value {
            Value::Object(map) => {
                if map.get("$anchor").and_then(Value::as_str) == Some(name) {
                    return Some(pointer);
                }
                for (key, child_value) in map {
                    if key == "enum" || key == "const" {
                        continue;
                    }
                    pending.push((child_value, child(&pointer, key)));
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    pending.push((item, format!("{}/{}", pointer, index)));
                }
            }
            _ => {}
        }
    }
    None
}
