//! Reading keyword values out of a raw schema object
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use crate::error::{CompileError, CompileResult};
use regex::Regex;
use schemastack_core::Decimal;
use serde_json::{Map, Value};

/// Keywords that make an untyped schema behave as an object form
pub(crate) const OBJECT_KEYWORDS: &[&str] = &[
    "properties",
    "required",
    "additionalProperties",
    "patternProperties",
    "propertyNames",
    "minProperties",
    "maxProperties",
    "dependentRequired",
    "dependentSchemas",
    "dependencies",
];

pub(crate) const ARRAY_KEYWORDS: &[&str] = &[
    "items",
    "prefixItems",
    "additionalItems",
    "minItems",
    "maxItems",
    "uniqueItems",
    "contains",
    "minContains",
    "maxContains",
];

pub(crate) const STRING_KEYWORDS: &[&str] = &["minLength", "maxLength", "pattern", "format"];

pub(crate) const NUMBER_KEYWORDS: &[&str] = &[
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
];

pub(crate) fn has_any(map: &Map<String, Value>, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| map.contains_key(*keyword))
}

/// Borrowed view of one schema object with its pointer, for error labels
pub(crate) struct Keywords<'v> {
    pub(crate) map: &'v Map<String, Value>,
    pub(crate) pointer: &'v str,
}

impl<'v> Keywords<'v> {
    pub(crate) fn new(map: &'v Map<String, Value>, pointer: &'v str) -> Self {
        Self { map, pointer }
    }

    pub(crate) fn get(&self, keyword: &str) -> Option<&'v Value> {
        self.map.get(keyword)
    }

    fn invalid(&self, keyword: &str, reason: impl Into<String>) -> CompileError {
        CompileError::invalid_keyword(location(self.pointer), keyword, reason)
    }

    /// A non-negative integer such as `minItems`; `5.0` is accepted
    pub(crate) fn count(&self, keyword: &str) -> CompileResult<Option<u64>> {
        let Some(value) = self.get(keyword) else {
            return Ok(None);
        };
        let invalid = || self.invalid(keyword, "expected a non-negative integer");
        let decimal = Decimal::from_json(value).ok_or_else(invalid)?;
        if decimal.is_negative() || !decimal.is_integer() {
            return Err(invalid());
        }
        // Counts past u64::MAX cannot be reached by any instance.
        Ok(Some(decimal.to_u64().unwrap_or(u64::MAX)))
    }

    pub(crate) fn boolean(&self, keyword: &str) -> CompileResult<Option<bool>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(_) => Err(self.invalid(keyword, "expected a boolean")),
        }
    }

    pub(crate) fn string(&self, keyword: &str) -> CompileResult<Option<&'v str>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.as_str())),
            Some(_) => Err(self.invalid(keyword, "expected a string")),
        }
    }

    /// A number, with its original spelling for messages
    pub(crate) fn number(&self, keyword: &str) -> CompileResult<Option<(Decimal, String)>> {
        let Some(value) = self.get(keyword) else {
            return Ok(None);
        };
        match value {
            Value::Number(number) => {
                let text = number.to_string();
                let decimal = Decimal::parse(&text).map_err(|err| self.invalid(keyword, err.to_string()))?;
                Ok(Some((decimal, text)))
            }
            _ => Err(self.invalid(keyword, "expected a number")),
        }
    }

    pub(crate) fn string_list(&self, keyword: &str) -> CompileResult<Option<Vec<String>>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(value) => string_list(value)
                .map(Some)
                .ok_or_else(|| self.invalid(keyword, "expected an array of strings")),
        }
    }

    pub(crate) fn regex(&self, keyword: &str, source: &str) -> CompileResult<Regex> {
        Regex::new(source).map_err(|err| self.invalid(keyword, format!("invalid regex '{}': {}", source, err)))
    }

    /// An object-valued keyword such as `properties`
    pub(crate) fn object(&self, keyword: &str) -> CompileResult<Option<&'v Map<String, Value>>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(_) => Err(self.invalid(keyword, "expected an object")),
        }
    }

    /// A non-empty array of subschemas such as `allOf`
    pub(crate) fn schema_array(&self, keyword: &str) -> CompileResult<Option<&'v Vec<Value>>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(Value::Array(items)) if !items.is_empty() => Ok(Some(items)),
            Some(_) => Err(self.invalid(keyword, "expected a non-empty array of schemas")),
        }
    }

    pub(crate) fn keyword_error(&self, keyword: &str, reason: impl Into<String>) -> CompileError {
        self.invalid(keyword, reason)
    }
}

pub(crate) fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Pointer as shown in errors: `#` for the root
pub(crate) fn location(pointer: &str) -> String {
    format!("#{}", pointer)
}
