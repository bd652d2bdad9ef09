//! Normalized document identifiers
//!
//! A [`DocumentUri`] names one schema document. Parsing through `url`
//! lower-cases scheme and host and removes `.`/`..` path segments; the
//! fragment is stripped so every reference into the same document shares
//! one key.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// The URI given to an entry schema that is supplied in memory
pub const DEFAULT_ENTRY_URI: &str = "urn:inmemory:root";

/// URI parsing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    /// The text is not an absolute URI
    #[error("Invalid document URI '{uri}': {reason}")]
    Invalid { uri: String, reason: String },

    /// A reference could not be joined onto its base
    #[error("Cannot resolve '{reference}' against '{base}': {reason}")]
    Unjoinable {
        reference: String,
        base: String,
        reason: String,
    },
}

/// Normalized, fragment-free absolute URI of a schema document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentUri(Url);

impl DocumentUri {
    /// Parse and normalize an absolute URI, dropping any fragment
    pub fn parse(text: &str) -> Result<Self, UriError> {
        let url = Url::parse(text).map_err(|e| UriError::Invalid {
            uri: text.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_url(url))
    }

    /// Normalize an already-parsed URL
    pub fn from_url(mut url: Url) -> Self {
        url.set_fragment(None);
        Self(url)
    }

    /// URI assigned to schemas compiled from memory
    pub fn entry() -> Self {
        // DEFAULT_ENTRY_URI is a constant, valid URN
        match Url::parse(DEFAULT_ENTRY_URI) {
            Ok(url) => Self(url),
            Err(_) => unreachable!("default entry URI is valid"),
        }
    }

    /// Resolve a reference against this document.
    ///
    /// Returns the target document and the fragment (without `#`) when the
    /// reference carried one.
    pub fn join(&self, reference: &str) -> Result<(DocumentUri, Option<String>), UriError> {
        let joined = self.0.join(reference).map_err(|e| UriError::Unjoinable {
            reference: reference.to_string(),
            base: self.0.to_string(),
            reason: e.to_string(),
        })?;
        let fragment = joined.fragment().map(decode_fragment);
        Ok((Self::from_url(joined), fragment))
    }

    /// The URI scheme, lower-case
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// True when relative references can be joined onto this URI
    pub fn is_hierarchical(&self) -> bool {
        !self.0.cannot_be_a_base()
    }

    /// The underlying URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// The normalized text
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Percent-decode a URI fragment.
///
/// `url` percent-encodes characters such as spaces and quotes in fragments;
/// pointers and anchors are compared in their decoded form. Malformed escapes
/// are kept literally.
pub fn decode_fragment(fragment: &str) -> String {
    if !fragment.contains('%') {
        return fragment.to_string();
    }
    let bytes = fragment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| fragment.to_string())
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl std::str::FromStr for DocumentUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentUri {
    type Error = UriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocumentUri> for String {
    fn from(uri: DocumentUri) -> Self {
        uri.0.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dot_segments_and_fragment_normalize_to_same_document() {
        let a = DocumentUri::parse("http://Example.com/schemas/./a/../b.json#/x").unwrap();
        let b = DocumentUri::parse("http://example.com/schemas/b.json").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "http://example.com/schemas/b.json");
    }

    #[test]
    fn test_join_relative_reference_keeps_fragment() {
        let base = DocumentUri::parse("file:///tmp/schemas/root.json").unwrap();
        let (doc, fragment) = base.join("defs/common.json#/$defs/name").unwrap();
        assert_eq!(doc.as_str(), "file:///tmp/schemas/defs/common.json");
        assert_eq!(fragment.as_deref(), Some("/$defs/name"));
    }

    #[test]
    fn test_urn_entry_is_not_hierarchical() {
        let entry = DocumentUri::entry();
        assert_eq!(entry.as_str(), DEFAULT_ENTRY_URI);
        assert!(!entry.is_hierarchical());
        assert!(entry.join("other.json").is_err());
    }

    #[test]
    fn test_fragment_percent_decoding() {
        let base = DocumentUri::parse("http://x/a.json").unwrap();
        let (_, fragment) = base.join("b.json#/with%20space").unwrap();
        assert_eq!(fragment.as_deref(), Some("/with space"));
    }

    #[test]
    fn test_serde_round_trip_uses_string_form() {
        let uri = DocumentUri::parse("https://example.com/s.json").unwrap();
        let text = serde_json::to_string(&uri).unwrap();
        assert_eq!(text, "\"https://example.com/s.json\"");
    }
}
