//! String keywords
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use super::Format;
use crate::validation::{ErrorKind, Frame, Traversal};
use regex::Regex;

/// String keywords
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    pub(crate) typed: bool,
    /// Lengths count Unicode scalar values
    pub(crate) min_length: Option<u64>,
    pub(crate) max_length: Option<u64>,
    pub(crate) pattern: Option<Regex>,
    pub(crate) format: Option<Format>,
    /// Format failures are reported only when set
    pub(crate) assert_format: bool,
}

impl StringSchema {
    /// The declared format, asserted or not
    pub fn format(&self) -> Option<Format> {
        self.format
    }

    pub(crate) fn evaluate<'a>(&'a self, frame: &Frame<'a>, cx: &mut Traversal<'a>) {
        let Some(text) = frame.instance.as_str() else {
            if self.typed {
                cx.report_type(frame, "string");
            }
            return;
        };

        if self.min_length.is_some() || self.max_length.is_some() {
            let length = text.chars().count() as u64;
            if let Some(min) = self.min_length.filter(|min| length < *min) {
                cx.report(
                    frame,
                    ErrorKind::Count,
                    format!("string too short: expected at least {} characters", min),
                );
            }
            if let Some(max) = self.max_length.filter(|max| length > *max) {
                cx.report(
                    frame,
                    ErrorKind::Count,
                    format!("string too long: expected at most {} characters", max),
                );
            }
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(text) {
                cx.report(
                    frame,
                    ErrorKind::Pattern,
                    format!("pattern mismatch: '{}'", pattern.as_str()),
                );
            }
        }

        if let Some(format) = self.format.filter(|_| self.assert_format) {
            if !format.is_valid(text) {
                cx.report(
                    frame,
                    ErrorKind::Format,
                    format!("invalid format '{}'", format.name()),
                );
            }
        }
    }
}
