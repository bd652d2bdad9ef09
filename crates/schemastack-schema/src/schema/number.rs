//! Numeric keywords with exact decimal bounds
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use crate::validation::{ErrorKind, Frame, Traversal};
use schemastack_core::Decimal;

/// One side of a numeric range
#[derive(Debug, Clone)]
pub struct Bound {
    pub(crate) value: Decimal,
    pub(crate) exclusive: bool,
    /// The bound as written in the schema, for messages
    pub(crate) text: String,
}

impl Bound {
    pub(crate) fn new(value: Decimal, exclusive: bool, text: impl Into<String>) -> Self {
        Self {
            value,
            exclusive,
            text: text.into(),
        }
    }

    pub fn value(&self) -> &Decimal {
        &self.value
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }
}

/// Numeric keywords; `integer` is set for `type: integer`
#[derive(Debug, Clone, Default)]
pub struct NumberSchema {
    pub(crate) typed: bool,
    pub(crate) integer: bool,
    pub(crate) minimum: Option<Bound>,
    pub(crate) maximum: Option<Bound>,
    pub(crate) multiple_of: Option<(Decimal, String)>,
}

impl NumberSchema {
    pub(crate) fn evaluate<'a>(&'a self, frame: &Frame<'a>, cx: &mut Traversal<'a>) {
        let Some(number) = frame.instance.as_number() else {
            if self.typed {
                cx.report_type(frame, if self.integer { "integer" } else { "number" });
            }
            return;
        };
        // Numbers from `serde_json` always follow the JSON grammar.
        let Ok(value) = Decimal::parse(&number.to_string()) else {
            cx.report(frame, ErrorKind::Type, "number is not representable");
            return;
        };

        if self.integer && !value.is_integer() {
            cx.report(frame, ErrorKind::Type, "expected integer, found number");
        }

        if let Some(min) = &self.minimum {
            if min.exclusive && value <= min.value {
                cx.report(frame, ErrorKind::Range, format!("must be greater than {}", min.text));
            } else if !min.exclusive && value < min.value {
                cx.report(frame, ErrorKind::Range, format!("below minimum {}", min.text));
            }
        }
        if let Some(max) = &self.maximum {
            if max.exclusive && value >= max.value {
                cx.report(frame, ErrorKind::Range, format!("must be less than {}", max.text));
            } else if !max.exclusive && value > max.value {
                cx.report(frame, ErrorKind::Range, format!("above maximum {}", max.text));
            }
        }

        if let Some((divisor, text)) = &self.multiple_of {
            if !value.is_multiple_of(divisor) {
                cx.report(frame, ErrorKind::MultipleOf, format!("not a multiple of {}", text));
            }
        }
    }
}
