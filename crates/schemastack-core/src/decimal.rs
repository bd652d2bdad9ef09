//! Exact decimal arithmetic for JSON numbers
//!
//! JSON numbers are kept as their lexical text by the value model. A
//! [`Decimal`] is that text decoded into `magnitude * 10^exponent`, which lets
//! bounds checks, equality and `multipleOf` run without binary floating point.
//! Values are normalized on construction (no trailing zeros in the
//! magnitude), so structural equality is numeric equality: `1`, `1.0` and
//! `10e-1` are the same decimal.
//!
//! Copyright (c) 2025 Schemastack Team
//! Licensed under the Apache-2.0 license

use num_bigint::BigUint;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Decimal parsing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecimalError {
    /// Not a JSON number literal
    #[error("Invalid number literal '{text}'")]
    Invalid { text: String },

    /// Exponent does not fit the supported range
    #[error("Number exponent out of range in '{text}'")]
    ExponentOverflow { text: String },
}

/// An exact, arbitrary-precision decimal number
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    magnitude: BigUint,
    exponent: i64,
    digits: u64,
}

impl Decimal {
    /// Parse a JSON number literal such as `-12.50e3`
    pub fn parse(text: &str) -> Result<Self, DecimalError> {
        let invalid = || DecimalError::Invalid {
            text: text.to_string(),
        };
        let overflow = || DecimalError::ExponentOverflow {
            text: text.to_string(),
        };

        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (mantissa, exp_text) = match rest.find(['e', 'E']) {
            Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
            None => (rest, None),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (mantissa, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
            || (mantissa.contains('.') && frac_part.is_empty())
        {
            return Err(invalid());
        }

        let mut exponent: i64 = match exp_text {
            Some(exp) => {
                let digits = exp.strip_prefix(['+', '-']).unwrap_or(exp);
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                exp.parse::<i64>().map_err(|_| overflow())?
            }
            None => 0,
        };
        let frac_len = i64::try_from(frac_part.len()).map_err(|_| overflow())?;
        exponent = exponent.checked_sub(frac_len).ok_or_else(overflow)?;

        let mut all_digits = String::with_capacity(int_part.len() + frac_part.len());
        all_digits.push_str(int_part.trim_start_matches('0'));
        if all_digits.is_empty() {
            all_digits.push_str(frac_part.trim_start_matches('0'));
        } else {
            all_digits.push_str(frac_part);
        }
        let significant = all_digits.trim_end_matches('0');
        if significant.is_empty() {
            return Ok(Self::zero());
        }
        let trailing = i64::try_from(all_digits.len() - significant.len()).map_err(|_| overflow())?;
        exponent = exponent.checked_add(trailing).ok_or_else(overflow)?;

        let magnitude = BigUint::parse_bytes(significant.as_bytes(), 10).ok_or_else(invalid)?;
        Ok(Self {
            negative,
            magnitude,
            exponent,
            digits: significant.len() as u64,
        })
    }

    /// Decode a JSON number value; `None` for non-numbers
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Self::parse(&n.to_string()).ok(),
            _ => None,
        }
    }

    /// The number zero
    pub fn zero() -> Self {
        Self {
            negative: false,
            magnitude: BigUint::from(0u32),
            exponent: 0,
            digits: 1,
        }
    }

    /// True for zero
    pub fn is_zero(&self) -> bool {
        is_zero(&self.magnitude)
    }

    /// True for values strictly below zero
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// True when the value has no fractional part
    pub fn is_integer(&self) -> bool {
        self.is_zero() || self.exponent >= 0
    }

    /// The value as a `u64` when it is a non-negative integer that fits
    pub fn to_u64(&self) -> Option<u64> {
        if self.is_zero() {
            return Some(0);
        }
        if self.negative || self.exponent < 0 || self.exponent > 19 {
            return None;
        }
        let scaled = &self.magnitude * BigUint::from(10u32).pow(self.exponent as u32);
        u64::try_from(&scaled).ok()
    }

    /// True when `self / divisor` is an integer.
    ///
    /// A zero divisor never divides anything. Signs are ignored.
    pub fn is_multiple_of(&self, divisor: &Decimal) -> bool {
        if divisor.is_zero() {
            return false;
        }
        if self.is_zero() {
            return true;
        }
        if self.exponent < divisor.exponent {
            // Normalized magnitudes carry no factor of ten, so a larger
            // divisor exponent can never divide evenly.
            return false;
        }
        // divisor | self * 10^shift, decided without materializing 10^shift:
        // after removing the common factor, what is left of the divisor must
        // be made of twos and fives, each appearing at most `shift` times.
        let shift = (self.exponent as i128 - divisor.exponent as i128) as u128;
        let common = gcd(self.magnitude.clone(), divisor.magnitude.clone());
        let mut rest = &divisor.magnitude / &common;
        let twos = strip_factor(&mut rest, 2);
        let fives = strip_factor(&mut rest, 5);
        rest == BigUint::from(1u32) && (twos as u128) <= shift && (fives as u128) <= shift
    }

    /// Position of the most significant digit; only meaningful when non-zero
    fn adjusted_exponent(&self) -> i128 {
        self.exponent as i128 + self.digits as i128 - 1
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        match self.adjusted_exponent().cmp(&other.adjusted_exponent()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        // Same leading position: the exponent gap equals the digit-count gap,
        // so aligning is bounded by the literal lengths.
        let gap = (self.exponent as i128 - other.exponent as i128).unsigned_abs();
        let scale = BigUint::from(10u32).pow(gap as u32);
        if self.exponent > other.exponent {
            (&self.magnitude * &scale).cmp(&other.magnitude)
        } else {
            self.magnitude.cmp(&(&other.magnitude * &scale))
        }
    }
}

fn is_zero(value: &BigUint) -> bool {
    value.bits() == 0
}

fn gcd(mut a: BigUint, mut b: BigUint) -> BigUint {
    while !is_zero(&b) {
        let r = &a % &b;
        a = b;
        b = r;
    }
    a
}

fn strip_factor(value: &mut BigUint, factor: u32) -> u64 {
    let mut count = 0;
    while !is_zero(value) && is_zero(&(&*value % factor)) {
        *value /= factor;
        count += 1;
    }
    count
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let self_neg = self.negative && !self.is_zero();
        let other_neg = other.negative && !other.is_zero();
        match (self_neg, other_neg) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (true, true) => self.cmp_magnitude(other).reverse(),
            (false, false) => self.cmp_magnitude(other),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative && !self.is_zero() {
            f.write_str("-")?;
        }
        write!(f, "{}", self.magnitude)?;
        if self.exponent != 0 && !self.is_zero() {
            write!(f, "e{}", self.exponent)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
