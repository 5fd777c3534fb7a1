use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

/// Unit suffixes tolerated (and discarded) on numeric strings, longest first.
const UNIT_SUFFIXES: [&str; 6] = ["万円", "円", "%", "m2", "年", "ヶ月"];

/// Outcome of coercing one raw JSON value into a decimal.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// Key absent, `null`, or an empty string
    Missing,
    /// Present but not interpretable as a finite number
    Invalid,
    Value(Decimal),
}

/// Closed interval a numeric field is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl NumericRange {
    pub const fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the range, reporting whether it moved.
    pub fn clamp(&self, value: Decimal) -> (Decimal, bool) {
        if value < self.min {
            (self.min, true)
        } else if value > self.max {
            (self.max, true)
        } else {
            (value, false)
        }
    }
}

/// Interpret a JSON number or numeric-looking string.
///
/// Strings are NFKC-normalised (full-width digits become ASCII), thousands
/// separators and whitespace are stripped, and a trailing unit suffix is
/// ignored. Non-finite values are `Invalid`; finite values beyond the decimal
/// range saturate so that the caller's clamp brings them back into range.
pub fn coerce_decimal(value: Option<&Value>) -> Coerced {
    match value {
        None | Some(Value::Null) => Coerced::Missing,
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Coerced::Value(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Coerced::Value(Decimal::from(u))
            } else {
                n.as_f64().map_or(Coerced::Invalid, from_f64)
            }
        }
        Some(Value::String(s)) => parse_numeric_str(s),
        Some(_) => Coerced::Invalid,
    }
}

fn parse_numeric_str(raw: &str) -> Coerced {
    let normalized: String = raw
        .nfkc()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '_')
        .collect();

    let mut body = normalized.as_str();
    for suffix in UNIT_SUFFIXES {
        if let Some(stripped) = body.strip_suffix(suffix) {
            body = stripped;
            break;
        }
    }

    if body.is_empty() {
        return Coerced::Missing;
    }

    if let Ok(d) = Decimal::from_str(body) {
        return Coerced::Value(d);
    }
    if let Ok(d) = Decimal::from_scientific(body) {
        return Coerced::Value(d);
    }

    match body.parse::<f64>() {
        Ok(f) => from_f64(f),
        Err(_) => Coerced::Invalid,
    }
}

fn from_f64(f: f64) -> Coerced {
    if !f.is_finite() {
        return Coerced::Invalid;
    }
    match Decimal::from_f64(f) {
        Some(d) => Coerced::Value(d),
        None if f > 0.0 => Coerced::Value(Decimal::MAX),
        None if f < 0.0 => Coerced::Value(Decimal::MIN),
        None => Coerced::Value(Decimal::ZERO),
    }
}
