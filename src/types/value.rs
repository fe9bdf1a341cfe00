use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;


/// A coerced literal: one rule token converted into its declared kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Bool(bool),
    Guid(Uuid),
}

impl Value {
    pub(crate) fn as_number(&self) -> Option<Number> {
        match self {
            Value::Int(v) => Some(Number::Int(i64::from(*v))),
            Value::Long(v) => Some(Number::Int(*v)),
            Value::Double(v) => Some(Number::Float(*v)),
            _ => None,
        }
    }

    /// Lower-cases string values; every other kind is returned unchanged.
    #[must_use]
    pub fn fold_case(self) -> Value {
        match self {
            Value::String(s) => Value::String(s.to_lowercase()),
            other => other,
        }
    }
}

/// Numeric view shared by literals and record data so that `integer`,
/// `long` and `double` compare across widths.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn cmp_numeric(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
        (Number::Float(a), Number::Float(b)) => a.partial_cmp(&b),
        (Number::Int(a), Number::Float(b)) => (a as f64).partial_cmp(&b),
        (Number::Float(a), Number::Int(b)) => a.partial_cmp(&(b as f64)),
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "\"{v}\""),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Guid(v) => write!(f, "{}", v.hyphenated()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_primitives() {
        assert_eq!(Value::from(42_i32), Value::Int(42));
        assert_eq!(Value::from(42_i64), Value::Long(42));
        assert_eq!(Value::from(1.5_f64), Value::Double(1.5));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("x"), Value::String("x".to_owned()));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Double(3.5).to_string(), "3.5");
        assert_eq!(Value::String("hi".into()).to_string(), "\"hi\"");
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::Date(d).to_string(), "2024-02-29");
        assert_eq!(
            Value::DateTime(d.and_hms_opt(13, 5, 0).unwrap()).to_string(),
            "2024-02-29T13:05:00"
        );
    }

    #[test]
    fn fold_case_only_touches_strings() {
        assert_eq!(
            Value::String("MiXeD".into()).fold_case(),
            Value::String("mixed".into())
        );
        assert_eq!(Value::Int(3).fold_case(), Value::Int(3));
    }
}
