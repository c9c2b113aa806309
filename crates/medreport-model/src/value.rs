//! Field values carried by patient records.
//!
//! A [`Value`] is the unit of data addressed by a scope (`section.field`).
//! Conditions compare values exactly and test their truthiness; the
//! substitution step uses their [`fmt::Display`] form.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// A single field value.
///
/// `Date` and `DateTime` only appear in ingested source rows; section
/// builders format them into `Text` before they reach a report record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Time(NaiveTime),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Native truthiness: null, zero, empty text, `false` and midnight are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Time(t) => *t > NaiveTime::MIN,
            Value::Date(_) | Value::DateTime(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Text values that are empty become `Null`; everything else is kept.
    pub fn non_empty(self) -> Value {
        match self {
            Value::Text(s) if s.is_empty() => Value::Null,
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => f.write_str(&format_numeric(*v)),
            Value::Text(s) => f.write_str(s),
            Value::Time(t) => {
                write!(f, "{:02}:{:02}", t.hour(), t.minute())
            }
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
        }
    }
}

/// Formats a floating-point number without trailing fractional zeros.
pub fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Value::Time(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_values() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Time(NaiveTime::MIN).is_truthy());
    }

    #[test]
    fn truthy_values() {
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(-3).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(Value::from("no").is_truthy());
        let time = NaiveTime::from_hms_opt(0, 46, 0).expect("valid time");
        assert!(Value::Time(time).is_truthy());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(14).to_string(), "14");
        assert_eq!(Value::Float(50.0).to_string(), "50");
        assert_eq!(Value::Float(2.50).to_string(), "2.5");
        assert_eq!(Value::Float(100.0).to_string(), "100");
        let time = NaiveTime::from_hms_opt(4, 5, 0).expect("valid time");
        assert_eq!(Value::Time(time).to_string(), "04:05");
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("CT")), Value::from("CT"));
    }

    #[test]
    fn non_empty_drops_blank_text() {
        assert_eq!(Value::from("").non_empty(), Value::Null);
        assert_eq!(Value::from("x").non_empty(), Value::from("x"));
        assert_eq!(Value::Int(0).non_empty(), Value::Int(0));
    }

    proptest::proptest! {
        #[test]
        fn integral_floats_print_like_ints(n in -1_000_000i64..1_000_000) {
            proptest::prop_assert_eq!(format_numeric(n as f64), n.to_string());
        }

        #[test]
        fn fractions_keep_no_trailing_zeros(n in -1000i64..1000, tenths in 1i64..10) {
            let text = format_numeric(n as f64 + tenths as f64 / 10.0);
            proptest::prop_assert!(!text.ends_with('0') && !text.ends_with('.'));
        }
    }
}
