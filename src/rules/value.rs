//! Values exchanged between rules and facts.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A dynamically typed fact field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A number.
    Decimal(Decimal),
    /// A flag.
    Bool(bool),
    /// Free text.
    Text(String),
    /// A calendar date.
    Date(NaiveDate),
    /// No value.
    Null,
}

impl Value {
    /// Name of the value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Decimal(_) => "decimal",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Null => "null",
        }
    }

    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts a YAML literal from rule text.
    ///
    /// Strings shaped like `YYYY-MM-DD` become dates. Sequences and maps
    /// are rejected.
    pub fn from_yaml(literal: &serde_yaml::Value) -> Result<Self, String> {
        match literal {
            serde_yaml::Value::Null => Ok(Value::Null),
            serde_yaml::Value::Bool(flag) => Ok(Value::Bool(*flag)),
            serde_yaml::Value::Number(number) => Decimal::from_str(&number.to_string())
                .or_else(|_| Decimal::from_scientific(&number.to_string()))
                .map(Value::Decimal)
                .map_err(|e| format!("invalid number '{number}': {e}")),
            serde_yaml::Value::String(text) => Ok(NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Value::Date)
                .unwrap_or_else(|_| Value::Text(text.clone()))),
            other => Err(format!("unsupported literal {other:?}")),
        }
    }

    /// Compares two values of the same type.
    ///
    /// Returns an error when the types differ or the type is unordered.
    pub fn compare(&self, other: &Value) -> Result<Ordering, String> {
        match (self, other) {
            (Value::Decimal(a), Value::Decimal(b)) => Ok(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Ok(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            (Value::Bool(_), Value::Bool(_)) => Err("bool values are not ordered".to_string()),
            (a, b) => Err(format!(
                "cannot compare {} with {}",
                a.type_name(),
                b.type_name()
            )),
        }
    }

    /// Equality across types; null only equals null.
    ///
    /// Mismatched non-null types are an error.
    pub fn equals(&self, other: &Value) -> Result<bool, String> {
        match (self, other) {
            (Value::Null, Value::Null) => Ok(true),
            (Value::Null, _) | (_, Value::Null) => Ok(false),
            (a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => Ok(a == b),
            (a, b) => Err(format!(
                "cannot compare {} with {}",
                a.type_name(),
                b.type_name()
            )),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(t) => write!(f, "{t:?}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Null => f.write_str("null"),
        }
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Decimal(Decimal::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
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
