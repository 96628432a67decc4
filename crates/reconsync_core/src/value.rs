//! Field types, field values and payload coercion.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use uuid::Uuid;

/// Declared type of an entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// `true` / `false`.
    Bool,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// UTF-8 text.
    Text,
    /// RFC 4122 UUID.
    Uuid,
}

impl FieldType {
    /// Returns the zero value of this type.
    #[must_use]
    pub fn zero(self) -> FieldValue {
        match self {
            FieldType::Bool => FieldValue::Bool(false),
            FieldType::Integer => FieldValue::Integer(0),
            FieldType::Float => FieldValue::Float(0.0),
            FieldType::Text => FieldValue::Text(String::new()),
            FieldType::Uuid => FieldValue::Uuid(Uuid::nil()),
        }
    }

    /// Returns the lowercase name used in schema files and messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Text => "text",
            FieldType::Uuid => "uuid",
        }
    }

    /// Converts a payload value to this type.
    ///
    /// `null` passes through as [`FieldValue::Null`]; nullability is the
    /// caller's concern. Mismatched literal shapes are converted when the
    /// conversion is lossless (`"456"` for an integer, `3.0` for an integer,
    /// `7` for text). Arrays and objects never convert.
    pub fn coerce(self, value: &Value) -> Result<FieldValue, String> {
        match value {
            Value::Null => Ok(FieldValue::Null),
            Value::Array(_) => Err(format!("expected {}, found an array", self.name())),
            Value::Object(_) => Err(format!("expected {}, found an object", self.name())),
            _ => match self {
                FieldType::Bool => coerce_bool(value),
                FieldType::Integer => coerce_integer(value),
                FieldType::Float => coerce_float(value),
                FieldType::Text => coerce_text(value),
                FieldType::Uuid => coerce_uuid(value),
            },
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn coerce_bool(value: &Value) -> Result<FieldValue, String> {
    match value {
        Value::Bool(b) => Ok(FieldValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(FieldValue::Bool(false)),
            Some(1) => Ok(FieldValue::Bool(true)),
            _ => Err(format!("{n} is not a boolean")),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(FieldValue::Bool(true)),
            "false" | "0" => Ok(FieldValue::Bool(false)),
            _ => Err(format!("'{s}' is not a boolean")),
        },
        _ => Err("expected bool".to_string()),
    }
}

/// 2^63, the first float above the `i64` range. `i64::MAX as f64` rounds up
/// to this value, so it cannot serve as an inclusive bound.
const I64_UPPER_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn integer_from_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < I64_UPPER_BOUND {
        Some(f as i64)
    } else {
        None
    }
}

fn coerce_integer(value: &Value) -> Result<FieldValue, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(integer_from_f64))
            .map(FieldValue::Integer)
            .ok_or_else(|| format!("{n} is not a 64-bit integer")),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(integer_from_f64))
                .map(FieldValue::Integer)
                .ok_or_else(|| format!("'{s}' is not an integer"))
        }
        Value::Bool(b) => Err(format!("{b} is not an integer")),
        _ => Err("expected integer".to_string()),
    }
}

fn coerce_float(value: &Value) -> Result<FieldValue, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| format!("{n} is not a number")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(FieldValue::Float)
            .ok_or_else(|| format!("'{s}' is not a number")),
        Value::Bool(b) => Err(format!("{b} is not a number")),
        _ => Err("expected float".to_string()),
    }
}

fn coerce_text(value: &Value) -> Result<FieldValue, String> {
    match value {
        Value::String(s) => Ok(FieldValue::Text(s.clone())),
        Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
        Value::Bool(b) => Ok(FieldValue::Text(b.to_string())),
        _ => Err("expected text".to_string()),
    }
}

fn coerce_uuid(value: &Value) -> Result<FieldValue, String> {
    match value {
        Value::String(s) => Uuid::parse_str(s.trim())
            .map(FieldValue::Uuid)
            .map_err(|e| format!("'{s}' is not a UUID: {e}")),
        other => Err(format!("{other} is not a UUID")),
    }
}

/// A typed field value held by an entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum FieldValue {
    /// No value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// UUID value.
    Uuid(Uuid),
}

impl FieldValue {
    /// Returns true for [`FieldValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean content, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the UUID content, if this is a UUID value.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            FieldValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Converts the value to its JSON wire form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Integer(i) => Value::Number((*i).into()),
            FieldValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Uuid(u) => Value::String(u.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(x) => write!(f, "{x}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Uuid(u) => write!(f, "{u}"),
        }
    }
}
