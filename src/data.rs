use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::schema::ColumnType;

/// A single cell. Freshly parsed cells are [`Value::Text`]; coercion turns
/// them into typed values or [`Value::Null`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Renders the value as a CSV field. Integral floats keep a `.0` suffix so
    /// the field still reads as floating-point.
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Value::Null => String::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("Failed to parse '{value}' as int64")]
    InvalidInteger { value: String },
    #[error("Failed to parse '{value}' as float64")]
    InvalidFloat { value: String },
}

/// Parses raw text into `target`. Empty cells never reach this function; see
/// [`coerce_cell`] for the null rule.
pub fn coerce(value: &str, target: &ColumnType) -> Result<Value, ConversionError> {
    match target {
        ColumnType::Integer => value
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| ConversionError::InvalidInteger {
                value: value.to_string(),
            }),
        ColumnType::Float => value
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ConversionError::InvalidFloat {
                value: value.to_string(),
            }),
        ColumnType::String => Ok(Value::Text(value.to_string())),
    }
}

pub fn coerce_cell(cell: &Value, target: &ColumnType) -> Result<Value, ConversionError> {
    match (cell, target) {
        (Value::Null, _) => Ok(Value::Null),
        (Value::Text(s), _) if s.is_empty() => Ok(Value::Null),
        (Value::Text(s), _) => coerce(s, target),
        (Value::Integer(i), ColumnType::Integer) => Ok(Value::Integer(*i)),
        (Value::Integer(i), ColumnType::Float) => Ok(Value::Float(*i as f64)),
        (Value::Float(f), ColumnType::Float) => Ok(Value::Float(*f)),
        (Value::Float(f), ColumnType::Integer) => {
            if f.is_finite() && f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64
            {
                Ok(Value::Integer(*f as i64))
            } else {
                Err(ConversionError::InvalidInteger {
                    value: cell.as_display(),
                })
            }
        }
        (typed, ColumnType::String) => Ok(Value::Text(typed.as_display())),
    }
}
