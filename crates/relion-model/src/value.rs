//! Typed cell values and the casts between them.
//!
//! STAR columns are dynamically typed in the serialized form but carry a
//! declared scalar type in memory. `ColumnType` names the three scalar
//! types, `CellValue` is the tagged value variant, and the cast functions
//! define the conversion and fallback rules shared by the codec and the
//! structural table operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scalar type of a STAR column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
        }
    }

    /// Parse one serialized token into a value of this type.
    ///
    /// Integer columns fall back to a real parse truncated toward zero, so
    /// tokens like `3.000000` (and exponent forms like `1e3`) are accepted
    /// in integer columns. A token that parses as neither is a [`CastError`].
    pub fn parse_token(self, token: &str) -> Result<CellValue, CastError> {
        match self {
            ColumnType::Text => Ok(CellValue::Text(token.to_string())),
            ColumnType::Integer => {
                if let Ok(v) = token.parse::<i64>() {
                    return Ok(CellValue::Integer(v));
                }
                match token.parse::<f64>() {
                    Ok(v) => Ok(CellValue::Integer(v as i64)),
                    Err(_) => Err(CastError::new(token, self)),
                }
            }
            ColumnType::Real => match token.parse::<f64>() {
                Ok(v) => Ok(CellValue::Real(v)),
                Err(_) => Err(CastError::new(token, self)),
            },
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl CellValue {
    pub fn column_type(&self) -> ColumnType {
        match self {
            CellValue::Text(_) => ColumnType::Text,
            CellValue::Integer(_) => ColumnType::Integer,
            CellValue::Real(_) => ColumnType::Real,
        }
    }

    /// Convert this value to the target type.
    ///
    /// Numeric conversions truncate toward zero; numeric to text uses the
    /// canonical serialized form; text to numeric parses with the same
    /// fallback as [`ColumnType::parse_token`].
    pub fn cast_to(&self, target: ColumnType) -> Result<CellValue, CastError> {
        match (self, target) {
            (CellValue::Text(s), ColumnType::Text) => Ok(CellValue::Text(s.clone())),
            (CellValue::Text(s), _) => target.parse_token(s),
            (CellValue::Integer(v), ColumnType::Text) => Ok(CellValue::Text(v.to_string())),
            (CellValue::Integer(v), ColumnType::Integer) => Ok(CellValue::Integer(*v)),
            (CellValue::Integer(v), ColumnType::Real) => Ok(CellValue::Real(*v as f64)),
            (CellValue::Real(v), ColumnType::Text) => Ok(CellValue::Text(format_real(*v))),
            (CellValue::Real(v), ColumnType::Integer) => Ok(CellValue::Integer(*v as i64)),
            (CellValue::Real(v), ColumnType::Real) => Ok(CellValue::Real(*v)),
        }
    }

    /// Numeric view, `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Text(_) => None,
            CellValue::Integer(v) => Some(*v as f64),
            CellValue::Real(v) => Some(*v),
        }
    }

    /// Integer view (reals truncate toward zero), `None` for text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Text(_) => None,
            CellValue::Integer(v) => Some(*v),
            CellValue::Real(v) => Some(*v as i64),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Display renders the serialized STAR token for the value.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Integer(v) => write!(f, "{v}"),
            CellValue::Real(v) => f.write_str(&format_real(*v)),
        }
    }
}

/// Canonical serialized form of a real value.
///
/// Integer-valued finite reals keep one fractional digit (`2.0`) so the
/// token stays distinguishable from an integer on reload; everything else
/// uses the shortest round-trip form. No exponent notation is ever emitted.
pub fn format_real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// A value that cannot be represented in the requested type.
#[derive(Debug, Clone, Error)]
#[error("cannot cast '{value}' to {target}")]
pub struct CastError {
    pub value: String,
    pub target: ColumnType,
}

impl CastError {
    pub fn new(value: impl Into<String>, target: ColumnType) -> Self {
        Self {
            value: value.into(),
            target,
        }
    }
}
