//! Scalar values carried by leaf-like normalized nodes.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

/// A typed scalar value. `decimal64` is carried scaled (digits plus the
/// fraction-digit count) so values stay `Eq` and hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Str(Arc<str>),
    Int(i64),
    Uint(u64),
    Bool(bool),
    Decimal { digits: i64, fraction_digits: u8 },
    Binary(Arc<[u8]>),
    Enum(SmolStr),
    Empty,
}

impl Value {
    pub fn str(value: impl Into<Arc<str>>) -> Value {
        Value::Str(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Widened integer view for range checks.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v as i128),
            Value::Uint(v) => Some(*v as i128),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Bool(_) => "boolean",
            Value::Decimal { .. } => "decimal64",
            Value::Binary(_) => "binary",
            Value::Enum(_) => "enumeration",
            Value::Empty => "empty",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(v) => write!(f, "{v}"),
            Value::Uint(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Decimal {
                digits,
                fraction_digits,
            } => {
                let scale = 10_i64.pow(*fraction_digits as u32);
                write!(f, "{}.{:0width$}", digits / scale, (digits % scale).abs(), width = *fraction_digits as usize)
            }
            Value::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Enum(name) => f.write_str(name),
            Value::Empty => f.write_str(""),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Uint(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}
