//! Legacy binary value codec.
//!
//! The tag-dispatched encoding used by the persisted stream format: one
//! `u8` tag per value kind, big-endian fixed-width integers, and two string
//! encodings - [`ValueTag::StringType`] with a `u16` length prefix for
//! strings under 65 536 bytes, [`ValueTag::StringBytesType`] with a `u32`
//! prefix for everything longer.

use std::sync::Arc;

use thiserror::Error;

use crate::tree::Value;

/// Strings at or above this byte length use [`ValueTag::StringBytesType`].
pub const STRING_BYTES_THRESHOLD: usize = 65_536;

/// Wire tags of the value encoding. Values are stable; changing one breaks
/// every persisted stream.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTag {
    BooleanTrue = 1,
    BooleanFalse = 2,
    IntType = 3,
    UintType = 4,
    DecimalType = 5,
    BinaryType = 6,
    EnumType = 7,
    EmptyType = 8,
    StringType = 9,
    StringBytesType = 10,
}

impl ValueTag {
    fn from_u8(tag: u8) -> Option<ValueTag> {
        Some(match tag {
            1 => ValueTag::BooleanTrue,
            2 => ValueTag::BooleanFalse,
            3 => ValueTag::IntType,
            4 => ValueTag::UintType,
            5 => ValueTag::DecimalType,
            6 => ValueTag::BinaryType,
            7 => ValueTag::EnumType,
            8 => ValueTag::EmptyType,
            9 => ValueTag::StringType,
            10 => ValueTag::StringBytesType,
            _ => return None,
        })
    }
}

/// Decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unknown value tag {0}")]
    UnknownTag(u8),
    #[error("truncated input: needed {needed} more byte(s)")]
    Truncated { needed: usize },
    #[error("invalid UTF-8 in string value")]
    InvalidUtf8,
}

/// The tag [`encode_value`] selects for `value`.
pub fn tag_for(value: &Value) -> ValueTag {
    match value {
        Value::Bool(true) => ValueTag::BooleanTrue,
        Value::Bool(false) => ValueTag::BooleanFalse,
        Value::Int(_) => ValueTag::IntType,
        Value::Uint(_) => ValueTag::UintType,
        Value::Decimal { .. } => ValueTag::DecimalType,
        Value::Binary(_) => ValueTag::BinaryType,
        Value::Enum(_) => ValueTag::EnumType,
        Value::Empty => ValueTag::EmptyType,
        Value::Str(s) if s.len() < STRING_BYTES_THRESHOLD => ValueTag::StringType,
        Value::Str(_) => ValueTag::StringBytesType,
    }
}

/// Append the encoding of `value` to `out`.
pub fn encode_value(value: &Value, out: &mut Vec<u8>) {
    let tag = tag_for(value);
    out.push(tag as u8);
    match value {
        Value::Bool(_) | Value::Empty => {}
        Value::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
        Value::Uint(v) => out.extend_from_slice(&v.to_be_bytes()),
        Value::Decimal {
            digits,
            fraction_digits,
        } => {
            out.extend_from_slice(&digits.to_be_bytes());
            out.push(*fraction_digits);
        }
        Value::Binary(bytes) => {
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend_from_slice(bytes);
        }
        Value::Enum(name) => {
            out.extend_from_slice(&(name.len() as u16).to_be_bytes());
            out.extend_from_slice(name.as_bytes());
        }
        Value::Str(s) => match tag {
            ValueTag::StringType => {
                out.extend_from_slice(&(s.len() as u16).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            _ => {
                out.extend_from_slice(&(s.len() as u32).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        },
    }
}

/// Decode one value from the front of `input`, advancing it. The exact
/// inverse of [`encode_value`].
pub fn decode_value(input: &mut &[u8]) -> Result<Value, CodecError> {
    let tag_byte = take(input, 1)?[0];
    let tag = ValueTag::from_u8(tag_byte).ok_or(CodecError::UnknownTag(tag_byte))?;
    Ok(match tag {
        ValueTag::BooleanTrue => Value::Bool(true),
        ValueTag::BooleanFalse => Value::Bool(false),
        ValueTag::EmptyType => Value::Empty,
        ValueTag::IntType => Value::Int(i64::from_be_bytes(take_array(input)?)),
        ValueTag::UintType => Value::Uint(u64::from_be_bytes(take_array(input)?)),
        ValueTag::DecimalType => {
            let digits = i64::from_be_bytes(take_array(input)?);
            let fraction_digits = take(input, 1)?[0];
            Value::Decimal {
                digits,
                fraction_digits,
            }
        }
        ValueTag::BinaryType => {
            let len = u32::from_be_bytes(take_array(input)?) as usize;
            Value::Binary(Arc::from(take(input, len)?))
        }
        ValueTag::EnumType => {
            let len = u16::from_be_bytes(take_array(input)?) as usize;
            let bytes = take(input, len)?;
            let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
            Value::Enum(s.into())
        }
        ValueTag::StringType => {
            let len = u16::from_be_bytes(take_array(input)?) as usize;
            let bytes = take(input, len)?;
            let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
            Value::str(s)
        }
        ValueTag::StringBytesType => {
            let len = u32::from_be_bytes(take_array(input)?) as usize;
            let bytes = take(input, len)?;
            let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
            Value::str(s)
        }
    })
}

fn take<'a>(input: &mut &'a [u8], len: usize) -> Result<&'a [u8], CodecError> {
    if input.len() < len {
        return Err(CodecError::Truncated {
            needed: len - input.len(),
        });
    }
    let (head, tail) = input.split_at(len);
    *input = tail;
    Ok(head)
}

fn take_array<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], CodecError> {
    let bytes = take(input, N)?;
    let mut array = [0u8; N];
    array.copy_from_slice(bytes);
    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: Value) {
        let mut out = Vec::new();
        encode_value(&value, &mut out);
        let mut slice = out.as_slice();
        let decoded = decode_value(&mut slice).unwrap();
        assert_eq!(decoded, value);
        assert!(slice.is_empty());
    }

    #[test]
    fn test_small_string_selects_string_type() {
        assert_eq!(tag_for(&Value::str("foobar")), ValueTag::StringType);
    }

    #[test]
    fn test_large_string_selects_string_bytes_type() {
        let big: String = "x".repeat(STRING_BYTES_THRESHOLD);
        assert_eq!(tag_for(&Value::str(big.as_str())), ValueTag::StringBytesType);
        let boundary: String = "x".repeat(STRING_BYTES_THRESHOLD - 1);
        assert_eq!(tag_for(&Value::str(boundary.as_str())), ValueTag::StringType);
    }

    #[test]
    fn test_round_trips() {
        round_trip(Value::Bool(true));
        round_trip(Value::Bool(false));
        round_trip(Value::Int(-42));
        round_trip(Value::Uint(u64::MAX));
        round_trip(Value::Decimal {
            digits: 12345,
            fraction_digits: 2,
        });
        round_trip(Value::Binary(Arc::from(&b"\x00\x01\x02"[..])));
        round_trip(Value::Enum("up".into()));
        round_trip(Value::Empty);
        round_trip(Value::str("foobar"));
        round_trip(Value::str("x".repeat(70_000).as_str()));
    }

    #[test]
    fn test_truncated_input() {
        let mut out = Vec::new();
        encode_value(&Value::Int(7), &mut out);
        out.truncate(4);
        let mut slice = out.as_slice();
        assert!(matches!(
            decode_value(&mut slice),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn test_unknown_tag() {
        let mut slice: &[u8] = &[0xEE];
        assert_eq!(decode_value(&mut slice), Err(CodecError::UnknownTag(0xEE)));
    }
}
