//! Value type checking against compiled type definitions.

use crate::model::{BuiltinType, TypeDefinition};
use crate::tree::Value;

/// Check `value` against `ty`, walking the merged restrictions of the whole
/// derivation chain. Returns the reason on failure.
pub fn check_value(ty: &TypeDefinition, value: &Value) -> Result<(), String> {
    match ty.base {
        BuiltinType::Int8
        | BuiltinType::Int16
        | BuiltinType::Int32
        | BuiltinType::Int64
        | BuiltinType::Uint8
        | BuiltinType::Uint16
        | BuiltinType::Uint32
        | BuiltinType::Uint64 => {
            let n = value
                .as_int()
                .ok_or_else(|| wrong_kind(ty, value))?;
            if !ty.range_contains(n) {
                return Err(format!(
                    "value {n} is out of range for type '{}'",
                    ty.name
                ));
            }
            Ok(())
        }
        BuiltinType::String => {
            let s = match value {
                Value::Str(s) => s,
                _ => return Err(wrong_kind(ty, value)),
            };
            let len = s.chars().count() as u64;
            if !ty.length_allows(len) {
                return Err(format!(
                    "string length {len} violates the length restriction of '{}'",
                    ty.name
                ));
            }
            for pattern in &ty.patterns {
                if !pattern.matches(s) {
                    return Err(format!(
                        "value '{s}' does not match pattern '{}' of type '{}'",
                        pattern.raw, ty.name
                    ));
                }
            }
            Ok(())
        }
        BuiltinType::Boolean => match value {
            Value::Bool(_) => Ok(()),
            _ => Err(wrong_kind(ty, value)),
        },
        BuiltinType::Enumeration => {
            let name = value.as_str().ok_or_else(|| wrong_kind(ty, value))?;
            if ty.enums.iter().any(|member| member.name == name) {
                Ok(())
            } else {
                Err(format!(
                    "'{name}' is not a member of enumeration '{}'",
                    ty.name
                ))
            }
        }
        BuiltinType::Bits => {
            // a bits value is the space-separated set of asserted bit names
            let set = match value {
                Value::Str(s) => s,
                _ => return Err(wrong_kind(ty, value)),
            };
            for name in set.split_whitespace() {
                if !ty.bits.iter().any(|bit| bit.name == name) {
                    return Err(format!("'{name}' is not a bit of type '{}'", ty.name));
                }
            }
            Ok(())
        }
        BuiltinType::Identityref => match value {
            // carries the identity name; derivation against the base is a
            // compile-time concern
            Value::Str(_) | Value::Enum(_) => Ok(()),
            _ => Err(wrong_kind(ty, value)),
        },
        BuiltinType::Binary => {
            let bytes = match value {
                Value::Binary(bytes) => bytes,
                _ => return Err(wrong_kind(ty, value)),
            };
            if !ty.length_allows(bytes.len() as u64) {
                return Err(format!(
                    "binary length {} violates the length restriction of '{}'",
                    bytes.len(),
                    ty.name
                ));
            }
            Ok(())
        }
        BuiltinType::Empty => match value {
            Value::Empty => Ok(()),
            _ => Err(wrong_kind(ty, value)),
        },
        BuiltinType::Decimal64 => match value {
            Value::Decimal {
                fraction_digits, ..
            } => {
                if let Some(expected) = ty.fraction_digits {
                    if *fraction_digits != expected {
                        return Err(format!(
                            "decimal64 carries {fraction_digits} fraction digits, type '{}' requires {expected}",
                            ty.name
                        ));
                    }
                }
                Ok(())
            }
            _ => Err(wrong_kind(ty, value)),
        },
        BuiltinType::Leafref => match ty.leafref_target() {
            // checked against the resolved target's type
            Some(target) => check_value(target, value),
            None => Ok(()),
        },
        BuiltinType::InstanceIdentifier => match value {
            Value::Str(_) => Ok(()),
            _ => Err(wrong_kind(ty, value)),
        },
        BuiltinType::Union => {
            for member in &ty.union_types {
                if check_value(member, value).is_ok() {
                    return Ok(());
                }
            }
            Err(format!(
                "value does not match any member type of union '{}'",
                ty.name
            ))
        }
    }
}

fn wrong_kind(ty: &TypeDefinition, value: &Value) -> String {
    format!(
        "{} value is not valid for type '{}' (base {})",
        value.kind_name(),
        ty.name,
        ty.base
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BitMember, EnumMember, PatternRestriction};

    #[test]
    fn test_integer_range() {
        let mut ty = TypeDefinition::builtin(BuiltinType::Uint8);
        assert!(check_value(&ty, &Value::Uint(200)).is_ok());
        assert!(check_value(&ty, &Value::Uint(300)).is_err());
        ty.ranges = Some(vec![(1, 10)]);
        assert!(check_value(&ty, &Value::Uint(5)).is_ok());
        assert!(check_value(&ty, &Value::Uint(11)).is_err());
        assert!(check_value(&ty, &Value::Bool(true)).is_err());
    }

    #[test]
    fn test_string_length_and_pattern() {
        let mut ty = TypeDefinition::builtin(BuiltinType::String);
        ty.length = Some(vec![(2, 4)]);
        ty.patterns
            .push(PatternRestriction::compile("[a-z]+").unwrap());
        assert!(check_value(&ty, &Value::str("abc")).is_ok());
        assert!(check_value(&ty, &Value::str("a")).is_err());
        assert!(check_value(&ty, &Value::str("abcde")).is_err());
        assert!(check_value(&ty, &Value::str("ABC")).is_err());
    }

    #[test]
    fn test_enumeration_membership() {
        let mut ty = TypeDefinition::builtin(BuiltinType::Enumeration);
        ty.enums.push(EnumMember {
            name: "up".into(),
            value: 1,
        });
        assert!(check_value(&ty, &Value::Enum("up".into())).is_ok());
        assert!(check_value(&ty, &Value::Enum("down".into())).is_err());
    }

    #[test]
    fn test_bits_membership() {
        let mut ty = TypeDefinition::builtin(BuiltinType::Bits);
        ty.bits.push(BitMember {
            name: "syn".into(),
            position: 1,
        });
        ty.bits.push(BitMember {
            name: "ack".into(),
            position: 4,
        });
        assert!(check_value(&ty, &Value::str("syn")).is_ok());
        assert!(check_value(&ty, &Value::str("syn ack")).is_ok());
        // no bits asserted is a valid bits value
        assert!(check_value(&ty, &Value::str("")).is_ok());
        assert!(check_value(&ty, &Value::str("fin")).is_err());
        assert!(check_value(&ty, &Value::Uint(1)).is_err());
    }

    #[test]
    fn test_identityref_carries_identity_names() {
        let mut ty = TypeDefinition::builtin(BuiltinType::Identityref);
        ty.identity_base = Some(crate::model::NodeId::parse("crypto:hash-algorithm"));
        assert!(check_value(&ty, &Value::str("crypto:sha-256")).is_ok());
        assert!(check_value(&ty, &Value::Enum("sha-256".into())).is_ok());
        assert!(check_value(&ty, &Value::Bool(true)).is_err());
    }

    #[test]
    fn test_union_accepts_any_member() {
        let mut ty = TypeDefinition::builtin(BuiltinType::Union);
        ty.union_types
            .push(std::sync::Arc::new(TypeDefinition::builtin(
                BuiltinType::Uint8,
            )));
        ty.union_types
            .push(std::sync::Arc::new(TypeDefinition::builtin(
                BuiltinType::String,
            )));
        assert!(check_value(&ty, &Value::Uint(3)).is_ok());
        assert!(check_value(&ty, &Value::str("x")).is_ok());
        assert!(check_value(&ty, &Value::Bool(false)).is_err());
    }
}
