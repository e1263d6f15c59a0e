//! Compiled type definitions.
//!
//! The reactor flattens `typedef` chains into one [`TypeDefinition`] per
//! typed node: the resolved builtin base plus the merged restrictions along
//! the derivation chain. Leafref targets are resolved after the effective
//! model settles and cached here.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use smol_str::SmolStr;

use crate::base::QNameModule;
use crate::model::argument::NodeId;
use crate::model::path_expr::PathExpression;

/// RFC 7950 builtin types understood by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal64,
    String,
    Boolean,
    Enumeration,
    Bits,
    Identityref,
    Leafref,
    InstanceIdentifier,
    Empty,
    Binary,
    Union,
}

impl BuiltinType {
    pub fn from_name(name: &str) -> Option<BuiltinType> {
        use BuiltinType::*;
        Some(match name {
            "int8" => Int8,
            "int16" => Int16,
            "int32" => Int32,
            "int64" => Int64,
            "uint8" => Uint8,
            "uint16" => Uint16,
            "uint32" => Uint32,
            "uint64" => Uint64,
            "decimal64" => Decimal64,
            "string" => String,
            "boolean" => Boolean,
            "enumeration" => Enumeration,
            "bits" => Bits,
            "identityref" => Identityref,
            "leafref" => Leafref,
            "instance-identifier" => InstanceIdentifier,
            "empty" => Empty,
            "binary" => Binary,
            "union" => Union,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        use BuiltinType::*;
        match self {
            Int8 => "int8",
            Int16 => "int16",
            Int32 => "int32",
            Int64 => "int64",
            Uint8 => "uint8",
            Uint16 => "uint16",
            Uint32 => "uint32",
            Uint64 => "uint64",
            Decimal64 => "decimal64",
            String => "string",
            Boolean => "boolean",
            Enumeration => "enumeration",
            Bits => "bits",
            Identityref => "identityref",
            Leafref => "leafref",
            InstanceIdentifier => "instance-identifier",
            Empty => "empty",
            Binary => "binary",
            Union => "union",
        }
    }

    pub fn is_integer(&self) -> bool {
        use BuiltinType::*;
        matches!(
            self,
            Int8 | Int16 | Int32 | Int64 | Uint8 | Uint16 | Uint32 | Uint64
        )
    }

    /// Value bounds for the integer types.
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        use BuiltinType::*;
        Some(match self {
            Int8 => (i8::MIN as i128, i8::MAX as i128),
            Int16 => (i16::MIN as i128, i16::MAX as i128),
            Int32 => (i32::MIN as i128, i32::MAX as i128),
            Int64 => (i64::MIN as i128, i64::MAX as i128),
            Uint8 => (0, u8::MAX as i128),
            Uint16 => (0, u16::MAX as i128),
            Uint32 => (0, u32::MAX as i128),
            Uint64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `pattern` restriction: the raw XSD regex plus its compiled, anchored
/// form.
#[derive(Debug, Clone)]
pub struct PatternRestriction {
    pub raw: SmolStr,
    pub regex: Regex,
}

impl PatternRestriction {
    pub fn compile(raw: &str) -> Result<PatternRestriction, String> {
        let anchored = format!("^(?:{raw})$");
        let regex =
            Regex::new(&anchored).map_err(|e| format!("invalid pattern '{raw}': {e}"))?;
        Ok(PatternRestriction {
            raw: raw.into(),
            regex,
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// One enum member of an `enumeration` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: SmolStr,
    pub value: i32,
}

/// One `bit` member of a `bits` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMember {
    pub name: SmolStr,
    pub position: u32,
}

/// A fully compiled type: the builtin base plus the restrictions merged along
/// the typedef derivation chain.
#[derive(Debug, Clone, Default)]
pub struct TypeDefinition {
    /// The type name as written at the point of use (builtin name or typedef
    /// name).
    pub name: SmolStr,
    pub base: BuiltinType,
    /// Merged `range` restriction (integer/decimal types).
    pub ranges: Option<Vec<(i128, i128)>>,
    /// Merged `length` restriction (string/binary types).
    pub length: Option<Vec<(u64, u64)>>,
    /// All `pattern` restrictions along the chain; a value must match all.
    pub patterns: Vec<PatternRestriction>,
    pub enums: Vec<EnumMember>,
    pub bits: Vec<BitMember>,
    /// `base` of an identityref type, as written at the point of use.
    pub identity_base: Option<NodeId>,
    /// `path` of a leafref type.
    pub path: Option<PathExpression>,
    /// Module whose prefixes bind the names written in `path`.
    pub path_module: Option<QNameModule>,
    /// Member types of a union.
    pub union_types: Vec<Arc<TypeDefinition>>,
    pub fraction_digits: Option<u8>,
    pub default: Option<SmolStr>,
    pub units: Option<SmolStr>,
    /// Resolved target type of a leafref; set once after the effective model
    /// settles.
    pub resolved_leafref: OnceLock<Arc<TypeDefinition>>,
}

impl Default for BuiltinType {
    fn default() -> Self {
        BuiltinType::String
    }
}

impl TypeDefinition {
    pub fn builtin(base: BuiltinType) -> TypeDefinition {
        TypeDefinition {
            name: base.name().into(),
            base,
            ..TypeDefinition::default()
        }
    }

    /// The type this leafref resolves to, if resolution has run.
    pub fn leafref_target(&self) -> Option<&Arc<TypeDefinition>> {
        self.resolved_leafref.get()
    }

    /// Whether `value` falls in the merged range restriction (or the
    /// builtin's own bounds when unrestricted).
    pub fn range_contains(&self, value: i128) -> bool {
        if let Some(ranges) = &self.ranges {
            return ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&value));
        }
        match self.base.integer_bounds() {
            Some((lo, hi)) => (lo..=hi).contains(&value),
            None => true,
        }
    }

    /// Whether a string/binary length satisfies the merged length
    /// restriction.
    pub fn length_allows(&self, len: u64) -> bool {
        match &self.length {
            Some(parts) => parts.iter().any(|(lo, hi)| (*lo..=*hi).contains(&len)),
            None => true,
        }
    }
}

/// Parse a `range` argument (`"1..20 | 100..max"`) against the base type's
/// bounds.
pub fn parse_range_arg(text: &str, lo: i128, hi: i128) -> Result<Vec<(i128, i128)>, String> {
    parse_parts(text, |bound| match bound {
        "min" => Ok(lo),
        "max" => Ok(hi),
        other => other
            .parse::<i128>()
            .map_err(|_| format!("invalid range bound '{other}'")),
    })
}

/// Parse a `length` argument (`"0..63 | 255"`).
pub fn parse_length_arg(text: &str) -> Result<Vec<(u64, u64)>, String> {
    let parts = parse_parts(text, |bound| match bound {
        "min" => Ok(0i128),
        "max" => Ok(u64::MAX as i128),
        other => other
            .parse::<i128>()
            .map_err(|_| format!("invalid length bound '{other}'")),
    })?;
    parts
        .into_iter()
        .map(|(lo, hi)| {
            if lo < 0 {
                Err(format!("negative length bound {lo}"))
            } else {
                Ok((lo as u64, hi as u64))
            }
        })
        .collect()
}

fn parse_parts(
    text: &str,
    mut bound: impl FnMut(&str) -> Result<i128, String>,
) -> Result<Vec<(i128, i128)>, String> {
    let mut parts = Vec::new();
    for piece in text.split('|') {
        let piece = piece.trim();
        let (lo, hi) = match piece.split_once("..") {
            Some((lo, hi)) => (bound(lo.trim())?, bound(hi.trim())?),
            None => {
                let v = bound(piece)?;
                (v, v)
            }
        };
        if lo > hi {
            return Err(format!("inverted range part '{piece}'"));
        }
        parts.push((lo, hi));
    }
    if parts.is_empty() {
        return Err(format!("empty range argument '{text}'"));
    }
    Ok(parts)
}
