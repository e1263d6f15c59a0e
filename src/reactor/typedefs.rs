//! Type compilation: flattening `typedef` chains into one compiled
//! [`TypeDefinition`] per point of use.

use std::sync::Arc;

use crate::error::{InferenceError, ReactorIssue};
use crate::model::{
    ArgumentValue, BitMember, BuiltinType, EnumMember, NodeId, PatternRestriction,
    TypeDefinition, YangKeyword, parse_length_arg, parse_range_arg,
};
use crate::reactor::arena::StmtId;
use crate::reactor::namespace::TypedefNs;
use crate::reactor::reactor::Reactor;

/// Bound on typedef derivation chains; anything deeper is a cycle.
const MAX_TYPE_DEPTH: u32 = 32;

impl Reactor {
    /// Compile a `type` statement into its flattened definition, following
    /// typedef chains and merging restrictions outward-in.
    pub(crate) fn compile_type(
        &mut self,
        type_ctx: StmtId,
        depth: u32,
    ) -> Result<Arc<TypeDefinition>, ReactorIssue> {
        let at = self.arena[type_ctx].source_ref.clone();
        let node = match &self.arena[type_ctx].argument {
            Some(ArgumentValue::Ref(node)) => node.clone(),
            _ => {
                let raw = self.required_raw(type_ctx, "type name")?;
                NodeId::parse(&raw)
            }
        };
        if depth > MAX_TYPE_DEPTH {
            return Err(InferenceError::cycle(
                format!("typedef chain through '{node}' does not terminate"),
                at,
            )
            .into());
        }

        if node.prefix.is_none() {
            if let Some(builtin) = BuiltinType::from_name(&node.name) {
                let mut ty = TypeDefinition::builtin(builtin);
                self.apply_restrictions(&mut ty, type_ctx, depth)?;
                return Ok(Arc::new(ty));
            }
        }

        let typedef = self
            .resolve_scoped::<TypedefNs>(type_ctx, &node)
            .ok_or_else(|| {
                InferenceError::TypeDerivation {
                    type_name: node.to_string(),
                    reason: "no such typedef or builtin type".to_string(),
                    at: at.clone(),
                }
            })?;
        let inner = self
            .children_with(typedef, YangKeyword::Type)
            .first()
            .copied()
            .ok_or_else(|| InferenceError::TypeDerivation {
                type_name: node.to_string(),
                reason: "typedef has no type substatement".to_string(),
                at: at.clone(),
            })?;

        let mut ty = (*self.compile_type(inner, depth + 1)?).clone();
        ty.name = node.name.clone();
        if let Some(default) = self.child_raw(typedef, YangKeyword::Default) {
            ty.default = Some(default);
        }
        if let Some(units) = self.child_raw(typedef, YangKeyword::Units) {
            ty.units = Some(units);
        }
        self.apply_restrictions(&mut ty, type_ctx, depth)?;
        Ok(Arc::new(ty))
    }

    /// Fold the restriction substatements of one `type` use into `ty`.
    fn apply_restrictions(
        &mut self,
        ty: &mut TypeDefinition,
        type_ctx: StmtId,
        depth: u32,
    ) -> Result<(), ReactorIssue> {
        let type_name = ty.name.to_string();
        let derivation = move |reason: String, at| InferenceError::TypeDerivation {
            type_name: type_name.clone(),
            reason,
            at,
        };
        let mut next_enum_value: i32 = 0;
        let mut next_bit_position: u32 = 0;
        for child in self.arena[type_ctx].children.clone() {
            let at = self.arena[child].source_ref.clone();
            let Some(kw) = self.arena[child].keyword.as_core() else {
                continue;
            };
            match kw {
                YangKeyword::Range => {
                    let raw = self.required_raw(child, "range")?;
                    let (lo, hi) = match &ty.ranges {
                        Some(prev) => {
                            let lo = prev.iter().map(|(l, _)| *l).min().unwrap_or(i128::MIN);
                            let hi = prev.iter().map(|(_, h)| *h).max().unwrap_or(i128::MAX);
                            (lo, hi)
                        }
                        None => ty
                            .base
                            .integer_bounds()
                            .unwrap_or((i128::MIN, i128::MAX)),
                    };
                    let parts = parse_range_arg(&raw, lo, hi)
                        .map_err(|e| derivation(e, at.clone()))?;
                    ty.ranges = Some(parts);
                }
                YangKeyword::Length => {
                    let raw = self.required_raw(child, "length")?;
                    let parts =
                        parse_length_arg(&raw).map_err(|e| derivation(e, at.clone()))?;
                    ty.length = Some(parts);
                }
                YangKeyword::Pattern => {
                    let raw = self.required_raw(child, "pattern")?;
                    let pattern = PatternRestriction::compile(&raw)
                        .map_err(|e| derivation(e, at.clone()))?;
                    ty.patterns.push(pattern);
                }
                YangKeyword::Enum => {
                    let name = self.required_raw(child, "enum name")?;
                    let value = self
                        .children_with(child, YangKeyword::Value)
                        .first()
                        .and_then(|v| self.arena[*v].raw_argument.as_deref())
                        .and_then(|raw| raw.parse::<i32>().ok())
                        .unwrap_or(next_enum_value);
                    next_enum_value = value.saturating_add(1);
                    ty.enums.push(EnumMember { name, value });
                }
                YangKeyword::Bit => {
                    let name = self.required_raw(child, "bit name")?;
                    let position = self
                        .children_with(child, YangKeyword::Position)
                        .first()
                        .and_then(|p| self.arena[*p].raw_argument.as_deref())
                        .and_then(|raw| raw.parse::<u32>().ok())
                        .unwrap_or(next_bit_position);
                    next_bit_position = position.saturating_add(1);
                    ty.bits.push(BitMember { name, position });
                }
                YangKeyword::Base => {
                    let base = match &self.arena[child].argument {
                        Some(ArgumentValue::Ref(node)) => node.clone(),
                        _ => NodeId::parse(&self.required_raw(child, "base identity")?),
                    };
                    ty.identity_base = Some(base);
                }
                YangKeyword::Path => {
                    let path = match &self.arena[child].argument {
                        Some(ArgumentValue::Path(path)) => path.clone(),
                        _ => {
                            let raw = self.required_raw(child, "path")?;
                            crate::model::PathExpression::parse(&raw)
                                .map_err(|e| derivation(e, at.clone()))?
                        }
                    };
                    ty.path = Some(path);
                    ty.path_module = self.definition_module(child);
                }
                YangKeyword::FractionDigits => {
                    let raw = self.required_raw(child, "fraction-digits")?;
                    let digits = raw
                        .parse::<u8>()
                        .ok()
                        .filter(|d| (1..=18).contains(d))
                        .ok_or_else(|| {
                            derivation(format!("invalid fraction-digits '{raw}'"), at.clone())
                        })?;
                    ty.fraction_digits = Some(digits);
                }
                YangKeyword::Type => {
                    // union member
                    let member = self.compile_type(child, depth + 1)?;
                    ty.union_types.push(member);
                }
                YangKeyword::RequireInstance => {
                    // recorded implicitly; instance presence is a data-time
                    // concern outside type checking
                }
                _ => {}
            }
        }
        Ok(())
    }
}
