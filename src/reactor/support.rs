//! Statement supports: per-keyword behaviour plugged into the reactor.
//!
//! A support owns argument parsing, the substatement cardinality grammar,
//! the copy policy, and the per-phase hooks. Most keywords need nothing but
//! an argument kind and a validator ([`SimpleSupport`]); the structural
//! keywords (`module`, `import`, `uses`, `augment`, `deviation`, ...)
//! override hooks in `supports.rs`.

use std::str::FromStr;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::{Revision, SourceRef};
use crate::error::{ReactorIssue, SourceError};
use crate::model::{
    ArgumentValue, DeviateKind, IfFeatureExpr, MaxElements, NodeId, OrderedBy, PathExpression,
    RawSchemaNodeId, StatementKeyword, Status, YangKeyword,
};
use crate::reactor::arena::StmtId;
use crate::reactor::reactor::Reactor;

/// How the reactor treats a statement when `uses` or `augment` copies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementPolicy {
    /// Meaning does not depend on placement; copies are plain clones.
    ContextIndependent,
    /// Must be re-interpreted at the copy site (schema nodes, `if-feature`,
    /// `type`, ...).
    CopyOnUse,
    /// May never appear inside a replicated body (`module`, `import`, ...).
    RejectReplica,
}

/// How a support parses its raw argument string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// No argument (`input`, `output`).
    None,
    /// Free text.
    Str,
    /// A plain identifier.
    Identifier,
    /// A possibly-prefixed reference.
    Ref,
    /// An absolute or descendant schema node identifier.
    SchemaNodeId,
    /// `true` / `false`.
    Boolean,
    Status,
    OrderedBy,
    /// Signed integer (`value`).
    Integer,
    /// Unsigned integer (`min-elements`, `fraction-digits`).
    NonNegInteger,
    MaxElements,
    Deviate,
    IfFeature,
    Path,
    KeyList,
    UniqueList,
    Revision,
}

impl ArgKind {
    /// Parse `raw` into the keyword's argument value.
    pub fn parse(
        &self,
        keyword: &StatementKeyword,
        raw: Option<&str>,
        at: &SourceRef,
    ) -> Result<Option<ArgumentValue>, SourceError> {
        if matches!(self, ArgKind::None) {
            return Ok(None);
        }
        let Some(raw) = raw else {
            return Err(SourceError::MissingArgument {
                keyword: keyword.to_string(),
                at: at.clone(),
            });
        };
        let invalid = |reason: String| {
            SourceError::invalid_argument(keyword.to_string(), raw, reason, at.clone())
        };
        let value = match self {
            ArgKind::None => unreachable!("handled above"),
            ArgKind::Str => ArgumentValue::Str(raw.into()),
            ArgKind::Identifier => {
                if raw.is_empty() || raw.contains(char::is_whitespace) {
                    return Err(invalid("not a valid identifier".to_string()));
                }
                ArgumentValue::Identifier(raw.into())
            }
            ArgKind::Ref => ArgumentValue::Ref(NodeId::parse(raw)),
            ArgKind::SchemaNodeId => {
                ArgumentValue::SchemaNodeId(RawSchemaNodeId::parse(raw).map_err(invalid)?)
            }
            ArgKind::Boolean => match raw {
                "true" => ArgumentValue::Boolean(true),
                "false" => ArgumentValue::Boolean(false),
                _ => return Err(invalid("expected 'true' or 'false'".to_string())),
            },
            ArgKind::Status => ArgumentValue::Status(Status::from_str(raw).map_err(invalid)?),
            ArgKind::OrderedBy => {
                ArgumentValue::OrderedBy(OrderedBy::from_str(raw).map_err(invalid)?)
            }
            ArgKind::Integer => ArgumentValue::Integer(
                raw.parse::<i64>()
                    .map_err(|_| invalid("expected an integer".to_string()))?,
            ),
            ArgKind::NonNegInteger => {
                let n = raw
                    .parse::<u32>()
                    .map_err(|_| invalid("expected a non-negative integer".to_string()))?;
                ArgumentValue::Integer(n as i64)
            }
            ArgKind::MaxElements => {
                ArgumentValue::MaxElements(MaxElements::from_str(raw).map_err(invalid)?)
            }
            ArgKind::Deviate => {
                ArgumentValue::Deviate(DeviateKind::from_str(raw).map_err(invalid)?)
            }
            ArgKind::IfFeature => {
                ArgumentValue::IfFeature(IfFeatureExpr::parse(raw).map_err(invalid)?)
            }
            ArgKind::Path => ArgumentValue::Path(PathExpression::parse(raw).map_err(invalid)?),
            ArgKind::KeyList => {
                let keys: Vec<SmolStr> = raw.split_whitespace().map(SmolStr::from).collect();
                if keys.is_empty() {
                    return Err(invalid("empty key list".to_string()));
                }
                ArgumentValue::KeyList(keys)
            }
            ArgKind::UniqueList => {
                let mut paths = Vec::new();
                for part in raw.split_whitespace() {
                    let id = RawSchemaNodeId::parse(part).map_err(invalid)?;
                    if id.absolute {
                        return Err(invalid(format!(
                            "unique path '{part}' must be a descendant path"
                        )));
                    }
                    paths.push(id.nodes);
                }
                if paths.is_empty() {
                    return Err(invalid("empty unique argument".to_string()));
                }
                ArgumentValue::UniqueList(paths)
            }
            ArgKind::Revision => {
                ArgumentValue::Revision(Revision::from_str(raw).map_err(|e| invalid(e.to_string()))?)
            }
        };
        Ok(Some(value))
    }
}

/// One `(child keyword, min, max)` cardinality rule.
#[derive(Debug, Clone, Copy)]
pub struct CardinalityRule {
    pub child: YangKeyword,
    pub min: u32,
    pub max: u32,
}

/// Substatement cardinality grammar for one keyword, enforced during
/// `FullDeclaration`. Extension (unknown-keyword) children are always
/// allowed; core children must appear in the rule set.
#[derive(Debug, Clone, Default)]
pub struct SubstatementValidator {
    rules: Vec<CardinalityRule>,
}

impl SubstatementValidator {
    pub fn builder() -> SubstatementValidatorBuilder {
        SubstatementValidatorBuilder {
            rules: Vec::new(),
        }
    }

    /// A validator that admits no core substatements at all.
    pub fn none() -> SubstatementValidator {
        SubstatementValidator::default()
    }

    pub fn validate(
        &self,
        parent: &StatementKeyword,
        children: &[StatementKeyword],
        at: &SourceRef,
    ) -> Result<(), SourceError> {
        let mut counts: FxHashMap<YangKeyword, u32> = FxHashMap::default();
        for child in children {
            let Some(kw) = child.as_core() else {
                continue;
            };
            *counts.entry(kw).or_default() += 1;
            if !self.rules.iter().any(|r| r.child == kw) {
                return Err(SourceError::cardinality(
                    format!("{kw} is not valid for {parent}"),
                    at.clone(),
                ));
            }
        }
        for rule in &self.rules {
            let count = counts.get(&rule.child).copied().unwrap_or(0);
            if count > rule.max {
                return Err(SourceError::cardinality(
                    format!(
                        "Maximal count of {} for {} is {}, detected {}",
                        rule.child, parent, rule.max, count
                    ),
                    at.clone(),
                ));
            }
            if count < rule.min {
                return Err(SourceError::cardinality(
                    format!(
                        "Minimal count of {} for {} is {}, detected {}",
                        rule.child, parent, rule.min, count
                    ),
                    at.clone(),
                ));
            }
        }
        Ok(())
    }
}

/// Builder for cardinality grammars.
pub struct SubstatementValidatorBuilder {
    rules: Vec<CardinalityRule>,
}

impl SubstatementValidatorBuilder {
    /// `child` must appear exactly once.
    pub fn mandatory(mut self, child: YangKeyword) -> Self {
        self.rules.push(CardinalityRule {
            child,
            min: 1,
            max: 1,
        });
        self
    }

    /// `child` may appear at most once.
    pub fn optional(mut self, child: YangKeyword) -> Self {
        self.rules.push(CardinalityRule {
            child,
            min: 0,
            max: 1,
        });
        self
    }

    /// `child` may appear any number of times.
    pub fn any(mut self, child: YangKeyword) -> Self {
        self.rules.push(CardinalityRule {
            child,
            min: 0,
            max: u32::MAX,
        });
        self
    }

    /// `child` must appear at least once.
    pub fn at_least_one(mut self, child: YangKeyword) -> Self {
        self.rules.push(CardinalityRule {
            child,
            min: 1,
            max: u32::MAX,
        });
        self
    }

    pub fn build(self) -> SubstatementValidator {
        SubstatementValidator { rules: self.rules }
    }
}

/// Per-keyword behaviour: argument parsing, cardinality, copy policy, and
/// phase hooks.
#[allow(unused_variables)]
pub trait StatementSupport: Send + Sync {
    fn keyword(&self) -> YangKeyword;

    fn arg_kind(&self) -> ArgKind;

    fn policy(&self) -> StatementPolicy {
        StatementPolicy::ContextIndependent
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        None
    }

    /// `SourceLinkage`: bind prefixes, register modules/submodules, schedule
    /// import/include resolution.
    fn on_linkage(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        Ok(())
    }

    /// `StatementDefinition`: register named definitions (groupings,
    /// typedefs, features, identities, extensions).
    fn on_statement_definition(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        Ok(())
    }

    /// `FullDeclaration`: parse the argument and validate substatement
    /// cardinality. The default behaviour fits every keyword with a static
    /// grammar.
    fn on_full_declaration(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        rx.parse_argument(ctx, self.arg_kind())?;
        if let Some(validator) = self.validator() {
            rx.validate_substatements(ctx, validator)?;
        }
        Ok(())
    }

    /// `EffectiveModel`: register inference actions (augments, deviations).
    fn on_effective_model(&self, rx: &mut Reactor, ctx: StmtId) -> Result<(), ReactorIssue> {
        Ok(())
    }
}

/// A support with no hook behaviour: argument kind + policy + grammar.
pub struct SimpleSupport {
    pub keyword: YangKeyword,
    pub arg: ArgKind,
    pub policy: StatementPolicy,
    pub validator: Option<SubstatementValidator>,
}

impl StatementSupport for SimpleSupport {
    fn keyword(&self) -> YangKeyword {
        self.keyword
    }

    fn arg_kind(&self) -> ArgKind {
        self.arg
    }

    fn policy(&self) -> StatementPolicy {
        self.policy
    }

    fn validator(&self) -> Option<&SubstatementValidator> {
        self.validator.as_ref()
    }
}

/// Keyword → support registry. The reactor looks supports up per statement;
/// unknown (extension) keywords fall back to an opaque support owned by the
/// registry.
pub struct Registry {
    supports: FxHashMap<YangKeyword, Arc<dyn StatementSupport>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            supports: FxHashMap::default(),
        }
    }

    pub fn register(&mut self, support: Arc<dyn StatementSupport>) {
        self.supports.insert(support.keyword(), support);
    }

    pub fn get(&self, keyword: YangKeyword) -> Option<Arc<dyn StatementSupport>> {
        self.supports.get(&keyword).cloned()
    }

    pub fn len(&self) -> usize {
        self.supports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supports.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> SourceRef {
        SourceRef::new("test.yang", 1, 1)
    }

    #[test]
    fn test_invalid_child_message() {
        let validator = SubstatementValidator::builder()
            .optional(YangKeyword::Description)
            .optional(YangKeyword::Reference)
            .build();
        let err = validator
            .validate(
                &YangKeyword::Revision.into(),
                &[YangKeyword::Type.into()],
                &at(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("TYPE is not valid for REVISION"));
    }

    #[test]
    fn test_max_count_message() {
        let validator = SubstatementValidator::builder()
            .optional(YangKeyword::Description)
            .build();
        let err = validator
            .validate(
                &YangKeyword::Augment.into(),
                &[
                    YangKeyword::Description.into(),
                    YangKeyword::Description.into(),
                ],
                &at(),
            )
            .unwrap_err();
        assert!(
            err.to_string()
                .contains("Maximal count of DESCRIPTION for AUGMENT is 1")
        );
    }

    #[test]
    fn test_missing_mandatory_child() {
        let validator = SubstatementValidator::builder()
            .mandatory(YangKeyword::Type)
            .build();
        let err = validator
            .validate(&YangKeyword::Leaf.into(), &[], &at())
            .unwrap_err();
        assert!(err.to_string().contains("Minimal count of TYPE for LEAF is 1"));
    }

    #[test]
    fn test_extension_children_always_pass() {
        let validator = SubstatementValidator::none();
        validator
            .validate(
                &YangKeyword::Description.into(),
                &[StatementKeyword::Unknown("md:note".into())],
                &at(),
            )
            .unwrap();
    }

    #[test]
    fn test_arg_kind_boolean() {
        let kw: StatementKeyword = YangKeyword::Config.into();
        let value = ArgKind::Boolean.parse(&kw, Some("false"), &at()).unwrap();
        assert_eq!(value, Some(ArgumentValue::Boolean(false)));
        assert!(ArgKind::Boolean.parse(&kw, Some("yes"), &at()).is_err());
        assert!(ArgKind::Boolean.parse(&kw, None, &at()).is_err());
    }
}
