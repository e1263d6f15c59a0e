//! Parsed statement arguments.
//!
//! Each keyword's support parses the raw argument string into one of these
//! variants during the `FullDeclaration` phase. Prefixed references stay
//! unresolved ([`NodeId`]) until the reactor binds them against the owning
//! module's prefix namespace.

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::base::{QName, Revision};
use crate::model::path_expr::PathExpression;

/// A possibly-prefixed identifier reference, before prefix resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub prefix: Option<SmolStr>,
    pub name: SmolStr,
}

impl NodeId {
    pub fn parse(text: &str) -> NodeId {
        match text.split_once(':') {
            Some((prefix, name)) => NodeId {
                prefix: Some(prefix.into()),
                name: name.into(),
            },
            None => NodeId {
                prefix: None,
                name: text.into(),
            },
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// An unresolved schema node identifier (`/a:x/b/c` or `x/y`), the argument
/// form of `augment`, `deviation` and `refine`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSchemaNodeId {
    pub absolute: bool,
    pub nodes: Vec<NodeId>,
}

impl RawSchemaNodeId {
    pub fn parse(text: &str) -> Result<RawSchemaNodeId, String> {
        let absolute = text.starts_with('/');
        let body = if absolute { &text[1..] } else { text };
        if body.is_empty() {
            return Err(format!("empty schema node identifier '{text}'"));
        }
        let mut nodes = Vec::new();
        for segment in body.split('/') {
            if segment.is_empty() {
                return Err(format!("empty step in schema node identifier '{text}'"));
            }
            nodes.push(NodeId::parse(segment));
        }
        Ok(RawSchemaNodeId { absolute, nodes })
    }
}

impl fmt::Display for RawSchemaNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if self.absolute || i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

/// `status` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Current,
    Deprecated,
    Obsolete,
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "current" => Ok(Status::Current),
            "deprecated" => Ok(Status::Deprecated),
            "obsolete" => Ok(Status::Obsolete),
            other => Err(format!("invalid status '{other}'")),
        }
    }
}

/// `ordered-by` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrderedBy {
    #[default]
    System,
    User,
}

impl FromStr for OrderedBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(OrderedBy::System),
            "user" => Ok(OrderedBy::User),
            other => Err(format!("invalid ordered-by '{other}'")),
        }
    }
}

/// The four `deviate` kinds. Any other argument value is a source error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviateKind {
    NotSupported,
    Add,
    Replace,
    Delete,
}

impl DeviateKind {
    pub fn name(&self) -> &'static str {
        match self {
            DeviateKind::NotSupported => "not-supported",
            DeviateKind::Add => "add",
            DeviateKind::Replace => "replace",
            DeviateKind::Delete => "delete",
        }
    }
}

impl FromStr for DeviateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-supported" => Ok(DeviateKind::NotSupported),
            "add" => Ok(DeviateKind::Add),
            "replace" => Ok(DeviateKind::Replace),
            "delete" => Ok(DeviateKind::Delete),
            other => Err(format!("invalid deviate argument '{other}'")),
        }
    }
}

impl fmt::Display for DeviateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `max-elements` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaxElements {
    Unbounded,
    Bounded(u32),
}

impl FromStr for MaxElements {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "unbounded" {
            return Ok(MaxElements::Unbounded);
        }
        s.parse::<u32>()
            .map(MaxElements::Bounded)
            .map_err(|_| format!("invalid max-elements '{s}'"))
    }
}

/// An `if-feature` predicate: a boolean expression over feature references.
///
/// Generic over the atom so the same shape serves both the declared form
/// (unresolved [`NodeId`] atoms) and the effective form (resolved [`QName`]
/// atoms).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfFeatureExpr<T> {
    Atom(T),
    Not(Box<IfFeatureExpr<T>>),
    And(Vec<IfFeatureExpr<T>>),
    Or(Vec<IfFeatureExpr<T>>),
}

impl<T> IfFeatureExpr<T> {
    /// Rewrite every atom, failing fast on the first error. Used to resolve
    /// prefixes into feature QNames.
    pub fn try_map<U, E>(
        &self,
        f: &mut impl FnMut(&T) -> Result<U, E>,
    ) -> Result<IfFeatureExpr<U>, E> {
        Ok(match self {
            IfFeatureExpr::Atom(atom) => IfFeatureExpr::Atom(f(atom)?),
            IfFeatureExpr::Not(inner) => IfFeatureExpr::Not(Box::new(inner.try_map(f)?)),
            IfFeatureExpr::And(terms) => IfFeatureExpr::And(
                terms
                    .iter()
                    .map(|t| t.try_map(f))
                    .collect::<Result<_, _>>()?,
            ),
            IfFeatureExpr::Or(terms) => IfFeatureExpr::Or(
                terms
                    .iter()
                    .map(|t| t.try_map(f))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    pub fn evaluate(&self, pred: &impl Fn(&T) -> bool) -> bool {
        match self {
            IfFeatureExpr::Atom(atom) => pred(atom),
            IfFeatureExpr::Not(inner) => !inner.evaluate(pred),
            IfFeatureExpr::And(terms) => terms.iter().all(|t| t.evaluate(pred)),
            IfFeatureExpr::Or(terms) => terms.iter().any(|t| t.evaluate(pred)),
        }
    }
}

impl IfFeatureExpr<NodeId> {
    /// Parse an RFC 7950 `if-feature-expr`:
    /// `expr = term *("or" term)`, `term = factor *("and" factor)`,
    /// `factor = "not" factor / "(" expr ")" / identifier-ref`.
    pub fn parse(text: &str) -> Result<IfFeatureExpr<NodeId>, String> {
        let tokens = tokenize_if_feature(text);
        let mut pos = 0;
        let expr = parse_or(&tokens, &mut pos)?;
        if pos != tokens.len() {
            return Err(format!("trailing input in if-feature expression '{text}'"));
        }
        Ok(expr)
    }
}

fn tokenize_if_feature(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if let Some(stripped) = rest.strip_prefix('(') {
            tokens.push("(");
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix(')') {
            tokens.push(")");
            rest = stripped;
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
                .unwrap_or(rest.len());
            tokens.push(&rest[..end]);
            rest = &rest[end..];
        }
    }
    tokens
}

fn parse_or(tokens: &[&str], pos: &mut usize) -> Result<IfFeatureExpr<NodeId>, String> {
    let mut terms = vec![parse_and(tokens, pos)?];
    while tokens.get(*pos) == Some(&"or") {
        *pos += 1;
        terms.push(parse_and(tokens, pos)?);
    }
    Ok(if terms.len() == 1 {
        terms.pop().unwrap()
    } else {
        IfFeatureExpr::Or(terms)
    })
}

fn parse_and(tokens: &[&str], pos: &mut usize) -> Result<IfFeatureExpr<NodeId>, String> {
    let mut terms = vec![parse_factor(tokens, pos)?];
    while tokens.get(*pos) == Some(&"and") {
        *pos += 1;
        terms.push(parse_factor(tokens, pos)?);
    }
    Ok(if terms.len() == 1 {
        terms.pop().unwrap()
    } else {
        IfFeatureExpr::And(terms)
    })
}

fn parse_factor(tokens: &[&str], pos: &mut usize) -> Result<IfFeatureExpr<NodeId>, String> {
    match tokens.get(*pos) {
        Some(&"not") => {
            *pos += 1;
            Ok(IfFeatureExpr::Not(Box::new(parse_factor(tokens, pos)?)))
        }
        Some(&"(") => {
            *pos += 1;
            let expr = parse_or(tokens, pos)?;
            if tokens.get(*pos) != Some(&")") {
                return Err("missing ')' in if-feature expression".to_string());
            }
            *pos += 1;
            Ok(expr)
        }
        Some(&name) if name != ")" && name != "and" && name != "or" => {
            *pos += 1;
            Ok(IfFeatureExpr::Atom(NodeId::parse(name)))
        }
        _ => Err("expected feature name in if-feature expression".to_string()),
    }
}

/// A statement's parsed argument value. Which variant applies is fixed by the
/// keyword's support.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentValue {
    /// Free text (description, reference, organization, contact, ...).
    Str(SmolStr),
    /// A plain identifier (node names, feature names, typedef names, ...).
    Identifier(SmolStr),
    /// A possibly-prefixed reference (`type`, `uses`, `base`, `if-feature`
    /// atoms before resolution).
    Ref(NodeId),
    /// `augment`/`deviation`/`refine` target.
    SchemaNodeId(RawSchemaNodeId),
    /// `config`, `mandatory`, `require-instance`, `yin-element`.
    Boolean(bool),
    Status(Status),
    OrderedBy(OrderedBy),
    /// `value`, `min-elements`, `fraction-digits`.
    Integer(i64),
    MaxElements(MaxElements),
    Deviate(DeviateKind),
    IfFeature(IfFeatureExpr<NodeId>),
    /// Effective-form `if-feature`, atoms resolved to feature QNames.
    IfFeatureResolved(IfFeatureExpr<QName>),
    Path(PathExpression),
    /// `key` - ordered leaf names.
    KeyList(Vec<SmolStr>),
    /// `unique` - one descendant path per referenced leaf.
    UniqueList(Vec<Vec<NodeId>>),
    Revision(Revision),
}

impl ArgumentValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgumentValue::Str(s) | ArgumentValue::Identifier(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgumentValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_parse() {
        let plain = NodeId::parse("neighbor");
        assert_eq!(plain.prefix, None);
        let prefixed = NodeId::parse("bgp:neighbor");
        assert_eq!(prefixed.prefix.as_deref(), Some("bgp"));
        assert_eq!(prefixed.name, "neighbor");
    }

    #[test]
    fn test_schema_node_id_parse() {
        let absolute = RawSchemaNodeId::parse("/ni:network-instances/ni:network-instance").unwrap();
        assert!(absolute.absolute);
        assert_eq!(absolute.nodes.len(), 2);

        let descendant = RawSchemaNodeId::parse("config/name").unwrap();
        assert!(!descendant.absolute);
        assert_eq!(descendant.to_string(), "config/name");

        assert!(RawSchemaNodeId::parse("/a//b").is_err());
        assert!(RawSchemaNodeId::parse("").is_err());
    }

    #[test]
    fn test_deviate_kind_lexicon() {
        assert_eq!("add".parse::<DeviateKind>().unwrap(), DeviateKind::Add);
        assert_eq!(
            "not-supported".parse::<DeviateKind>().unwrap(),
            DeviateKind::NotSupported
        );
        assert!("remove".parse::<DeviateKind>().is_err());
    }

    #[test]
    fn test_if_feature_precedence() {
        // "a or b and not c" parses as a or (b and (not c))
        let expr = IfFeatureExpr::parse("a or b and not c").unwrap();
        let with = |names: &[&str]| {
            let enabled: Vec<String> = names.iter().map(|s| s.to_string()).collect();
            expr.evaluate(&|id: &NodeId| enabled.iter().any(|n| n == id.name.as_str()))
        };
        assert!(with(&["a"]));
        assert!(with(&["b"]));
        assert!(!with(&["b", "c"]));
        assert!(!with(&["c"]));
    }

    #[test]
    fn test_if_feature_parens() {
        let expr = IfFeatureExpr::parse("(a or b) and c").unwrap();
        let with = |names: &[&str]| {
            let enabled: Vec<String> = names.iter().map(|s| s.to_string()).collect();
            expr.evaluate(&|id: &NodeId| enabled.iter().any(|n| n == id.name.as_str()))
        };
        assert!(!with(&["a"]));
        assert!(with(&["a", "c"]));
        assert!(with(&["b", "c"]));
    }

    #[test]
    fn test_if_feature_rejects_garbage() {
        assert!(IfFeatureExpr::parse("and").is_err());
        assert!(IfFeatureExpr::parse("(a").is_err());
        assert!(IfFeatureExpr::parse("a b").is_err());
    }
}
