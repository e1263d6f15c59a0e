//! Parsed `path` arguments for `leafref` types.
//!
//! The core needs no XPath evaluator; a `path` argument is reduced to a typed
//! [`PathExpression`] whose steps are tagged parent/child, with key
//! predicates stripped. `deref(...)` expressions keep the two step lists
//! separate so the inference stack can resolve them in order.

use std::fmt;

use crate::model::argument::NodeId;

/// One step of a location path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `..`
    Parent,
    /// A named child step, possibly prefixed.
    Child(NodeId),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Parent => f.write_str(".."),
            Step::Child(node) => write!(f, "{node}"),
        }
    }
}

/// A parsed `path` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpression {
    /// `/a/b/c` - resolved from the model root.
    Absolute(Vec<Step>),
    /// `../a/b` - resolved from the current position.
    Relative(Vec<Step>),
    /// `deref(../a)/../b` - dereference a leafref, then navigate onward.
    Deref { deref: Vec<Step>, rest: Vec<Step> },
}

impl PathExpression {
    pub fn parse(text: &str) -> Result<PathExpression, String> {
        let text = text.trim();
        if let Some(inner) = text.strip_prefix("deref(") {
            let close = find_closing_paren(inner)
                .ok_or_else(|| format!("unterminated deref in path '{text}'"))?;
            let deref_steps = parse_steps(&inner[..close])?;
            let rest_text = inner[close + 1..].trim();
            let rest_text = rest_text
                .strip_prefix('/')
                .ok_or_else(|| format!("expected '/' after deref in path '{text}'"))?;
            let rest = parse_steps(rest_text)?;
            return Ok(PathExpression::Deref {
                deref: deref_steps,
                rest,
            });
        }
        if let Some(body) = text.strip_prefix('/') {
            let steps = parse_steps(body)?;
            if steps.iter().any(|s| matches!(s, Step::Parent)) {
                return Err(format!("absolute path '{text}' cannot contain '..'"));
            }
            return Ok(PathExpression::Absolute(steps));
        }
        Ok(PathExpression::Relative(parse_steps(text)?))
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, steps: &[Step]| -> fmt::Result {
            for (i, step) in steps.iter().enumerate() {
                if i > 0 {
                    f.write_str("/")?;
                }
                write!(f, "{step}")?;
            }
            Ok(())
        };
        match self {
            PathExpression::Absolute(steps) => {
                f.write_str("/")?;
                join(f, steps)
            }
            PathExpression::Relative(steps) => join(f, steps),
            PathExpression::Deref { deref, rest } => {
                f.write_str("deref(")?;
                join(f, deref)?;
                f.write_str(")/")?;
                join(f, rest)
            }
        }
    }
}

fn find_closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

fn parse_steps(text: &str) -> Result<Vec<Step>, String> {
    let mut steps = Vec::new();
    for segment in text.split('/') {
        let segment = strip_predicates(segment.trim())?;
        if segment.is_empty() {
            return Err(format!("empty step in path '{text}'"));
        }
        if segment == ".." {
            if steps.iter().any(|s| matches!(s, Step::Child(_))) {
                return Err(format!("'..' after a child step in path '{text}'"));
            }
            steps.push(Step::Parent);
        } else {
            steps.push(Step::Child(NodeId::parse(&segment)));
        }
    }
    Ok(steps)
}

/// Drop `[...]` key predicates from a step; their contents are not needed
/// for schema resolution.
fn strip_predicates(segment: &str) -> Result<String, String> {
    let mut out = String::new();
    let mut chars = segment.char_indices();
    while let Some((_, c)) = chars.next() {
        if c != '[' {
            out.push(c);
            continue;
        }
        let mut closed = false;
        let mut in_quote: Option<char> = None;
        for (_, c) in chars.by_ref() {
            match (c, in_quote) {
                (q, Some(open)) if q == open => in_quote = None,
                (_, Some(_)) => {}
                ('\'' | '"', None) => in_quote = Some(c),
                (']', None) => {
                    closed = true;
                    break;
                }
                _ => {}
            }
        }
        if !closed {
            return Err(format!("unterminated predicate in step '{segment}'"));
        }
    }
    Ok(out.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path() {
        let path = PathExpression::parse("/if:interfaces/if:interface/if:name").unwrap();
        match path {
            PathExpression::Absolute(steps) => {
                assert_eq!(steps.len(), 3);
                assert!(matches!(&steps[0], Step::Child(n) if n.name == "interfaces"));
            }
            other => panic!("expected absolute path, got {other:?}"),
        }
    }

    #[test]
    fn test_relative_path_with_parents() {
        let path = PathExpression::parse("../../config/name").unwrap();
        match path {
            PathExpression::Relative(steps) => {
                assert_eq!(steps.len(), 4);
                assert_eq!(steps[0], Step::Parent);
                assert_eq!(steps[1], Step::Parent);
            }
            other => panic!("expected relative path, got {other:?}"),
        }
    }

    #[test]
    fn test_predicates_are_stripped() {
        let path =
            PathExpression::parse("/nodes/node[name = current()/../node-ref]/id").unwrap();
        match path {
            PathExpression::Absolute(steps) => {
                assert_eq!(steps.len(), 3);
                assert!(matches!(&steps[1], Step::Child(n) if n.name == "node"));
            }
            other => panic!("expected absolute path, got {other:?}"),
        }
    }

    #[test]
    fn test_deref_path() {
        let path = PathExpression::parse("deref(../neighbor-ref)/../address").unwrap();
        match path {
            PathExpression::Deref { deref, rest } => {
                assert_eq!(deref.len(), 2);
                assert_eq!(rest.len(), 2);
                assert_eq!(rest[0], Step::Parent);
            }
            other => panic!("expected deref path, got {other:?}"),
        }
    }

    #[test]
    fn test_parent_after_child_rejected() {
        assert!(PathExpression::parse("a/../b").is_err());
        assert!(PathExpression::parse("/a/../b").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["/a:x/a:y", "../x/y", "deref(../r)/../addr"] {
            let parsed = PathExpression::parse(text).unwrap();
            assert_eq!(parsed.to_string(), text);
        }
    }
}
