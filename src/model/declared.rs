//! Declared statement trees.
//!
//! The parser's output: a keyword, the raw argument text, a source reference,
//! and ordered child statements. Immutable once the parser completes; all
//! later phases work on reactor-owned statement contexts, never on this tree.

use smol_str::SmolStr;

use crate::base::SourceRef;
use crate::model::keyword::{StatementKeyword, YangKeyword};

/// One declared statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredStatement {
    keyword: StatementKeyword,
    raw_argument: Option<SmolStr>,
    source_ref: SourceRef,
    children: Vec<DeclaredStatement>,
}

impl DeclaredStatement {
    pub fn new(
        keyword: StatementKeyword,
        raw_argument: Option<SmolStr>,
        source_ref: SourceRef,
        children: Vec<DeclaredStatement>,
    ) -> Self {
        Self {
            keyword,
            raw_argument,
            source_ref,
            children,
        }
    }

    pub fn keyword(&self) -> &StatementKeyword {
        &self.keyword
    }

    pub fn raw_argument(&self) -> Option<&str> {
        self.raw_argument.as_deref()
    }

    pub fn source_ref(&self) -> &SourceRef {
        &self.source_ref
    }

    pub fn children(&self) -> &[DeclaredStatement] {
        &self.children
    }

    /// First child with the given core keyword.
    pub fn find_first(&self, kw: YangKeyword) -> Option<&DeclaredStatement> {
        self.children.iter().find(|c| c.keyword.is(kw))
    }

    /// All children with the given core keyword, in declaration order.
    pub fn find_all(&self, kw: YangKeyword) -> impl Iterator<Item = &DeclaredStatement> {
        self.children.iter().filter(move |c| c.keyword.is(kw))
    }

    /// Raw argument of the first child with the given keyword.
    pub fn child_argument(&self, kw: YangKeyword) -> Option<&str> {
        self.find_first(kw).and_then(|c| c.raw_argument())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(kw: YangKeyword, arg: &str, children: Vec<DeclaredStatement>) -> DeclaredStatement {
        DeclaredStatement::new(
            kw.into(),
            Some(arg.into()),
            SourceRef::new("test.yang", 1, 1),
            children,
        )
    }

    #[test]
    fn test_child_lookup() {
        let module = stmt(
            YangKeyword::Module,
            "foo",
            vec![
                stmt(YangKeyword::Namespace, "urn:foo", vec![]),
                stmt(YangKeyword::Prefix, "foo", vec![]),
                stmt(YangKeyword::Revision, "2024-01-01", vec![]),
                stmt(YangKeyword::Revision, "2023-06-01", vec![]),
            ],
        );
        assert_eq!(module.child_argument(YangKeyword::Namespace), Some("urn:foo"));
        assert_eq!(module.find_all(YangKeyword::Revision).count(), 2);
        assert!(module.find_first(YangKeyword::Contact).is_none());
    }
}
