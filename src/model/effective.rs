//! Effective statement trees.
//!
//! An effective statement is a declared statement after the reactor has
//! finished with it: `uses` expanded, augments injected, deviations applied,
//! `if-feature` filtering done, defaults inferred into the packed
//! [`StmtFlags`] word, and schema-tree-bearing statements stamped with their
//! canonical [`SchemaNodeId`]. Structurally immutable; shared by `Arc`.

use std::sync::Arc;

use bitflags::bitflags;

use crate::base::{QName, SchemaNodeId};
use crate::model::argument::{ArgumentValue, MaxElements, OrderedBy, Status};
use crate::model::keyword::{StatementKeyword, YangKeyword};
use crate::model::types::TypeDefinition;

bitflags! {
    /// Packed per-statement flags: inferred `config`, `status`, `mandatory`,
    /// `ordered-by user` and presence-container markers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StmtFlags: u16 {
        const CONFIG = 0b0000_0001;
        const MANDATORY = 0b0000_0010;
        const USER_ORDERED = 0b0000_0100;
        const PRESENCE = 0b0000_1000;
        const DEPRECATED = 0b0001_0000;
        const OBSOLETE = 0b0010_0000;
    }
}

impl StmtFlags {
    pub fn status(&self) -> Status {
        if self.contains(StmtFlags::OBSOLETE) {
            Status::Obsolete
        } else if self.contains(StmtFlags::DEPRECATED) {
            Status::Deprecated
        } else {
            Status::Current
        }
    }

    pub fn with_status(mut self, status: Status) -> StmtFlags {
        self.remove(StmtFlags::DEPRECATED | StmtFlags::OBSOLETE);
        match status {
            Status::Current => {}
            Status::Deprecated => self.insert(StmtFlags::DEPRECATED),
            Status::Obsolete => self.insert(StmtFlags::OBSOLETE),
        }
        self
    }
}

/// An effective statement.
#[derive(Debug, Clone)]
pub struct EffectiveStmt {
    keyword: StatementKeyword,
    argument: Option<ArgumentValue>,
    /// Resolved name of schema nodes and named definitions (features,
    /// groupings, typedefs, identities).
    qname: Option<QName>,
    flags: StmtFlags,
    /// Canonical identifier of schema-tree-bearing statements.
    schema_path: Option<SchemaNodeId>,
    /// Compiled type of `leaf` and `leaf-list` statements.
    type_def: Option<Arc<TypeDefinition>>,
    substatements: Vec<Arc<EffectiveStmt>>,
}

impl EffectiveStmt {
    pub fn new(
        keyword: StatementKeyword,
        argument: Option<ArgumentValue>,
        qname: Option<QName>,
        flags: StmtFlags,
        schema_path: Option<SchemaNodeId>,
        type_def: Option<Arc<TypeDefinition>>,
        substatements: Vec<Arc<EffectiveStmt>>,
    ) -> Self {
        Self {
            keyword,
            argument,
            qname,
            flags,
            schema_path,
            type_def,
            substatements,
        }
    }

    pub fn keyword(&self) -> &StatementKeyword {
        &self.keyword
    }

    pub fn argument(&self) -> Option<&ArgumentValue> {
        self.argument.as_ref()
    }

    pub fn qname(&self) -> Option<&QName> {
        self.qname.as_ref()
    }

    pub fn flags(&self) -> StmtFlags {
        self.flags
    }

    pub fn schema_path(&self) -> Option<&SchemaNodeId> {
        self.schema_path.as_ref()
    }

    pub fn type_def(&self) -> Option<&Arc<TypeDefinition>> {
        self.type_def.as_ref()
    }

    pub fn substatements(&self) -> &[Arc<EffectiveStmt>] {
        &self.substatements
    }

    pub fn is(&self, kw: YangKeyword) -> bool {
        self.keyword.is(kw)
    }

    /// True for statements occupying a schema-tree slot.
    pub fn is_schema_node(&self) -> bool {
        self.keyword
            .as_core()
            .is_some_and(|kw| kw.is_schema_node())
            && self.qname.is_some()
    }

    /// True for schema nodes visible in the data tree (`choice`/`case`
    /// excluded).
    pub fn is_data_node(&self) -> bool {
        self.keyword.as_core().is_some_and(|kw| kw.is_data_node()) && self.qname.is_some()
    }

    pub fn find_first(&self, kw: YangKeyword) -> Option<&Arc<EffectiveStmt>> {
        self.substatements.iter().find(|s| s.is(kw))
    }

    pub fn find_all(&self, kw: YangKeyword) -> impl Iterator<Item = &Arc<EffectiveStmt>> {
        self.substatements.iter().filter(move |s| s.is(kw))
    }

    /// String argument of the first substatement with the given keyword.
    pub fn child_str(&self, kw: YangKeyword) -> Option<&str> {
        self.find_first(kw)
            .and_then(|s| s.argument())
            .and_then(ArgumentValue::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.child_str(YangKeyword::Description)
    }

    pub fn reference(&self) -> Option<&str> {
        self.child_str(YangKeyword::Reference)
    }

    pub fn min_elements(&self) -> u32 {
        self.find_first(YangKeyword::MinElements)
            .and_then(|s| match s.argument() {
                Some(ArgumentValue::Integer(n)) => Some(*n as u32),
                _ => None,
            })
            .unwrap_or(0)
    }

    pub fn max_elements(&self) -> MaxElements {
        self.find_first(YangKeyword::MaxElements)
            .and_then(|s| match s.argument() {
                Some(ArgumentValue::MaxElements(m)) => Some(*m),
                _ => None,
            })
            .unwrap_or(MaxElements::Unbounded)
    }

    pub fn ordered_by(&self) -> OrderedBy {
        if self.flags.contains(StmtFlags::USER_ORDERED) {
            OrderedBy::User
        } else {
            OrderedBy::System
        }
    }

    /// Direct schema-tree child with the given QName. For a `choice` this
    /// finds its cases; for containers and lists, their child schema nodes.
    pub fn schema_child(&self, qname: &QName) -> Option<&Arc<EffectiveStmt>> {
        self.substatements
            .iter()
            .find(|s| s.is_schema_node() && s.qname() == Some(qname))
    }

    /// Data-tree child with the given QName, looking through intermediate
    /// `choice`/`case` levels.
    pub fn data_child(&self, qname: &QName) -> Option<&Arc<EffectiveStmt>> {
        for sub in &self.substatements {
            if sub.is_data_node() {
                if sub.qname() == Some(qname) {
                    return Some(sub);
                }
            } else if sub
                .keyword
                .as_core()
                .is_some_and(|kw| matches!(kw, YangKeyword::Choice | YangKeyword::Case))
            {
                if let Some(found) = sub.data_child(qname) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// The chain of schema-tree statements from (exclusive) `self` down to
    /// the data child `qname`, including any elided `choice`/`case` levels.
    pub fn data_child_path(&self, qname: &QName) -> Option<Vec<Arc<EffectiveStmt>>> {
        for sub in &self.substatements {
            if sub.is_data_node() {
                if sub.qname() == Some(qname) {
                    return Some(vec![Arc::clone(sub)]);
                }
            } else if sub
                .keyword
                .as_core()
                .is_some_and(|kw| matches!(kw, YangKeyword::Choice | YangKeyword::Case))
            {
                if let Some(mut chain) = sub.data_child_path(qname) {
                    chain.insert(0, Arc::clone(sub));
                    return Some(chain);
                }
            }
        }
        None
    }

    /// A `grouping` substatement by name.
    pub fn grouping(&self, qname: &QName) -> Option<&Arc<EffectiveStmt>> {
        self.substatements
            .iter()
            .find(|s| s.is(YangKeyword::Grouping) && s.qname() == Some(qname))
    }

    /// All schema-tree children, in declaration order.
    pub fn schema_children(&self) -> impl Iterator<Item = &Arc<EffectiveStmt>> {
        self.substatements.iter().filter(|s| s.is_schema_node())
    }

    /// All data-tree children, looking through `choice`/`case` levels.
    pub fn data_children(&self) -> Vec<&Arc<EffectiveStmt>> {
        let mut out = Vec::new();
        collect_data_children(self, &mut out);
        out
    }
}

/// Structural equality: everything except the compiled type payload (whose
/// compiled regex forms carry no usable equality).
impl PartialEq for EffectiveStmt {
    fn eq(&self, other: &Self) -> bool {
        self.keyword == other.keyword
            && self.argument == other.argument
            && self.qname == other.qname
            && self.flags == other.flags
            && self.schema_path == other.schema_path
            && self.substatements == other.substatements
    }
}

fn collect_data_children<'a>(stmt: &'a EffectiveStmt, out: &mut Vec<&'a Arc<EffectiveStmt>>) {
    for sub in stmt.substatements() {
        if sub.is_data_node() {
            out.push(sub);
        } else if sub
            .keyword()
            .as_core()
            .is_some_and(|kw| matches!(kw, YangKeyword::Choice | YangKeyword::Case))
        {
            collect_data_children(sub, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{QNameModule, XmlNamespace};

    fn qname(name: &str) -> QName {
        QName::new(
            QNameModule::new(XmlNamespace::new("urn:test"), None),
            name,
        )
    }

    fn node(kw: YangKeyword, name: &str, subs: Vec<Arc<EffectiveStmt>>) -> Arc<EffectiveStmt> {
        Arc::new(EffectiveStmt::new(
            kw.into(),
            Some(ArgumentValue::Identifier(name.into())),
            Some(qname(name)),
            StmtFlags::CONFIG,
            None,
            None,
            subs,
        ))
    }

    #[test]
    fn test_data_child_elides_choice_and_case() {
        let leaf = node(YangKeyword::Leaf, "x", vec![]);
        let case_a = node(YangKeyword::Case, "a", vec![leaf]);
        let choice = node(YangKeyword::Choice, "ch", vec![case_a]);
        let container = node(YangKeyword::Container, "top", vec![choice]);

        // schema step sees the choice, not the leaf
        assert!(container.schema_child(&qname("ch")).is_some());
        assert!(container.schema_child(&qname("x")).is_none());

        // data step sees through choice/case
        let chain = container.data_child_path(&qname("x")).unwrap();
        assert_eq!(chain.len(), 3);
        assert!(chain[0].is(YangKeyword::Choice));
        assert!(chain[1].is(YangKeyword::Case));
        assert!(chain[2].is(YangKeyword::Leaf));
        assert!(container.data_child(&qname("x")).unwrap().is(YangKeyword::Leaf));
    }

    #[test]
    fn test_status_flags_round_trip() {
        let flags = StmtFlags::empty().with_status(Status::Deprecated);
        assert_eq!(flags.status(), Status::Deprecated);
        let flags = flags.with_status(Status::Obsolete);
        assert_eq!(flags.status(), Status::Obsolete);
        let flags = flags.with_status(Status::Current);
        assert_eq!(flags.status(), Status::Current);
    }
}
