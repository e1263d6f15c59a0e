//! Normalized nodes: the canonical in-memory form of instance data.
//!
//! A tagged tree keyed by [`PathArgument`] child slots. Structurally
//! immutable: children are held behind `Arc`, and "modifying" a node means
//! building a new one that shares the untouched children.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::base::QName;
use crate::tree::value::Value;

/// Identifier of an augmentation node: the sorted set of child QNames the
/// augmentation contributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AugmentationId(Arc<[QName]>);

impl AugmentationId {
    pub fn new(mut children: Vec<QName>) -> Self {
        children.sort();
        children.dedup();
        Self(children.into())
    }

    pub fn children(&self) -> &[QName] {
        &self.0
    }
}

/// Identifier of a list entry: the list QName plus its key leaf values, in
/// key order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListEntryId {
    qname: QName,
    keys: Arc<[(QName, Value)]>,
}

impl ListEntryId {
    pub fn new(qname: QName, keys: Vec<(QName, Value)>) -> Self {
        Self {
            qname,
            keys: keys.into(),
        }
    }

    pub fn qname(&self) -> &QName {
        &self.qname
    }

    pub fn keys(&self) -> &[(QName, Value)] {
        &self.keys
    }

    pub fn key_value(&self, qname: &QName) -> Option<&Value> {
        self.keys.iter().find(|(k, _)| k == qname).map(|(_, v)| v)
    }
}

/// A child slot key: what a parent's ordered child map is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathArgument {
    /// Plain child (leaf, container, list node, choice, any*).
    Node(QName),
    /// Leaf-set entry, identified by its value.
    Value { qname: QName, value: Value },
    /// List entry, identified by its key predicates.
    Predicates(ListEntryId),
    /// Augmentation node.
    Augmentation(AugmentationId),
}

impl PathArgument {
    pub fn qname(&self) -> Option<&QName> {
        match self {
            PathArgument::Node(qname) => Some(qname),
            PathArgument::Value { qname, .. } => Some(qname),
            PathArgument::Predicates(id) => Some(id.qname()),
            PathArgument::Augmentation(_) => None,
        }
    }
}

impl fmt::Display for PathArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathArgument::Node(qname) => f.write_str(qname.local_name()),
            PathArgument::Value { qname, value } => {
                write!(f, "{}[.={}]", qname.local_name(), value)
            }
            PathArgument::Predicates(id) => {
                f.write_str(id.qname().local_name())?;
                for (key, value) in id.keys() {
                    write!(f, "[{}={}]", key.local_name(), value)?;
                }
                Ok(())
            }
            PathArgument::Augmentation(id) => {
                f.write_str("augmentation(")?;
                for (i, qname) in id.children().iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    f.write_str(qname.local_name())?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A path from the (conceptual) tree root to one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct InstancePath {
    args: Vec<PathArgument>,
}

impl InstancePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn of(args: impl IntoIterator<Item = PathArgument>) -> Self {
        Self {
            args: args.into_iter().collect(),
        }
    }

    pub fn args(&self) -> &[PathArgument] {
        &self.args
    }

    pub fn is_root(&self) -> bool {
        self.args.is_empty()
    }

    pub fn child(&self, arg: PathArgument) -> InstancePath {
        let mut args = self.args.clone();
        args.push(arg);
        InstancePath { args }
    }

    pub fn parent(&self) -> Option<InstancePath> {
        if self.args.is_empty() {
            return None;
        }
        Some(InstancePath {
            args: self.args[..self.args.len() - 1].to_vec(),
        })
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return f.write_str("/");
        }
        for arg in &self.args {
            write!(f, "/{arg}")?;
        }
        Ok(())
    }
}

/// Ordered children of a container-like node.
pub type Children = IndexMap<PathArgument, Arc<NormalizedNode>>;

/// The tagged normalized-node variants.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedNode {
    Leaf { qname: QName, value: Value },
    LeafSetEntry { qname: QName, value: Value },
    LeafSet { qname: QName, children: Children },
    Container { qname: QName, children: Children },
    List { qname: QName, children: Children },
    ListEntry { id: ListEntryId, children: Children },
    Choice { qname: QName, children: Children },
    Augmentation { id: AugmentationId, children: Children },
    AnyData { qname: QName, value: Value },
    AnyXml { qname: QName, value: Value },
}

impl NormalizedNode {
    // ------------------------------------------------------------------
    // constructors
    // ------------------------------------------------------------------

    pub fn leaf(qname: QName, value: impl Into<Value>) -> NormalizedNode {
        NormalizedNode::Leaf {
            qname,
            value: value.into(),
        }
    }

    pub fn leaf_set_entry(qname: QName, value: impl Into<Value>) -> NormalizedNode {
        NormalizedNode::LeafSetEntry {
            qname,
            value: value.into(),
        }
    }

    pub fn leaf_set(
        qname: QName,
        entries: impl IntoIterator<Item = NormalizedNode>,
    ) -> NormalizedNode {
        NormalizedNode::LeafSet {
            qname,
            children: Self::index(entries),
        }
    }

    pub fn container(
        qname: QName,
        children: impl IntoIterator<Item = NormalizedNode>,
    ) -> NormalizedNode {
        NormalizedNode::Container {
            qname,
            children: Self::index(children),
        }
    }

    pub fn list(
        qname: QName,
        entries: impl IntoIterator<Item = NormalizedNode>,
    ) -> NormalizedNode {
        NormalizedNode::List {
            qname,
            children: Self::index(entries),
        }
    }

    pub fn list_entry(
        id: ListEntryId,
        children: impl IntoIterator<Item = NormalizedNode>,
    ) -> NormalizedNode {
        NormalizedNode::ListEntry {
            id,
            children: Self::index(children),
        }
    }

    pub fn choice(
        qname: QName,
        children: impl IntoIterator<Item = NormalizedNode>,
    ) -> NormalizedNode {
        NormalizedNode::Choice {
            qname,
            children: Self::index(children),
        }
    }

    pub fn augmentation(
        id: AugmentationId,
        children: impl IntoIterator<Item = NormalizedNode>,
    ) -> NormalizedNode {
        NormalizedNode::Augmentation {
            id,
            children: Self::index(children),
        }
    }

    pub fn anydata(qname: QName, value: impl Into<Value>) -> NormalizedNode {
        NormalizedNode::AnyData {
            qname,
            value: value.into(),
        }
    }

    pub fn anyxml(qname: QName, value: impl Into<Value>) -> NormalizedNode {
        NormalizedNode::AnyXml {
            qname,
            value: value.into(),
        }
    }

    fn index(children: impl IntoIterator<Item = NormalizedNode>) -> Children {
        children
            .into_iter()
            .map(|child| (child.path_arg(), Arc::new(child)))
            .collect()
    }

    // ------------------------------------------------------------------
    // accessors
    // ------------------------------------------------------------------

    /// The child-slot key this node occupies in its parent.
    pub fn path_arg(&self) -> PathArgument {
        match self {
            NormalizedNode::Leaf { qname, .. }
            | NormalizedNode::LeafSet { qname, .. }
            | NormalizedNode::Container { qname, .. }
            | NormalizedNode::List { qname, .. }
            | NormalizedNode::Choice { qname, .. }
            | NormalizedNode::AnyData { qname, .. }
            | NormalizedNode::AnyXml { qname, .. } => PathArgument::Node(qname.clone()),
            NormalizedNode::LeafSetEntry { qname, value } => PathArgument::Value {
                qname: qname.clone(),
                value: value.clone(),
            },
            NormalizedNode::ListEntry { id, .. } => PathArgument::Predicates(id.clone()),
            NormalizedNode::Augmentation { id, .. } => PathArgument::Augmentation(id.clone()),
        }
    }

    pub fn qname(&self) -> Option<&QName> {
        match self {
            NormalizedNode::Leaf { qname, .. }
            | NormalizedNode::LeafSetEntry { qname, .. }
            | NormalizedNode::LeafSet { qname, .. }
            | NormalizedNode::Container { qname, .. }
            | NormalizedNode::List { qname, .. }
            | NormalizedNode::Choice { qname, .. }
            | NormalizedNode::AnyData { qname, .. }
            | NormalizedNode::AnyXml { qname, .. } => Some(qname),
            NormalizedNode::ListEntry { id, .. } => Some(id.qname()),
            NormalizedNode::Augmentation { .. } => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            NormalizedNode::Leaf { value, .. }
            | NormalizedNode::LeafSetEntry { value, .. }
            | NormalizedNode::AnyData { value, .. }
            | NormalizedNode::AnyXml { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&Children> {
        match self {
            NormalizedNode::LeafSet { children, .. }
            | NormalizedNode::Container { children, .. }
            | NormalizedNode::List { children, .. }
            | NormalizedNode::ListEntry { children, .. }
            | NormalizedNode::Choice { children, .. }
            | NormalizedNode::Augmentation { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn child(&self, arg: &PathArgument) -> Option<&Arc<NormalizedNode>> {
        self.children().and_then(|c| c.get(arg))
    }

    /// Same variant and identity, different children.
    pub fn with_children(&self, children: Children) -> NormalizedNode {
        match self {
            NormalizedNode::LeafSet { qname, .. } => NormalizedNode::LeafSet {
                qname: qname.clone(),
                children,
            },
            NormalizedNode::Container { qname, .. } => NormalizedNode::Container {
                qname: qname.clone(),
                children,
            },
            NormalizedNode::List { qname, .. } => NormalizedNode::List {
                qname: qname.clone(),
                children,
            },
            NormalizedNode::ListEntry { id, .. } => NormalizedNode::ListEntry {
                id: id.clone(),
                children,
            },
            NormalizedNode::Choice { qname, .. } => NormalizedNode::Choice {
                qname: qname.clone(),
                children,
            },
            NormalizedNode::Augmentation { id, .. } => NormalizedNode::Augmentation {
                id: id.clone(),
                children,
            },
            other => other.clone(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            NormalizedNode::Leaf { .. } => "leaf",
            NormalizedNode::LeafSetEntry { .. } => "leaf-set entry",
            NormalizedNode::LeafSet { .. } => "leaf-set",
            NormalizedNode::Container { .. } => "container",
            NormalizedNode::List { .. } => "list",
            NormalizedNode::ListEntry { .. } => "list entry",
            NormalizedNode::Choice { .. } => "choice",
            NormalizedNode::Augmentation { .. } => "augmentation",
            NormalizedNode::AnyData { .. } => "anydata",
            NormalizedNode::AnyXml { .. } => "anyxml",
        }
    }

    pub fn is_container_like(&self) -> bool {
        self.children().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{QNameModule, XmlNamespace};

    fn qname(name: &str) -> QName {
        QName::new(QNameModule::new(XmlNamespace::new("urn:t"), None), name)
    }

    #[test]
    fn test_container_children_keyed_by_path_arg() {
        let container = NormalizedNode::container(
            qname("c"),
            [
                NormalizedNode::leaf(qname("a"), 1i64),
                NormalizedNode::leaf(qname("b"), "x"),
            ],
        );
        let a = container.child(&PathArgument::Node(qname("a"))).unwrap();
        assert_eq!(a.value(), Some(&Value::Int(1)));
        assert!(container.child(&PathArgument::Node(qname("z"))).is_none());
    }

    #[test]
    fn test_list_entry_identity() {
        let id = ListEntryId::new(qname("servers"), vec![(qname("name"), "s1".into())]);
        let entry = NormalizedNode::list_entry(
            id.clone(),
            [NormalizedNode::leaf(qname("name"), "s1")],
        );
        assert_eq!(entry.path_arg(), PathArgument::Predicates(id));
        assert_eq!(entry.path_arg().to_string(), "servers[name=s1]");
    }

    #[test]
    fn test_augmentation_id_is_order_insensitive() {
        let a = AugmentationId::new(vec![qname("x"), qname("y")]);
        let b = AugmentationId::new(vec![qname("y"), qname("x")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_instance_path_display() {
        let path = InstancePath::root()
            .child(PathArgument::Node(qname("interfaces")))
            .child(PathArgument::Node(qname("mtu")));
        assert_eq!(path.to_string(), "/interfaces/mtu");
        assert_eq!(path.parent().unwrap().to_string(), "/interfaces");
        assert!(InstancePath::root().is_root());
    }
}
