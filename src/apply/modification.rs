//! The modification tree: a transient overlay describing one proposed
//! change against a base tree.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::tree::{InstancePath, NormalizedNode, PathArgument};

/// The operation recorded at one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    /// Nothing at this node itself; an ancestor bookkeeping entry.
    #[default]
    None,
    /// Replace the node with the recorded value; child modifications at
    /// this node are ignored.
    Write,
    /// Union the recorded value's structural children into the current
    /// node; leaves are overwritten.
    Merge,
    /// No value of its own; recurse into child modifications.
    Touch,
    /// Remove the node; the parent tolerates absence.
    Delete,
}

/// Transient record of an operation at one path, with child modifications.
/// Created when a transaction touches a path, mutated while the transaction
/// is open, sealed and discarded after apply.
#[derive(Debug, Clone)]
pub struct ModifiedNode {
    pub(crate) id: PathArgument,
    pub(crate) operation: Operation,
    pub(crate) value: Option<Arc<NormalizedNode>>,
    pub(crate) children: IndexMap<PathArgument, ModifiedNode>,
}

impl ModifiedNode {
    pub(crate) fn new(id: PathArgument) -> Self {
        Self {
            id,
            operation: Operation::None,
            value: None,
            children: IndexMap::new(),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn value(&self) -> Option<&Arc<NormalizedNode>> {
        self.value.as_ref()
    }

    /// Record an operation at a (possibly nested) path below this node,
    /// creating `Touch` bookkeeping entries along the way.
    pub(crate) fn record(
        &mut self,
        path: &[PathArgument],
        operation: Operation,
        value: Option<NormalizedNode>,
    ) {
        let Some((first, rest)) = path.split_first() else {
            self.apply_op(operation, value);
            return;
        };
        if self.operation == Operation::None {
            self.operation = Operation::Touch;
        }
        let child = self
            .children
            .entry(first.clone())
            .or_insert_with(|| ModifiedNode::new(first.clone()));
        child.record(rest, operation, value);
    }

    fn apply_op(&mut self, operation: Operation, value: Option<NormalizedNode>) {
        match operation {
            Operation::Write | Operation::Delete => {
                // both supersede anything recorded below
                self.children.clear();
            }
            Operation::Merge | Operation::Touch | Operation::None => {}
        }
        self.operation = operation;
        self.value = value.map(Arc::new);
    }

    /// Leaf-count of this overlay, for diagnostics.
    pub fn len(&self) -> usize {
        1 + self.children.values().map(ModifiedNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.operation == Operation::None && self.children.is_empty()
    }
}

/// Convenience: the path slice of an [`InstancePath`].
pub(crate) fn path_args(path: &InstancePath) -> &[PathArgument] {
    path.args()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{QName, QNameModule, XmlNamespace};

    fn qname(name: &str) -> QName {
        QName::new(QNameModule::new(XmlNamespace::new("urn:t"), None), name)
    }

    fn arg(name: &str) -> PathArgument {
        PathArgument::Node(qname(name))
    }

    #[test]
    fn test_record_creates_touch_spine() {
        let mut root = ModifiedNode::new(arg("data"));
        root.record(
            &[arg("a"), arg("b")],
            Operation::Write,
            Some(NormalizedNode::leaf(qname("b"), 1i64)),
        );
        assert_eq!(root.operation(), Operation::Touch);
        let a = root.children.get(&arg("a")).unwrap();
        assert_eq!(a.operation(), Operation::Touch);
        let b = a.children.get(&arg("b")).unwrap();
        assert_eq!(b.operation(), Operation::Write);
        assert!(b.value().is_some());
        assert_eq!(root.len(), 3);
    }

    #[test]
    fn test_write_supersedes_child_modifications() {
        let mut root = ModifiedNode::new(arg("data"));
        root.record(
            &[arg("c"), arg("x")],
            Operation::Write,
            Some(NormalizedNode::leaf(qname("x"), 1i64)),
        );
        root.record(
            &[arg("c")],
            Operation::Write,
            Some(NormalizedNode::container(qname("c"), [])),
        );
        let c = root.children.get(&arg("c")).unwrap();
        assert_eq!(c.operation(), Operation::Write);
        assert!(c.children.is_empty());
    }
}
