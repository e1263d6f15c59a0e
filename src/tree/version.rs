//! Versioned tree nodes.
//!
//! A [`TreeNode`] wraps a normalized node with a monotonic version stamp and
//! a subtree version. Writers produce a new root; unchanged subtrees are
//! shared by reference, so a reader holding a prior root never observes
//! partial state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::tree::node::{NormalizedNode, PathArgument};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// A unique, monotonically allocated version stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version(u64);

impl Version {
    /// Allocate a fresh version, greater than every earlier one.
    pub fn next() -> Version {
        Version(NEXT_VERSION.fetch_add(1, Ordering::Relaxed))
    }
}

/// One node of a versioned instance tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    data: Arc<NormalizedNode>,
    /// Stamp of the transaction that last replaced this node itself.
    version: Version,
    /// Stamp of the transaction that last changed anything beneath it.
    subtree_version: Version,
    children: IndexMap<PathArgument, Arc<TreeNode>>,
}

impl TreeNode {
    /// Wrap a whole normalized tree, stamping every node with `version`.
    pub fn from_data(data: Arc<NormalizedNode>, version: Version) -> Arc<TreeNode> {
        let children = data
            .children()
            .map(|children| {
                children
                    .iter()
                    .map(|(id, child)| {
                        (id.clone(), TreeNode::from_data(Arc::clone(child), version))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Arc::new(TreeNode {
            data,
            version,
            subtree_version: version,
            children,
        })
    }

    /// Rebuild a container-like node from changed children: the node data is
    /// reconstructed from the child data, `subtree_version` moves to
    /// `version`, and the node's own `version` moves only if `replaced`.
    pub fn with_children(
        &self,
        children: IndexMap<PathArgument, Arc<TreeNode>>,
        version: Version,
        replaced: bool,
    ) -> Arc<TreeNode> {
        let data_children = children
            .iter()
            .map(|(id, child)| (id.clone(), Arc::clone(&child.data)))
            .collect();
        Arc::new(TreeNode {
            data: Arc::new(self.data.with_children(data_children)),
            version: if replaced { version } else { self.version },
            subtree_version: version,
            children,
        })
    }

    pub fn data(&self) -> &Arc<NormalizedNode> {
        &self.data
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn subtree_version(&self) -> Version {
        self.subtree_version
    }

    pub fn children(&self) -> &IndexMap<PathArgument, Arc<TreeNode>> {
        &self.children
    }

    pub fn child(&self, id: &PathArgument) -> Option<&Arc<TreeNode>> {
        self.children.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{QName, QNameModule, XmlNamespace};

    fn qname(name: &str) -> QName {
        QName::new(QNameModule::new(XmlNamespace::new("urn:t"), None), name)
    }

    #[test]
    fn test_versions_are_unique_and_monotonic() {
        let a = Version::next();
        let b = Version::next();
        assert!(a < b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_data_wraps_recursively() {
        let v = Version::next();
        let tree = TreeNode::from_data(
            Arc::new(NormalizedNode::container(
                qname("top"),
                [NormalizedNode::leaf(qname("l"), 5i64)],
            )),
            v,
        );
        assert_eq!(tree.version(), v);
        let leaf = tree.child(&PathArgument::Node(qname("l"))).unwrap();
        assert_eq!(leaf.version(), v);
        assert_eq!(leaf.data().value().unwrap(), &crate::tree::Value::Int(5));
    }

    #[test]
    fn test_with_children_shares_untouched_subtrees() {
        let v1 = Version::next();
        let tree = TreeNode::from_data(
            Arc::new(NormalizedNode::container(
                qname("top"),
                [
                    NormalizedNode::leaf(qname("a"), 1i64),
                    NormalizedNode::leaf(qname("b"), 2i64),
                ],
            )),
            v1,
        );
        let v2 = Version::next();
        let mut children = tree.children().clone();
        children.insert(
            PathArgument::Node(qname("a")),
            TreeNode::from_data(Arc::new(NormalizedNode::leaf(qname("a"), 9i64)), v2),
        );
        let updated = tree.with_children(children, v2, false);

        assert_eq!(updated.version(), v1);
        assert_eq!(updated.subtree_version(), v2);
        let untouched = updated.child(&PathArgument::Node(qname("b"))).unwrap();
        let original = tree.child(&PathArgument::Node(qname("b"))).unwrap();
        assert!(Arc::ptr_eq(untouched, original));
    }
}
