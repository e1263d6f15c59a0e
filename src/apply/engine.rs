//! The data tree: versioned snapshots plus the transaction façade.

use std::sync::Arc;

use crate::base::{QName, QNameModule, XmlNamespace};
use crate::error::SchemaViolation;
use crate::schema::EffectiveModelContext;
use crate::tree::{InstancePath, NormalizedNode, PathArgument, TreeNode, Version};

use super::modification::{ModifiedNode, Operation, path_args};
use super::strategy::{ApplyOp, build_root};

/// QName of the virtual root container holding every module's top-level
/// data nodes.
pub fn root_qname() -> QName {
    QName::new(
        QNameModule::new(
            XmlNamespace::new("urn:ietf:params:xml:ns:netconf:base:1.0"),
            None,
        ),
        "data",
    )
}

/// A schema-aware versioned instance tree.
///
/// The tree itself only stores the latest committed root; transactions are
/// created from snapshots and produce candidate roots. Sequencing candidate
/// commits is the caller's concern; two transactions from the same snapshot
/// may both succeed in isolation.
pub struct DataTree {
    strategy: Arc<ApplyOp>,
    root: Arc<TreeNode>,
}

impl DataTree {
    /// An empty tree validating against `ctx`.
    pub fn new(ctx: &EffectiveModelContext) -> DataTree {
        let strategy = build_root(ctx);
        let root = TreeNode::from_data(
            Arc::new(NormalizedNode::container(root_qname(), [])),
            Version::next(),
        );
        DataTree { strategy, root }
    }

    pub fn root(&self) -> &Arc<TreeNode> {
        &self.root
    }

    /// Snapshot the current state; cheap (reference bumps only).
    pub fn snapshot(&self) -> DataTreeSnapshot {
        DataTreeSnapshot {
            strategy: Arc::clone(&self.strategy),
            root: Arc::clone(&self.root),
        }
    }

    /// Install a candidate produced by [`DataTreeModification::apply`].
    pub fn commit(&mut self, root: Arc<TreeNode>) {
        self.root = root;
    }
}

/// An immutable view of the tree at one version.
#[derive(Clone)]
pub struct DataTreeSnapshot {
    strategy: Arc<ApplyOp>,
    root: Arc<TreeNode>,
}

impl DataTreeSnapshot {
    pub fn root(&self) -> &Arc<TreeNode> {
        &self.root
    }

    /// Open a transaction against this snapshot. Each transaction owns its
    /// modification tree exclusively.
    pub fn new_modification(&self) -> DataTreeModification {
        DataTreeModification {
            strategy: Arc::clone(&self.strategy),
            base: Arc::clone(&self.root),
            version: Version::next(),
            root: ModifiedNode::new(PathArgument::Node(root_qname())),
            sealed: false,
        }
    }
}

/// One open transaction: record write/merge/delete operations, `seal`, then
/// `apply` to produce the candidate root.
pub struct DataTreeModification {
    strategy: Arc<ApplyOp>,
    base: Arc<TreeNode>,
    version: Version,
    root: ModifiedNode,
    sealed: bool,
}

impl DataTreeModification {
    /// Replace the node at `path` with `node`.
    ///
    /// # Panics
    /// Panics if the modification is sealed or `path` is the root.
    pub fn write(&mut self, path: &InstancePath, node: NormalizedNode) {
        self.record(path, Operation::Write, Some(node));
    }

    /// Merge `node` into the node at `path`.
    ///
    /// # Panics
    /// Panics if the modification is sealed or `path` is the root.
    pub fn merge(&mut self, path: &InstancePath, node: NormalizedNode) {
        self.record(path, Operation::Merge, Some(node));
    }

    /// Remove the node at `path`.
    ///
    /// # Panics
    /// Panics if the modification is sealed or `path` is the root.
    pub fn delete(&mut self, path: &InstancePath) {
        self.record(path, Operation::Delete, None);
    }

    fn record(&mut self, path: &InstancePath, operation: Operation, value: Option<NormalizedNode>) {
        assert!(!self.sealed, "modification is sealed");
        assert!(
            !path.is_root(),
            "the root container cannot be the target of a modification"
        );
        self.root.record(path_args(path), operation, value);
    }

    /// Close the transaction for further recording.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// The transaction's version stamp.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Validate and materialize against the base snapshot, producing the
    /// candidate root. Fail-fast: the first violation aborts the pass.
    ///
    /// # Panics
    /// Panics if the modification has not been sealed.
    pub fn apply(&self) -> Result<Arc<TreeNode>, SchemaViolation> {
        assert!(self.sealed, "modification must be sealed before apply");
        let result = self.strategy.apply(
            &self.root,
            Some(&self.base),
            self.version,
            &InstancePath::root(),
        )?;
        Ok(result.unwrap_or_else(|| Arc::clone(&self.base)))
    }
}
