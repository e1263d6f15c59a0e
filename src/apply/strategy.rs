//! Per-schema modification-apply strategies.
//!
//! One [`ApplyOp`] per schema node kind, built once per effective model.
//! Every modification verb funnels through the shared child-application
//! path, which materializes the empty default for nodes with automatic
//! lifecycle (non-presence containers, choices, list shells) before
//! recursing, and prunes them again when they end up semantically empty.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::QName;
use crate::error::SchemaViolation;
use crate::model::{
    ArgumentValue, EffectiveStmt, MaxElements, StmtFlags, TypeDefinition, YangKeyword,
};
use crate::schema::EffectiveModelContext;
use crate::tree::{InstancePath, NormalizedNode, PathArgument, TreeNode, Value, Version};

use super::modification::{ModifiedNode, Operation};
use super::typecheck::check_value;

/// One `unique` constraint: the descendant leaf paths (local names) whose
/// value tuple must be unique across entries.
type UniqueConstraint = Vec<Vec<SmolStr>>;

/// Case bookkeeping computed at build time.
#[derive(Debug, Clone)]
pub(crate) struct CaseEnforcer {
    pub name: SmolStr,
    pub children: Vec<PathArgument>,
    pub mandatory: Vec<PathArgument>,
}

#[derive(Debug)]
pub(crate) enum OpKind {
    /// The virtual top container holding every module's top-level nodes.
    Root,
    Container {
        presence: bool,
        mandatory: Vec<PathArgument>,
    },
    List {
        qname: QName,
        keys: Vec<QName>,
        min: u32,
        max: Option<u32>,
        entry: Arc<ApplyOp>,
        uniques: Vec<UniqueConstraint>,
    },
    ListEntry {
        keys: Vec<QName>,
        mandatory: Vec<PathArgument>,
    },
    Leaf {
        ty: Option<Arc<TypeDefinition>>,
    },
    LeafSet {
        qname: QName,
        min: u32,
        max: Option<u32>,
        entry: Arc<ApplyOp>,
    },
    LeafSetEntry {
        ty: Option<Arc<TypeDefinition>>,
    },
    Choice {
        cases: Vec<CaseEnforcer>,
        by_child: FxHashMap<PathArgument, usize>,
        /// For each case, the child identifiers of every *other* case.
        exclusions: Vec<Vec<PathArgument>>,
    },
    /// `anydata` / `anyxml`: opaque payloads.
    Any,
    /// Synthesized view over a parent's children restricted to one
    /// augmentation's identifier set.
    Augmentation,
}

/// The modification-apply strategy for one schema node.
#[derive(Debug)]
pub(crate) struct ApplyOp {
    pub kind: OpKind,
    pub children: FxHashMap<PathArgument, Arc<ApplyOp>>,
}

// ============================================================================
// STRATEGY CONSTRUCTION
// ============================================================================

/// Build the root strategy over every module's top-level data nodes.
pub(crate) fn build_root(ctx: &EffectiveModelContext) -> Arc<ApplyOp> {
    let mut children = FxHashMap::default();
    for module in ctx.modules() {
        for stmt in module.stmt().substatements() {
            add_child_strategy(stmt, &mut children);
        }
    }
    Arc::new(ApplyOp {
        kind: OpKind::Root,
        children,
    })
}

fn add_child_strategy(
    stmt: &Arc<EffectiveStmt>,
    children: &mut FxHashMap<PathArgument, Arc<ApplyOp>>,
) {
    let Some(qname) = stmt.qname() else {
        return;
    };
    let data_or_choice = stmt.is_data_node() || stmt.is(YangKeyword::Choice);
    if !data_or_choice {
        return;
    }
    if let Some(op) = build_op(stmt) {
        children.insert(PathArgument::Node(qname.clone()), op);
    }
}

fn structural_children(stmt: &Arc<EffectiveStmt>) -> FxHashMap<PathArgument, Arc<ApplyOp>> {
    let mut children = FxHashMap::default();
    for sub in stmt.substatements() {
        add_child_strategy(sub, &mut children);
    }
    children
}

/// Direct children whose flags mark them mandatory.
fn mandatory_children(stmt: &Arc<EffectiveStmt>) -> Vec<PathArgument> {
    stmt.substatements()
        .iter()
        .filter(|sub| (sub.is_data_node() || sub.is(YangKeyword::Choice)))
        .filter(|sub| sub.flags().contains(StmtFlags::MANDATORY))
        .filter_map(|sub| sub.qname().cloned().map(PathArgument::Node))
        .collect()
}

fn max_elements(stmt: &Arc<EffectiveStmt>) -> Option<u32> {
    match stmt.max_elements() {
        MaxElements::Unbounded => None,
        MaxElements::Bounded(n) => Some(n),
    }
}

fn build_op(stmt: &Arc<EffectiveStmt>) -> Option<Arc<ApplyOp>> {
    let qname = stmt.qname()?.clone();
    let op = match stmt.keyword().as_core()? {
        YangKeyword::Container => ApplyOp {
            kind: OpKind::Container {
                presence: stmt.flags().contains(StmtFlags::PRESENCE),
                mandatory: mandatory_children(stmt),
            },
            children: structural_children(stmt),
        },
        YangKeyword::Leaf => ApplyOp {
            kind: OpKind::Leaf {
                ty: stmt.type_def().cloned(),
            },
            children: FxHashMap::default(),
        },
        YangKeyword::LeafList => {
            let entry = Arc::new(ApplyOp {
                kind: OpKind::LeafSetEntry {
                    ty: stmt.type_def().cloned(),
                },
                children: FxHashMap::default(),
            });
            ApplyOp {
                kind: OpKind::LeafSet {
                    qname,
                    min: stmt.min_elements(),
                    max: max_elements(stmt),
                    entry,
                },
                children: FxHashMap::default(),
            }
        }
        YangKeyword::List => {
            let keys: Vec<QName> = stmt
                .find_first(YangKeyword::Key)
                .and_then(|key| match key.argument() {
                    Some(ArgumentValue::KeyList(names)) => Some(names.clone()),
                    _ => None,
                })
                .unwrap_or_default()
                .into_iter()
                .map(|name| QName::new(qname.module().clone(), name))
                .collect();
            let uniques: Vec<UniqueConstraint> = stmt
                .find_all(YangKeyword::Unique)
                .filter_map(|unique| match unique.argument() {
                    Some(ArgumentValue::UniqueList(paths)) => Some(
                        paths
                            .iter()
                            .map(|path| path.iter().map(|node| node.name.clone()).collect())
                            .collect(),
                    ),
                    _ => None,
                })
                .collect();
            let entry = Arc::new(ApplyOp {
                kind: OpKind::ListEntry {
                    keys: keys.clone(),
                    mandatory: mandatory_children(stmt),
                },
                children: structural_children(stmt),
            });
            ApplyOp {
                kind: OpKind::List {
                    qname,
                    keys,
                    min: stmt.min_elements(),
                    max: max_elements(stmt),
                    entry,
                    uniques,
                },
                children: FxHashMap::default(),
            }
        }
        YangKeyword::Choice => build_choice(stmt),
        YangKeyword::Anydata | YangKeyword::Anyxml => ApplyOp {
            kind: OpKind::Any,
            children: FxHashMap::default(),
        },
        _ => return None,
    };
    Some(Arc::new(op))
}

fn build_choice(stmt: &Arc<EffectiveStmt>) -> ApplyOp {
    let mut cases = Vec::new();
    let mut by_child = FxHashMap::default();
    let mut children = FxHashMap::default();

    let mut push_case = |case_name: SmolStr, members: Vec<&Arc<EffectiveStmt>>| {
        let mut ids = Vec::new();
        let mut mandatory = Vec::new();
        for member in members {
            let Some(qname) = member.qname() else {
                continue;
            };
            let id = PathArgument::Node(qname.clone());
            if member.flags().contains(StmtFlags::MANDATORY) {
                mandatory.push(id.clone());
            }
            ids.push(id.clone());
            by_child.insert(id.clone(), cases.len());
            add_child_strategy(member, &mut children);
        }
        cases.push(CaseEnforcer {
            name: case_name,
            children: ids,
            mandatory,
        });
    };

    for sub in stmt.substatements() {
        if sub.is(YangKeyword::Case) {
            let name: SmolStr = sub
                .qname()
                .map(|q| SmolStr::from(q.local_name()))
                .unwrap_or_default();
            let members: Vec<&Arc<EffectiveStmt>> = sub
                .substatements()
                .iter()
                .filter(|m| m.is_data_node() || m.is(YangKeyword::Choice))
                .collect();
            push_case(name, members);
        } else if sub.is_data_node() || sub.is(YangKeyword::Choice) {
            // shorthand case
            let name: SmolStr = sub
                .qname()
                .map(|q| SmolStr::from(q.local_name()))
                .unwrap_or_default();
            push_case(name, vec![sub]);
        }
    }

    let exclusions = (0..cases.len())
        .map(|idx| {
            cases
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != idx)
                .flat_map(|(_, case)| case.children.iter().cloned())
                .collect()
        })
        .collect();

    ApplyOp {
        kind: OpKind::Choice {
            cases,
            by_child,
            exclusions,
        },
        children,
    }
}

// ============================================================================
// APPLY
// ============================================================================

impl ApplyOp {
    /// The strategy for one child slot. List and leaf-set entries are
    /// resolved dynamically; augmentation slots synthesize a restricted view
    /// over the parent's children.
    pub(crate) fn child(&self, id: &PathArgument) -> Option<Arc<ApplyOp>> {
        match (&self.kind, id) {
            (OpKind::List { qname, entry, .. }, PathArgument::Predicates(entry_id))
                if entry_id.qname() == qname =>
            {
                Some(Arc::clone(entry))
            }
            (OpKind::LeafSet { qname, entry, .. }, PathArgument::Value { qname: q, .. })
                if q == qname =>
            {
                Some(Arc::clone(entry))
            }
            (_, PathArgument::Augmentation(aug)) => {
                let mut children = FxHashMap::default();
                for qname in aug.children() {
                    let slot = PathArgument::Node(qname.clone());
                    if let Some(op) = self.children.get(&slot) {
                        children.insert(slot, Arc::clone(op));
                    } else {
                        return None;
                    }
                }
                Some(Arc::new(ApplyOp {
                    kind: OpKind::Augmentation,
                    children,
                }))
            }
            _ => self.children.get(id).cloned(),
        }
    }

    fn auto_lifecycle(&self) -> bool {
        matches!(
            self.kind,
            OpKind::Container { presence: false, .. }
                | OpKind::Choice { .. }
                | OpKind::List { .. }
                | OpKind::LeafSet { .. }
                | OpKind::Augmentation
                | OpKind::Root
        )
    }

    /// The synthesized empty default for automatic-lifecycle nodes.
    fn empty_shell(&self, id: &PathArgument) -> Option<NormalizedNode> {
        match (&self.kind, id) {
            (OpKind::Container { presence: false, .. }, PathArgument::Node(qname)) => {
                Some(NormalizedNode::container(qname.clone(), []))
            }
            (OpKind::Choice { .. }, PathArgument::Node(qname)) => {
                Some(NormalizedNode::choice(qname.clone(), []))
            }
            (OpKind::List { .. }, PathArgument::Node(qname)) => {
                Some(NormalizedNode::list(qname.clone(), []))
            }
            (OpKind::LeafSet { .. }, PathArgument::Node(qname)) => {
                Some(NormalizedNode::leaf_set(qname.clone(), []))
            }
            (OpKind::Augmentation, PathArgument::Augmentation(aug)) => Some(
                NormalizedNode::augmentation(aug.clone(), []),
            ),
            _ => None,
        }
    }

    /// Apply one modification node against the current state, producing the
    /// node's next version (or `None` when it ends up absent).
    pub(crate) fn apply(
        &self,
        modification: &ModifiedNode,
        current: Option<&Arc<TreeNode>>,
        version: Version,
        path: &InstancePath,
    ) -> Result<Option<Arc<TreeNode>>, SchemaViolation> {
        match modification.operation {
            Operation::None => Ok(current.cloned()),
            Operation::Delete => Ok(None),
            Operation::Write => {
                let value = modification.value.as_ref().ok_or_else(|| {
                    SchemaViolation::schema_mismatch(path.to_string(), "write without a value")
                })?;
                if value.path_arg() != modification.id {
                    return Err(SchemaViolation::schema_mismatch(
                        path.to_string(),
                        format!(
                            "written value identifies as '{}', path names '{}'",
                            value.path_arg(),
                            modification.id
                        ),
                    ));
                }
                self.check_node(value, path)?;
                Ok(Some(TreeNode::from_data(Arc::clone(value), version)))
            }
            Operation::Touch => self.apply_children(modification, current, version, path),
            Operation::Merge => {
                let value = modification.value.as_ref().ok_or_else(|| {
                    SchemaViolation::schema_mismatch(path.to_string(), "merge without a value")
                })?;
                let merged = self.merge_node(current, value, version, path)?;
                if modification.children.is_empty() {
                    Ok(Some(merged))
                } else {
                    self.apply_children(modification, Some(&merged), version, path)
                }
            }
        }
    }

    /// The shared recursion: resolve a base (materializing the empty default
    /// where the lifecycle allows), apply child modifications, prune
    /// semantically empty automatic nodes, and re-check invariants.
    fn apply_children(
        &self,
        modification: &ModifiedNode,
        current: Option<&Arc<TreeNode>>,
        version: Version,
        path: &InstancePath,
    ) -> Result<Option<Arc<TreeNode>>, SchemaViolation> {
        if modification.children.is_empty() {
            return Ok(current.cloned());
        }
        let (base, existed) = match current {
            Some(node) => (Arc::clone(node), true),
            None => {
                let shell = self.empty_shell(&modification.id).ok_or_else(|| {
                    SchemaViolation::schema_mismatch(
                        path.to_string(),
                        "cannot modify children of a node that does not exist",
                    )
                })?;
                (TreeNode::from_data(Arc::new(shell), version), false)
            }
        };

        let mut children = base.children().clone();
        let mut changed = !existed;
        for (id, child_mod) in &modification.children {
            let child_path = path.child(id.clone());
            let child_op = self.child(id).ok_or_else(|| {
                SchemaViolation::schema_mismatch(
                    child_path.to_string(),
                    "schema mismatch: parent schema does not accept this child",
                )
            })?;
            let existing = children.get(id).cloned();
            match child_op.apply(child_mod, existing.as_ref(), version, &child_path)? {
                Some(next) => {
                    if !existing.as_ref().is_some_and(|prev| Arc::ptr_eq(prev, &next)) {
                        changed = true;
                    }
                    children.insert(id.clone(), next);
                }
                None => {
                    if children.shift_remove(id).is_some() {
                        changed = true;
                    }
                }
            }
        }

        if !changed {
            return Ok(current.cloned());
        }
        if children.is_empty() && self.auto_lifecycle() && !matches!(self.kind, OpKind::Root) {
            return Ok(None);
        }
        let result = base.with_children(children, version, !existed);
        self.post_check(result.data(), path)?;
        Ok(Some(result))
    }

    /// Structural merge: union container-like children, overwrite leaves.
    fn merge_node(
        &self,
        current: Option<&Arc<TreeNode>>,
        value: &Arc<NormalizedNode>,
        version: Version,
        path: &InstancePath,
    ) -> Result<Arc<TreeNode>, SchemaViolation> {
        let Some(node) = current else {
            self.check_node(value, path)?;
            return Ok(TreeNode::from_data(Arc::clone(value), version));
        };
        if !value.is_container_like() {
            self.check_node(value, path)?;
            return Ok(TreeNode::from_data(Arc::clone(value), version));
        }
        let mut children = node.children().clone();
        if let Some(incoming) = value.children() {
            for (id, incoming_child) in incoming {
                let child_path = path.child(id.clone());
                let child_op = self.child(id).ok_or_else(|| {
                    SchemaViolation::schema_mismatch(
                        child_path.to_string(),
                        "schema mismatch: parent schema does not accept this child",
                    )
                })?;
                let existing = children.get(id).cloned();
                let merged =
                    child_op.merge_node(existing.as_ref(), incoming_child, version, &child_path)?;
                children.insert(id.clone(), merged);
            }
        }
        let result = node.with_children(children, version, false);
        self.post_check(result.data(), path)?;
        Ok(result)
    }

    // ------------------------------------------------------------------
    // VALIDATION
    // ------------------------------------------------------------------

    /// Full recursive validation of a written normalized node.
    pub(crate) fn check_node(
        &self,
        value: &NormalizedNode,
        path: &InstancePath,
    ) -> Result<(), SchemaViolation> {
        match (&self.kind, value) {
            (OpKind::Leaf { ty }, NormalizedNode::Leaf { value, .. })
            | (OpKind::LeafSetEntry { ty }, NormalizedNode::LeafSetEntry { value, .. }) => {
                if let Some(ty) = ty {
                    check_value(ty, value)
                        .map_err(|reason| SchemaViolation::type_check(path.to_string(), reason))?;
                }
                Ok(())
            }
            (OpKind::Any, NormalizedNode::AnyData { .. })
            | (OpKind::Any, NormalizedNode::AnyXml { .. }) => Ok(()),
            (OpKind::LeafSet { min, max, .. }, NormalizedNode::LeafSet { children, .. }) => {
                self.check_children(children, path)?;
                check_count(children.len(), *min, *max, path)
            }
            (
                OpKind::Container { mandatory, .. },
                NormalizedNode::Container { children, .. },
            ) => {
                self.check_children(children, path)?;
                check_mandatory(children, mandatory, path)
            }
            (OpKind::Root, NormalizedNode::Container { children, .. }) => {
                self.check_children(children, path)
            }
            (OpKind::Augmentation, NormalizedNode::Augmentation { children, .. }) => {
                self.check_children(children, path)
            }
            (
                OpKind::ListEntry { keys, mandatory },
                NormalizedNode::ListEntry { id, children },
            ) => {
                self.check_children(children, path)?;
                check_mandatory(children, mandatory, path)?;
                for key in keys {
                    let Some(predicate) = id.key_value(key) else {
                        return Err(SchemaViolation::schema_mismatch(
                            path.to_string(),
                            format!("entry identifier is missing key '{}'", key.local_name()),
                        ));
                    };
                    let slot = PathArgument::Node(key.clone());
                    if let Some(child) = children.get(&slot) {
                        if child.value() != Some(predicate) {
                            return Err(SchemaViolation::schema_mismatch(
                                path.to_string(),
                                format!(
                                    "key leaf '{}' disagrees with the entry identifier",
                                    key.local_name()
                                ),
                            ));
                        }
                    }
                }
                Ok(())
            }
            (
                OpKind::List {
                    min, max, uniques, ..
                },
                NormalizedNode::List { children, .. },
            ) => {
                self.check_children(children, path)?;
                check_count(children.len(), *min, *max, path)?;
                check_uniques(children, uniques, path)
            }
            (OpKind::Choice { .. }, NormalizedNode::Choice { children, .. }) => {
                self.check_children(children, path)?;
                self.enforce_cases(children, path)
            }
            (_, other) => Err(SchemaViolation::schema_mismatch(
                path.to_string(),
                format!("{} is not valid at this schema node", other.kind_name()),
            )),
        }
    }

    fn check_children(
        &self,
        children: &IndexMap<PathArgument, Arc<NormalizedNode>>,
        path: &InstancePath,
    ) -> Result<(), SchemaViolation> {
        for (id, child) in children {
            let child_path = path.child(id.clone());
            let child_op = self.child(id).ok_or_else(|| {
                SchemaViolation::schema_mismatch(
                    child_path.to_string(),
                    "schema mismatch: parent schema does not accept this child",
                )
            })?;
            child_op.check_node(child, &child_path)?;
        }
        Ok(())
    }

    /// Post-recursion invariants on a rebuilt node: choice case exclusion
    /// and collection cardinality.
    fn post_check(
        &self,
        data: &Arc<NormalizedNode>,
        path: &InstancePath,
    ) -> Result<(), SchemaViolation> {
        match (&self.kind, &**data) {
            (OpKind::Choice { .. }, NormalizedNode::Choice { children, .. }) => {
                self.enforce_cases(children, path)
            }
            (
                OpKind::List {
                    min, max, uniques, ..
                },
                NormalizedNode::List { children, .. },
            ) => {
                check_count(children.len(), *min, *max, path)?;
                check_uniques(children, uniques, path)
            }
            (OpKind::LeafSet { min, max, .. }, NormalizedNode::LeafSet { children, .. }) => {
                check_count(children.len(), *min, *max, path)
            }
            _ => Ok(()),
        }
    }

    /// Inspect a non-empty choice node: the first child picks the case;
    /// no identifier from any other case may be present; the chosen case's
    /// mandatory children must be.
    fn enforce_cases(
        &self,
        children: &IndexMap<PathArgument, Arc<NormalizedNode>>,
        path: &InstancePath,
    ) -> Result<(), SchemaViolation> {
        let OpKind::Choice {
            cases,
            by_child,
            exclusions,
        } = &self.kind
        else {
            return Ok(());
        };
        let Some(first) = children.keys().next() else {
            return Ok(());
        };
        let Some(case_idx) = by_child.get(first) else {
            return Err(SchemaViolation::CaseExclusion {
                path: path.to_string(),
                detail: format!("child '{first}' does not belong to this choice"),
            });
        };
        let excluded = &exclusions[*case_idx];
        for id in children.keys().skip(1) {
            if excluded.contains(id) {
                return Err(SchemaViolation::CaseExclusion {
                    path: path.to_string(),
                    detail: format!(
                        "children '{first}' and '{id}' belong to different cases of the same choice"
                    ),
                });
            }
        }
        let case = &cases[*case_idx];
        for required in &case.mandatory {
            if !children.contains_key(required) {
                return Err(SchemaViolation::MandatoryMissing {
                    path: path.to_string(),
                    detail: format!(
                        "mandatory node '{required}' of case '{}' is missing",
                        case.name
                    ),
                });
            }
        }
        Ok(())
    }
}

fn check_mandatory(
    children: &IndexMap<PathArgument, Arc<NormalizedNode>>,
    mandatory: &[PathArgument],
    path: &InstancePath,
) -> Result<(), SchemaViolation> {
    for required in mandatory {
        if !children.contains_key(required) {
            return Err(SchemaViolation::MandatoryMissing {
                path: path.to_string(),
                detail: format!("mandatory node '{required}' is missing"),
            });
        }
    }
    Ok(())
}

fn check_count(
    count: usize,
    min: u32,
    max: Option<u32>,
    path: &InstancePath,
) -> Result<(), SchemaViolation> {
    if count < min as usize {
        return Err(SchemaViolation::Cardinality {
            path: path.to_string(),
            detail: format!("{count} entries, min-elements is {min}"),
        });
    }
    if let Some(max) = max {
        if count > max as usize {
            return Err(SchemaViolation::Cardinality {
                path: path.to_string(),
                detail: format!("{count} entries, max-elements is {max}"),
            });
        }
    }
    Ok(())
}

/// Extract the value at a descendant leaf path of a list entry; entries
/// missing any referenced leaf do not participate in `unique` comparison.
fn descend_value<'a>(entry: &'a NormalizedNode, steps: &[SmolStr]) -> Option<&'a Value> {
    let mut current = entry;
    let (last, interior) = steps.split_last()?;
    for step in interior {
        let children = current.children()?;
        current = children
            .iter()
            .find(|(id, _)| id.qname().map(QName::local_name) == Some(step.as_str()))
            .map(|(_, child)| &**child)?;
    }
    let children = current.children()?;
    children
        .iter()
        .find(|(id, _)| id.qname().map(QName::local_name) == Some(last.as_str()))
        .and_then(|(_, child)| child.value())
}

fn check_uniques(
    entries: &IndexMap<PathArgument, Arc<NormalizedNode>>,
    uniques: &[UniqueConstraint],
    path: &InstancePath,
) -> Result<(), SchemaViolation> {
    for unique in uniques {
        let mut seen: Vec<(Vec<&Value>, &PathArgument)> = Vec::new();
        for (id, entry) in entries {
            let tuple: Option<Vec<&Value>> = unique
                .iter()
                .map(|steps| descend_value(entry, steps))
                .collect();
            let Some(tuple) = tuple else {
                continue;
            };
            if let Some((_, previous)) = seen.iter().find(|(t, _)| *t == tuple) {
                return Err(SchemaViolation::Unique {
                    path: path.to_string(),
                    detail: format!(
                        "entries '{previous}' and '{id}' collide on a unique constraint"
                    ),
                });
            }
            seen.push((tuple, id));
        }
    }
    Ok(())
}
