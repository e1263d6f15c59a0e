//! `uses` / `grouping` expansion.
//!
//! A grouping's internal `uses` statements are expanded in the grouping's
//! own lexical context first (memoized), then the fully expanded body is
//! cloned into the `uses` site tagged `AddedByUses`. `refine` and `augment`
//! substatements of the `uses` are applied to the clones, never to the
//! grouping itself. A grouping that reaches itself through any chain of
//! `uses` is a cycle.

use smol_str::SmolStr;

use crate::error::{InferenceError, ReactorIssue};
use crate::model::{ArgumentValue, NodeId, YangKeyword};
use crate::reactor::arena::{CopyType, StmtId};
use crate::reactor::namespace::{GroupingNs, ModuleCtx, Namespace};
use crate::reactor::reactor::Reactor;
use crate::reactor::support::StatementPolicy;

/// Substatements of `uses` and `refine` that replace rather than accumulate.
fn is_singleton(kw: YangKeyword) -> bool {
    !matches!(kw, YangKeyword::Must | YangKeyword::IfFeature | YangKeyword::Unique)
}

impl Reactor {
    /// Expand every `uses` in every module tree.
    pub(crate) fn expand_all_uses(&mut self) {
        for root in self.module_roots() {
            for id in self.arena.walk(root) {
                if self.arena[id].keyword.is(YangKeyword::Uses) && !self.arena[id].expanded {
                    if let Err(issue) = self.expand_uses(id) {
                        self.issues.push(issue);
                    }
                }
            }
        }
    }

    fn expand_uses(&mut self, uses: StmtId) -> Result<(), ReactorIssue> {
        if self.arena[uses].expanded {
            return Ok(());
        }
        // set before recursing so a failing expansion is not retried
        self.arena[uses].expanded = true;

        let at = self.arena[uses].source_ref.clone();
        let raw = self.required_raw(uses, "grouping name")?;
        let node = NodeId::parse(&raw);
        let grouping = self.resolve_scoped::<GroupingNs>(uses, &node).ok_or_else(|| {
            InferenceError::unresolved(
                format!("uses of grouping '{node}'"),
                format!("grouping '{node}'"),
                at.clone(),
            )
        })?;

        self.ensure_grouping_expanded(grouping)?;

        let parent = self.arena[uses].parent.ok_or_else(|| {
            InferenceError::other("'uses' without a parent statement", at.clone())
        })?;

        // the grouping's first instantiation anywhere is the Original copy;
        // every later use, and every expansion nested inside another
        // grouping's body, is AddedByUses
        let first_use = self.used_groupings.insert(grouping);
        let copy_type = if first_use && self.expansion_stack.is_empty() {
            CopyType::Original
        } else {
            CopyType::AddedByUses
        };

        let mut copies = Vec::new();
        for child in self.arena[grouping].children.clone() {
            let Some(kw) = self.arena[child].keyword.as_core() else {
                continue;
            };
            if matches!(
                kw,
                YangKeyword::Description
                    | YangKeyword::Reference
                    | YangKeyword::Status
            ) {
                continue;
            }
            let policy = self
                .registry
                .get(kw)
                .map(|support| support.policy())
                .unwrap_or(StatementPolicy::ContextIndependent);
            if policy == StatementPolicy::RejectReplica {
                return Err(InferenceError::other(
                    format!("{kw} cannot be replicated by 'uses'"),
                    at.clone(),
                )
                .into());
            }
            let copy = self.arena.deep_copy(child, parent, copy_type);
            self.arena[parent].children.push(copy);
            copies.push(copy);
        }

        for refine in self.children_with(uses, YangKeyword::Refine) {
            self.apply_refine(refine, &copies)?;
        }
        for augment in self.children_with(uses, YangKeyword::Augment) {
            self.apply_uses_augment(augment, &copies)?;
        }
        Ok(())
    }

    /// Expand the `uses` inside a grouping definition, in the grouping's own
    /// lexical context, exactly once.
    fn ensure_grouping_expanded(&mut self, grouping: StmtId) -> Result<(), ReactorIssue> {
        if self.expanded_groupings.contains(&grouping) {
            return Ok(());
        }
        if self.expansion_stack.contains(&grouping) {
            let name = self.arena[grouping]
                .raw_argument
                .clone()
                .unwrap_or_default();
            return Err(InferenceError::cycle(
                format!("grouping '{name}' uses itself"),
                self.arena[grouping].source_ref.clone(),
            )
            .into());
        }
        self.expansion_stack.push(grouping);
        let result: Result<(), ReactorIssue> = (|| {
            let nested: Vec<StmtId> = self
                .arena
                .walk(grouping)
                .into_iter()
                .filter(|id| {
                    self.arena[*id].keyword.is(YangKeyword::Uses) && !self.arena[*id].expanded
                })
                .collect();
            for uses in nested {
                self.expand_uses(uses)?;
            }
            Ok(())
        })();
        self.expansion_stack.pop();
        result?;
        self.expanded_groupings.insert(grouping);
        Ok(())
    }

    /// Resolve a possibly-prefixed name against a lexically scoped
    /// namespace: a foreign prefix targets the named module's top level,
    /// anything else walks outward from the reference site.
    pub(crate) fn resolve_scoped<N>(&self, ctx: StmtId, node: &NodeId) -> Option<StmtId>
    where
        N: Namespace<Key = SmolStr, Value = StmtId>,
    {
        let local = self.definition_module(ctx);
        if let Ok(module) = self.resolve_reference_module(ctx, node) {
            if Some(&module) != local.as_ref() {
                let module_ctx = self.ns_get::<ModuleCtx>(ctx, &module)?;
                return self.ns_get::<N>(module_ctx, &node.name);
            }
        }
        self.ns_get_lexical::<N>(ctx, &node.name)
    }

    fn apply_refine(&mut self, refine: StmtId, copies: &[StmtId]) -> Result<(), ReactorIssue> {
        let at = self.arena[refine].source_ref.clone();
        let Some(ArgumentValue::SchemaNodeId(raw)) = self.arena[refine].argument.clone() else {
            return Err(InferenceError::other("refine without a target path", at).into());
        };
        let target = self.find_descendant(copies, &raw.nodes).ok_or_else(|| {
            InferenceError::unresolved(
                format!("refine of '{raw}'"),
                format!("descendant node '{raw}'"),
                at,
            )
        })?;
        for child in self.arena[refine].children.clone() {
            let Some(kw) = self.arena[child].keyword.as_core() else {
                continue;
            };
            if is_singleton(kw) {
                self.remove_child_with(target, kw);
            }
            // refinements are modifications of an existing clone, never a
            // grouping's first expansion; always AddedByUses
            let copy = self
                .arena
                .deep_copy(child, target, CopyType::AddedByUses);
            self.arena[target].children.push(copy);
        }
        Ok(())
    }

    fn apply_uses_augment(&mut self, augment: StmtId, copies: &[StmtId]) -> Result<(), ReactorIssue> {
        let at = self.arena[augment].source_ref.clone();
        let Some(ArgumentValue::SchemaNodeId(raw)) = self.arena[augment].argument.clone() else {
            return Err(InferenceError::other("augment without a target path", at).into());
        };
        if raw.absolute {
            return Err(InferenceError::other(
                format!("augment under 'uses' must use a descendant path, got '{raw}'"),
                at,
            )
            .into());
        }
        let target = self.find_descendant(copies, &raw.nodes).ok_or_else(|| {
            InferenceError::unresolved(
                format!("augment of '{raw}'"),
                format!("descendant node '{raw}'"),
                at,
            )
        })?;
        let gates: Vec<StmtId> = self.children_with(augment, YangKeyword::IfFeature);
        for child in self.arena[augment].children.clone() {
            let Some(kw) = self.arena[child].keyword.as_core() else {
                continue;
            };
            if !kw.is_schema_node() && kw != YangKeyword::Uses {
                continue;
            }
            // injections into a clone are augmentation provenance, not a
            // grouping expansion
            let copy = self
                .arena
                .deep_copy(child, target, CopyType::AddedByAugmentation);
            self.arena[target].children.push(copy);
            // the augment's own gates apply to everything it injects
            for gate in &gates {
                let gate_copy = self.arena.deep_copy(*gate, copy, CopyType::AddedByUses);
                self.arena[copy].children.push(gate_copy);
            }
        }
        Ok(())
    }

    /// Resolve a descendant path against freshly copied statements, matching
    /// on declared node names.
    fn find_descendant(&self, roots: &[StmtId], path: &[NodeId]) -> Option<StmtId> {
        let mut candidates: Vec<StmtId> = roots.to_vec();
        let mut found = None;
        for step in path {
            found = candidates.iter().copied().find(|id| {
                self.arena[*id]
                    .raw_argument
                    .as_deref()
                    .is_some_and(|name| name == step.name.as_str())
            });
            let node = found?;
            candidates = self.arena[node].children.clone();
        }
        found
    }

    pub(crate) fn children_with(&self, ctx: StmtId, kw: YangKeyword) -> Vec<StmtId> {
        self.arena[ctx]
            .children
            .iter()
            .copied()
            .filter(|c| self.arena[*c].keyword.is(kw))
            .collect()
    }

    pub(crate) fn remove_child_with(&mut self, ctx: StmtId, kw: YangKeyword) {
        if let Some(child) = self.arena[ctx]
            .children
            .iter()
            .copied()
            .find(|c| self.arena[*c].keyword.is(kw))
        {
            self.arena.detach(child);
        }
    }
}
