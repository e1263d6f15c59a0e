//! Effective-model phase passes: `if-feature` elision, schema-tree
//! registration, and the augment/deviation inference actions.

use smol_str::SmolStr;
use tracing::{trace, warn};

use crate::base::QName;
use crate::error::{InferenceError, ReactorIssue};
use crate::model::{ArgumentValue, DeviateKind, IfFeatureExpr, YangKeyword};
use crate::reactor::action::{InferenceAction, Requirement};
use crate::reactor::arena::{CopyType, StmtId};
use crate::reactor::namespace::{FeatureNs, ModuleCtx, Namespace, SchemaTreeNs};
use crate::reactor::phase::ModelPhase;
use crate::reactor::reactor::Reactor;
use crate::reactor::FeatureSet;

/// Bound on feature-to-feature reference chains.
const MAX_FEATURE_DEPTH: u32 = 32;

impl Reactor {
    // ========================================================================
    // IF-FEATURE
    // ========================================================================

    /// Evaluate every `if-feature` predicate against the active feature set
    /// and clear the support flag of every gated statement.
    pub(crate) fn evaluate_if_features(&mut self) {
        for root in self.module_roots() {
            for id in self.arena.walk(root) {
                for gate in self.children_with(id, YangKeyword::IfFeature) {
                    match self.eval_if_feature(gate) {
                        Ok(true) => {}
                        Ok(false) => {
                            trace!(
                                statement = self.arena[id].keyword.text(),
                                "elided by if-feature"
                            );
                            self.arena[id].supported = false;
                        }
                        Err(issue) => self.issues.push(issue),
                    }
                }
            }
        }
    }

    fn eval_if_feature(&mut self, gate: StmtId) -> Result<bool, ReactorIssue> {
        let Some(resolved) = self.resolved_if_feature(gate)? else {
            return Ok(true);
        };
        // keep the resolved form for the effective tree and re-filtering
        self.arena[gate].argument = Some(ArgumentValue::IfFeatureResolved(resolved.clone()));
        self.predicate_holds(&resolved, 0)
    }

    fn predicate_holds(
        &self,
        expr: &IfFeatureExpr<QName>,
        depth: u32,
    ) -> Result<bool, ReactorIssue> {
        Ok(match expr {
            IfFeatureExpr::Atom(qname) => self.feature_enabled(qname, depth)?,
            IfFeatureExpr::Not(inner) => !self.predicate_holds(inner, depth)?,
            IfFeatureExpr::And(terms) => {
                for term in terms {
                    if !self.predicate_holds(term, depth)? {
                        return Ok(false);
                    }
                }
                true
            }
            IfFeatureExpr::Or(terms) => {
                for term in terms {
                    if self.predicate_holds(term, depth)? {
                        return Ok(true);
                    }
                }
                false
            }
        })
    }

    /// A feature is enabled when the active set admits it and its own
    /// `if-feature` predicates hold, transitively.
    fn feature_enabled(&self, qname: &QName, depth: u32) -> Result<bool, ReactorIssue> {
        if depth > MAX_FEATURE_DEPTH {
            return Err(InferenceError::cycle(
                format!("feature '{qname}' references itself"),
                crate::base::SourceRef::new(qname.namespace().as_str(), 0, 0),
            )
            .into());
        }
        if let FeatureSet::Explicit(enabled) = &self.features {
            if !enabled.contains(qname) {
                return Ok(false);
            }
        }
        let Some(module_ctx) = ModuleCtx::map(&self.global_ns).get(qname.module()) else {
            return Ok(true);
        };
        let Some(feature) =
            FeatureNs::map(&self.arena[*module_ctx].namespaces).get(qname.local_name())
        else {
            return Ok(true);
        };
        for gate in self.children_with(*feature, YangKeyword::IfFeature) {
            if let Some(expr) = self.resolved_if_feature(gate)? {
                if !self.predicate_holds(&expr, depth + 1)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    // ========================================================================
    // SCHEMA-TREE REGISTRATION
    // ========================================================================

    /// Stamp every supported schema node with its QName and register it in
    /// its parent's schema-tree namespace. Grouping, augment and deviation
    /// bodies are not schema; their nodes register on expansion/injection.
    pub(crate) fn register_schema_tree(&mut self) {
        for root in self.module_roots() {
            self.register_children(root, root);
        }
    }

    pub(crate) fn register_children(&mut self, parent: StmtId, schema_parent: StmtId) {
        for child in self.arena[parent].children.clone() {
            if !self.arena[child].supported {
                continue;
            }
            let Some(kw) = self.arena[child].keyword.as_core() else {
                continue;
            };
            if !kw.is_schema_node() {
                continue;
            }
            match self.register_schema_node(child, schema_parent) {
                Ok(()) => self.register_children(child, child),
                Err(issue) => self.issues.push(issue),
            }
        }
    }

    fn register_schema_node(
        &mut self,
        ctx: StmtId,
        schema_parent: StmtId,
    ) -> Result<(), ReactorIssue> {
        let qname = self.schema_node_qname(ctx)?;
        self.arena[ctx].qname = Some(qname.clone());
        if let Some(previous) = self.ns_put::<SchemaTreeNs>(schema_parent, qname.clone(), ctx) {
            if previous != ctx {
                // restore the earlier entry before reporting
                self.ns_put::<SchemaTreeNs>(schema_parent, qname.clone(), previous);
                return Err(InferenceError::DuplicateSchemaNode {
                    qname,
                    at: self.arena[ctx].source_ref.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// The QName a schema-node statement contributes: `input`/`output` are
    /// implicitly named, everything else is named by its identifier.
    pub(crate) fn schema_node_qname(&self, ctx: StmtId) -> Result<QName, ReactorIssue> {
        let local: SmolStr = match self.arena[ctx].keyword.as_core() {
            Some(YangKeyword::Input) => "input".into(),
            Some(YangKeyword::Output) => "output".into(),
            _ => self.required_raw(ctx, "node name")?,
        };
        let module = self.node_module(ctx).ok_or_else(|| {
            InferenceError::other(
                format!("schema node '{local}' outside any module"),
                self.arena[ctx].source_ref.clone(),
            )
        })?;
        Ok(QName::new(module, local))
    }

    // ========================================================================
    // AUGMENT
    // ========================================================================

    /// `augment` hook: register the injection action. `uses`-level augments
    /// were applied during expansion.
    pub(crate) fn schedule_augment(&mut self, ctx: StmtId) -> Result<(), ReactorIssue> {
        if let Some(parent) = self.arena[ctx].parent {
            if self.arena[parent].keyword.is(YangKeyword::Uses) {
                return Ok(());
            }
        }
        let at = self.arena[ctx].source_ref.clone();
        let Some(ArgumentValue::SchemaNodeId(raw)) = self.arena[ctx].argument.clone() else {
            return Ok(());
        };
        if !raw.absolute {
            return Err(InferenceError::other(
                format!("module-level augment target '{raw}' must be absolute"),
                at,
            )
            .into());
        }
        let path = self.resolve_target_path(ctx, &raw.nodes)?;
        self.actions.push(InferenceAction::new(
            ModelPhase::EffectiveModel,
            format!("augment of '{raw}'"),
            at,
            vec![Requirement::SchemaPath { path: path.clone() }],
            move |rx| rx.apply_augment(ctx, path),
        ));
        Ok(())
    }

    /// Inject an augment's children into its resolved target. Each injected
    /// child keeps the augmenting module's namespace, so two modules
    /// augmenting the same target with the same local name still collide
    /// only when they share a namespace.
    pub(crate) fn apply_augment(
        &mut self,
        augment: StmtId,
        path: Vec<QName>,
    ) -> Result<(), ReactorIssue> {
        if !self.arena[augment].supported {
            return Ok(());
        }
        let at = self.arena[augment].source_ref.clone();
        let target = self.resolve_schema_path(&path).ok_or_else(|| {
            InferenceError::unresolved(
                "augment target vanished before injection",
                format!("schema path of {} nodes", path.len()),
                at.clone(),
            )
        })?;
        let module = self.node_module(augment).ok_or_else(|| {
            InferenceError::other("augment outside any module", at.clone())
        })?;
        let gates = self.children_with(augment, YangKeyword::IfFeature);
        for child in self.arena[augment].children.clone() {
            if !self.arena[child].supported {
                continue;
            }
            let Some(kw) = self.arena[child].keyword.as_core() else {
                continue;
            };
            if !kw.is_schema_node() {
                continue;
            }
            let copy = self
                .arena
                .deep_copy(child, target, CopyType::AddedByAugmentation);
            self.arena[copy].ns_override = Some(module.clone());
            self.arena[target].children.push(copy);
            // the augment's own gates travel with everything it injects, so
            // re-filtering a finished model reaches the same answer
            for gate in &gates {
                let gate_copy = self.arena.deep_copy(*gate, copy, CopyType::AddedByUses);
                self.arena[copy].children.push(gate_copy);
            }
            self.register_schema_node(copy, target)?;
            self.register_children(copy, copy);
        }
        Ok(())
    }

    // ========================================================================
    // DEVIATION
    // ========================================================================

    /// `deviation` hook: gate on the supported-deviations set, then register
    /// the application action.
    pub(crate) fn schedule_deviation(&mut self, ctx: StmtId) -> Result<(), ReactorIssue> {
        let at = self.arena[ctx].source_ref.clone();
        let Some(ArgumentValue::SchemaNodeId(raw)) = self.arena[ctx].argument.clone() else {
            return Ok(());
        };
        let path = self.resolve_target_path(ctx, &raw.nodes)?;

        if let Some(allowed) = &self.deviations.supported {
            let deviating = self
                .meta
                .get(&self.arena.structural_root(ctx))
                .map(|m| m.name.clone())
                .unwrap_or_default();
            let target_module = path
                .first()
                .and_then(|q| ModuleCtx::map(&self.global_ns).get(q.module()))
                .and_then(|id| self.meta.get(id))
                .map(|m| m.name.clone())
                .unwrap_or_default();
            if let Some(deviators) = allowed.get(&target_module) {
                if !deviators.contains(&deviating) {
                    warn!(
                        deviation = %raw,
                        module = %deviating,
                        "deviation dropped: module not in supported set"
                    );
                    return Ok(());
                }
            }
        }

        self.actions.push(InferenceAction::new(
            ModelPhase::EffectiveModel,
            format!("deviation of '{raw}'"),
            at,
            vec![Requirement::SchemaPath { path: path.clone() }],
            move |rx| rx.apply_deviation(ctx, path),
        ));
        Ok(())
    }

    pub(crate) fn apply_deviation(
        &mut self,
        deviation: StmtId,
        path: Vec<QName>,
    ) -> Result<(), ReactorIssue> {
        if !self.arena[deviation].supported {
            return Ok(());
        }
        let at = self.arena[deviation].source_ref.clone();
        let target = self.resolve_schema_path(&path).ok_or_else(|| {
            InferenceError::unresolved(
                "deviation target vanished before application",
                format!("schema path of {} nodes", path.len()),
                at.clone(),
            )
        })?;
        for deviate in self.children_with(deviation, YangKeyword::Deviate) {
            let Some(ArgumentValue::Deviate(kind)) = self.arena[deviate].argument else {
                continue;
            };
            match kind {
                DeviateKind::NotSupported => {
                    self.arena[target].supported = false;
                    if let (Some(parent), Some(qname)) = (
                        self.arena[target].parent,
                        self.arena[target].qname.clone(),
                    ) {
                        SchemaTreeNs::map_mut(&mut self.arena[parent].namespaces).remove(&qname);
                    }
                }
                DeviateKind::Add => {
                    for child in self.arena[deviate].children.clone() {
                        let Some(kw) = self.arena[child].keyword.as_core() else {
                            continue;
                        };
                        if deviate_singleton(kw) && self.has_child_with(target, kw) {
                            return Err(InferenceError::DeviationTarget {
                                reason: format!(
                                    "cannot add {kw}: target already defines it"
                                ),
                                at: self.arena[child].source_ref.clone(),
                            }
                            .into());
                        }
                        let copy =
                            self.arena
                                .deep_copy(child, target, CopyType::AddedByAugmentation);
                        self.arena[target].children.push(copy);
                    }
                }
                DeviateKind::Replace => {
                    for child in self.arena[deviate].children.clone() {
                        let Some(kw) = self.arena[child].keyword.as_core() else {
                            continue;
                        };
                        // an implicit (absent) substatement replaces cleanly
                        self.remove_child_with(target, kw);
                        let copy =
                            self.arena
                                .deep_copy(child, target, CopyType::AddedByAugmentation);
                        self.arena[target].children.push(copy);
                    }
                }
                DeviateKind::Delete => {
                    for child in self.arena[deviate].children.clone() {
                        let Some(kw) = self.arena[child].keyword.as_core() else {
                            continue;
                        };
                        let wanted = self.arena[child].raw_argument.clone();
                        let existing = self.arena[target].children.iter().copied().find(|c| {
                            self.arena[*c].keyword.is(kw)
                                && self.arena[*c].raw_argument == wanted
                        });
                        match existing {
                            Some(found) => self.arena.detach(found),
                            None if self.deviations.strict => {
                                return Err(InferenceError::DeviationTarget {
                                    reason: format!(
                                        "cannot delete {kw} '{}': not present on target",
                                        wanted.unwrap_or_default()
                                    ),
                                    at: self.arena[child].source_ref.clone(),
                                }
                                .into());
                            }
                            None => {
                                warn!(
                                    keyword = %kw,
                                    "deviate delete of a substatement that is not present"
                                );
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn has_child_with(&self, ctx: StmtId, kw: YangKeyword) -> bool {
        self.arena[ctx]
            .children
            .iter()
            .any(|c| self.arena[*c].keyword.is(kw))
    }
}

/// Deviate substatements that are 0..1 per the cardinality grammar; `must`
/// and `unique` accumulate.
fn deviate_singleton(kw: YangKeyword) -> bool {
    !matches!(kw, YangKeyword::Must | YangKeyword::Unique)
}
