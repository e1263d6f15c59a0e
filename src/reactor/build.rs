//! Effective-statement construction and leafref verification.
//!
//! The last two steps of the `EffectiveModel` phase: render the surviving
//! statement contexts into immutable [`EffectiveStmt`] trees with inferred
//! flags and canonical schema paths, then resolve every leafref path over
//! the finished context and cache the targets.

use std::sync::Arc;

use tracing::debug;

use crate::base::{QName, SourceRef};
use crate::error::{InferenceError, ReactorError, ReactorIssue, StackError};
use crate::model::{
    ArgumentValue, BuiltinType, EffectiveStmt, OrderedBy, Status, StmtFlags, YangKeyword,
};
use crate::reactor::arena::StmtId;
use crate::reactor::reactor::Reactor;
use crate::schema::{EffectiveModelContext, InferenceStack, ModuleEffective};

impl Reactor {
    /// Render every module and assemble the effective model context.
    pub(crate) fn build_effective_model(
        &mut self,
    ) -> Result<EffectiveModelContext, ReactorError> {
        let mut modules = Vec::new();
        let mut roots = Vec::new();
        for root in self.module_roots() {
            let Some(meta) = self.meta.get(&root).cloned() else {
                continue;
            };
            let Some(module) = meta.module else {
                continue;
            };
            let Some(stmt) = self.build_stmt(root, true, Some(&[])) else {
                continue;
            };
            let prefixes = self.arena[root].namespaces.prefixes.clone();
            modules.push(ModuleEffective::new(
                meta.name,
                module,
                meta.prefix,
                prefixes,
                stmt,
            ));
            roots.push(root);
        }
        if !self.issues.is_empty() {
            return Err(ReactorError::new(std::mem::take(&mut self.issues)));
        }
        let ctx = EffectiveModelContext::new(modules);
        debug!(modules = ctx.len(), "effective model assembled");

        self.verify_leafrefs(&ctx, &roots);
        if !self.issues.is_empty() {
            return Err(ReactorError::new(std::mem::take(&mut self.issues)));
        }
        Ok(ctx)
    }

    /// Build one statement bottom-up. `path` is `Some` only along
    /// instantiated schema chains (module body, not grouping/augment/
    /// deviation bodies). Returns `None` for elided statements.
    fn build_stmt(
        &mut self,
        ctx: StmtId,
        inherited_config: bool,
        path: Option<&[QName]>,
    ) -> Option<Arc<EffectiveStmt>> {
        if !self.arena[ctx].supported {
            return None;
        }
        let keyword = self.arena[ctx].keyword.clone();
        let core = keyword.as_core();

        let config = self
            .child_bool(ctx, YangKeyword::Config)
            .unwrap_or(inherited_config);
        let mut flags = StmtFlags::empty();
        if config {
            flags |= StmtFlags::CONFIG;
        }
        if self.child_bool(ctx, YangKeyword::Mandatory) == Some(true) {
            flags |= StmtFlags::MANDATORY;
        }
        if self.child_ordered_by(ctx) == Some(OrderedBy::User) {
            flags |= StmtFlags::USER_ORDERED;
        }
        if !self.children_with(ctx, YangKeyword::Presence).is_empty() {
            flags |= StmtFlags::PRESENCE;
        }
        flags = flags.with_status(self.child_status(ctx).unwrap_or(Status::Current));

        // resolved name: schema nodes got theirs at registration; grouping
        // and augment bodies, and named definitions, compute it here so the
        // inference stack can navigate them
        let qname = match self.arena[ctx].qname.clone() {
            Some(qname) => Some(qname),
            None if core.is_some_and(|kw| kw.is_schema_node()) => {
                self.schema_node_qname(ctx).ok()
            }
            None if core.is_some_and(|kw| kw.is_named_definition()) => {
                self.node_module(ctx).and_then(|module| {
                    self.arena[ctx]
                        .raw_argument
                        .clone()
                        .map(|name| QName::new(module, name))
                })
            }
            None => None,
        };

        let is_instantiated_schema = core.is_some_and(|kw| kw.is_schema_node()) && path.is_some();
        let my_path: Option<Vec<QName>> = match (is_instantiated_schema, &qname) {
            (true, Some(qname)) => {
                let mut nodes = path.map(|p| p.to_vec()).unwrap_or_default();
                nodes.push(qname.clone());
                Some(nodes)
            }
            _ => None,
        };

        let type_def = if matches!(core, Some(YangKeyword::Leaf | YangKeyword::LeafList)) {
            let type_child = self.children_with(ctx, YangKeyword::Type).first().copied();
            match type_child {
                Some(type_ctx) => match self.compile_type(type_ctx, 0) {
                    Ok(ty) => Some(ty),
                    Err(issue) => {
                        self.issues.push(issue);
                        None
                    }
                },
                None => None,
            }
        } else {
            None
        };

        // config false cuts the whole subtree; rpc/action/notification
        // content is config-less by construction
        let child_inherited = config
            && !matches!(
                core,
                Some(YangKeyword::Rpc | YangKeyword::Action | YangKeyword::Notification)
            );
        let child_path: Option<&[QName]> = match core {
            // bodies that are not instantiated schema
            Some(
                YangKeyword::Grouping
                | YangKeyword::Augment
                | YangKeyword::Deviation
                | YangKeyword::Typedef
            ) => None,
            Some(YangKeyword::Module) | Some(YangKeyword::Submodule) => Some(&[]),
            _ => my_path.as_deref(),
        };

        let substatements: Vec<Arc<EffectiveStmt>> = self.arena[ctx]
            .children
            .clone()
            .into_iter()
            .filter_map(|child| self.build_stmt(child, child_inherited, child_path))
            .collect();

        let argument = match &self.arena[ctx].argument {
            Some(value) => Some(value.clone()),
            None => self.arena[ctx]
                .raw_argument
                .clone()
                .map(ArgumentValue::Str),
        };

        Some(Arc::new(EffectiveStmt::new(
            keyword,
            argument,
            qname,
            flags,
            my_path.map(crate::base::SchemaNodeId::new),
            type_def,
            substatements,
        )))
    }

    fn child_bool(&self, ctx: StmtId, kw: YangKeyword) -> Option<bool> {
        self.children_with(ctx, kw)
            .first()
            .and_then(|c| match &self.arena[*c].argument {
                Some(ArgumentValue::Boolean(b)) => Some(*b),
                _ => self.arena[*c]
                    .raw_argument
                    .as_deref()
                    .and_then(|raw| raw.parse().ok()),
            })
    }

    fn child_status(&self, ctx: StmtId) -> Option<Status> {
        self.children_with(ctx, YangKeyword::Status)
            .first()
            .and_then(|c| match &self.arena[*c].argument {
                Some(ArgumentValue::Status(status)) => Some(*status),
                _ => None,
            })
    }

    fn child_ordered_by(&self, ctx: StmtId) -> Option<OrderedBy> {
        self.children_with(ctx, YangKeyword::OrderedBy)
            .first()
            .and_then(|c| match &self.arena[*c].argument {
                Some(ArgumentValue::OrderedBy(o)) => Some(*o),
                _ => None,
            })
    }

    // ========================================================================
    // LEAFREF VERIFICATION
    // ========================================================================

    /// Resolve every leafref path in the finished model; cache the final
    /// non-leafref target type on the leaf's type definition.
    fn verify_leafrefs(&mut self, ctx: &EffectiveModelContext, roots: &[StmtId]) {
        for root in roots {
            let at = self.arena[*root].source_ref.clone();
            let Some(meta) = self.meta.get(root) else {
                continue;
            };
            let Some(module) = meta.module.clone() else {
                continue;
            };
            let Some(module_eff) = ctx.module(&module) else {
                continue;
            };
            let stmt = Arc::clone(module_eff.stmt());
            let mut path = Vec::new();
            self.walk_leafrefs(ctx, &stmt, &mut path, &at);
        }
    }

    fn walk_leafrefs(
        &mut self,
        ctx: &EffectiveModelContext,
        stmt: &Arc<EffectiveStmt>,
        path: &mut Vec<QName>,
        at: &SourceRef,
    ) {
        for sub in stmt.substatements() {
            if sub.is_data_node() {
                let Some(qname) = sub.qname().cloned() else {
                    continue;
                };
                path.push(qname);
                if let Some(ty) = sub.type_def() {
                    if ty.base == BuiltinType::Leafref {
                        if let Err(issue) = self.resolve_one_leafref(ctx, path, ty, at) {
                            self.issues.push(issue);
                        }
                    }
                }
                self.walk_leafrefs(ctx, sub, path, at);
                path.pop();
            } else if matches!(
                sub.keyword().as_core(),
                Some(YangKeyword::Choice | YangKeyword::Case)
            ) {
                self.walk_leafrefs(ctx, sub, path, at);
            }
        }
    }

    fn resolve_one_leafref(
        &mut self,
        ctx: &EffectiveModelContext,
        path: &[QName],
        ty: &Arc<crate::model::TypeDefinition>,
        at: &SourceRef,
    ) -> Result<(), ReactorIssue> {
        let mut stack = InferenceStack::new(ctx);
        let describe = |q: &[QName]| {
            q.iter()
                .map(|n| n.local_name().to_string())
                .collect::<Vec<_>>()
                .join("/")
        };
        let convert = |err: StackError, at: &SourceRef| match err {
            StackError::LeafrefCycle {
                type_name,
                cycle_head,
            } => InferenceError::cycle(
                format!("leafref type '{type_name}' loops through {cycle_head}"),
                at.clone(),
            ),
            other => InferenceError::other(
                format!("leafref at /{}: {other}", describe(path)),
                at.clone(),
            ),
        };
        for qname in path {
            stack
                .enter_data_tree(qname)
                .map_err(|e| convert(e, at))?;
        }
        match stack.resolve_leafref_chain(ty) {
            Ok(resolved) => {
                let _ = ty.resolved_leafref.set(resolved);
                Ok(())
            }
            // deref of an instance-identifier has no static resolution;
            // recoverable, so it does not fail the compile
            Err(StackError::UnsupportedDerefTarget { qname }) => {
                debug!(leaf = %qname, "skipping deref of instance-identifier");
                Ok(())
            }
            Err(err) => Err(convert(err, at).into()),
        }
    }
}
