//! The schema-inference stack: a mutable cursor over an effective model.
//!
//! Supports schema-tree, data-tree, choice and grouping steps, conversion to
//! a canonical schema node identifier, and resolution of `path` expressions
//! including `deref`. Data-tree steps elide `choice`/`case` levels and mark
//! the stack dirty; asking a dirty stack for a schema node identifier
//! triggers a reconstruction that re-resolves every entry and re-inserts the
//! elided levels.

use std::sync::Arc;

use crate::base::{QName, QNameModule, SchemaNodeId};
use crate::error::StackError;
use crate::model::{
    BuiltinType, EffectiveStmt, NodeId, PathExpression, Step, TypeDefinition, YangKeyword,
};
use crate::schema::context::EffectiveModelContext;

/// Bound on leafref chains followed during resolution.
const MAX_LEAFREF_DEPTH: usize = 32;

/// An immutable snapshot of a stack position. Freely sharable; building a
/// working stack from it copies the path.
#[derive(Debug, Clone)]
pub struct Inference {
    path: Vec<Arc<EffectiveStmt>>,
    module: Option<QNameModule>,
    grouping_depth: u32,
    clean: bool,
}

/// A mutable cursor into an effective model. Single-threaded.
#[derive(Debug, Clone)]
pub struct InferenceStack<'a> {
    ctx: &'a EffectiveModelContext,
    stack: Vec<Arc<EffectiveStmt>>,
    current_module: Option<QNameModule>,
    grouping_depth: u32,
    /// True while every step so far was a schema-tree or grouping step, so
    /// the stack converts to a schema node identifier by simple projection.
    clean: bool,
}

impl<'a> InferenceStack<'a> {
    pub fn new(ctx: &'a EffectiveModelContext) -> Self {
        Self {
            ctx,
            stack: Vec::new(),
            current_module: None,
            grouping_depth: 0,
            clean: true,
        }
    }

    /// Rebuild a working stack from a shared snapshot.
    pub fn from_inference(ctx: &'a EffectiveModelContext, inference: &Inference) -> Self {
        Self {
            ctx,
            stack: inference.path.clone(),
            current_module: inference.module.clone(),
            grouping_depth: inference.grouping_depth,
            clean: inference.clean,
        }
    }

    /// Snapshot the current position.
    pub fn to_inference(&self) -> Inference {
        Inference {
            path: self.stack.clone(),
            module: self.current_module.clone(),
            grouping_depth: self.grouping_depth,
            clean: self.clean,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Statement at the top of the stack.
    pub fn current(&self) -> Option<&Arc<EffectiveStmt>> {
        self.stack.last()
    }

    /// False after any grouping step: the position no longer corresponds to
    /// an instantiated schema location.
    pub fn in_instantiated_context(&self) -> bool {
        self.grouping_depth == 0
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        self.current_module = None;
        self.grouping_depth = 0;
        self.clean = true;
    }

    fn parent_description(&self) -> String {
        match self.current() {
            Some(top) => top
                .qname()
                .map(|q| q.to_string())
                .unwrap_or_else(|| top.keyword().to_string()),
            None => match &self.current_module {
                Some(module) => module.to_string(),
                None => "model root".to_string(),
            },
        }
    }

    fn module_root(&self, module: &QNameModule) -> Result<Arc<EffectiveStmt>, StackError> {
        self.ctx
            .module(module)
            .map(|m| Arc::clone(m.stmt()))
            .ok_or_else(|| StackError::PathResolution(format!("unknown module {module}")))
    }

    /// Resolve the anchor of a step from an empty or non-empty stack.
    fn step_base(&mut self, qname: &QName) -> Result<Arc<EffectiveStmt>, StackError> {
        match self.current() {
            Some(top) => Ok(Arc::clone(top)),
            None => {
                let root = self.module_root(qname.module())?;
                self.current_module = Some(qname.module().clone());
                Ok(root)
            }
        }
    }

    // ========================================================================
    // STEP OPERATIONS
    // ========================================================================

    /// Push the schema-tree child `qname`.
    pub fn enter_schema_tree(&mut self, qname: &QName) -> Result<Arc<EffectiveStmt>, StackError> {
        let base = self.step_base(qname)?;
        let child = base.schema_child(qname).cloned().ok_or_else(|| {
            StackError::NotFound {
                qname: qname.clone(),
                parent: self.parent_description(),
            }
        })?;
        self.stack.push(Arc::clone(&child));
        Ok(child)
    }

    /// Push the data-tree child `qname`, eliding any intermediate
    /// `choice`/`case` levels. Marks the stack dirty.
    pub fn enter_data_tree(&mut self, qname: &QName) -> Result<Arc<EffectiveStmt>, StackError> {
        let base = self.step_base(qname)?;
        let child = base.data_child(qname).cloned().ok_or_else(|| {
            StackError::NotFound {
                qname: qname.clone(),
                parent: self.parent_description(),
            }
        })?;
        self.clean = false;
        self.stack.push(Arc::clone(&child));
        Ok(child)
    }

    /// Step to a choice: from a choice, traverses intermediate cases to a
    /// nested choice; otherwise a schema-tree step that must land on a
    /// choice.
    pub fn enter_choice(&mut self, qname: &QName) -> Result<Arc<EffectiveStmt>, StackError> {
        let top = self.current().cloned();
        if let Some(top) = top {
            if top.is(YangKeyword::Choice) {
                // direct (shorthand) nested choice
                if let Some(direct) = top.schema_child(qname).cloned() {
                    if direct.is(YangKeyword::Choice) {
                        self.stack.push(Arc::clone(&direct));
                        return Ok(direct);
                    }
                }
                let found = top
                    .find_all(YangKeyword::Case)
                    .filter_map(|case| {
                        case.schema_child(qname)
                            .filter(|c| c.is(YangKeyword::Choice))
                            .map(|child| (Arc::clone(case), Arc::clone(child)))
                    })
                    .next();
                if let Some((case, child)) = found {
                    self.stack.push(case);
                    self.stack.push(Arc::clone(&child));
                    return Ok(child);
                }
                return Err(StackError::NotFound {
                    qname: qname.clone(),
                    parent: self.parent_description(),
                });
            }
        }
        let child = self.enter_schema_tree(qname)?;
        if !child.is(YangKeyword::Choice) {
            self.stack.pop();
            return Err(StackError::IllegalState(format!(
                "schema node {qname} is not a choice"
            )));
        }
        Ok(child)
    }

    /// Push a grouping child. Conversion to a schema node identifier is
    /// forbidden until the matching exits.
    pub fn enter_grouping(&mut self, qname: &QName) -> Result<Arc<EffectiveStmt>, StackError> {
        let base = self.step_base(qname)?;
        let child = base.grouping(qname).cloned().ok_or_else(|| {
            StackError::NotFound {
                qname: qname.clone(),
                parent: self.parent_description(),
            }
        })?;
        self.grouping_depth += 1;
        self.stack.push(Arc::clone(&child));
        Ok(child)
    }

    /// Pop one statement.
    pub fn exit(&mut self) -> Result<Arc<EffectiveStmt>, StackError> {
        let popped = self
            .stack
            .pop()
            .ok_or_else(|| StackError::IllegalState("exit of an empty stack".to_string()))?;
        if popped.is(YangKeyword::Grouping) {
            self.grouping_depth = self.grouping_depth.saturating_sub(1);
        }
        if self.stack.is_empty() {
            self.current_module = None;
            if self.grouping_depth == 0 {
                self.clean = true;
            }
        }
        Ok(popped)
    }

    /// Pop one statement, asserting both the popped statement and the new
    /// top are data-tree statements, so re-entering the popped QName finds
    /// the same node.
    pub fn exit_to_data_tree(&mut self) -> Result<Arc<EffectiveStmt>, StackError> {
        let popped = self
            .stack
            .pop()
            .ok_or_else(|| StackError::IllegalState("exit of an empty stack".to_string()))?;
        if !popped.is_data_node() {
            self.stack.push(popped);
            return Err(StackError::IllegalState(
                "exit_to_data_tree of a non-data statement".to_string(),
            ));
        }
        match self.current() {
            None => {
                self.current_module = None;
            }
            Some(top) if top.is_data_node() => {}
            Some(top) => {
                let detail = format!(
                    "exit_to_data_tree onto non-data parent {}",
                    top.keyword()
                );
                self.stack.push(popped);
                return Err(StackError::IllegalState(detail));
            }
        }
        Ok(popped)
    }

    // ========================================================================
    // SCHEMA NODE IDENTIFIERS
    // ========================================================================

    /// The canonical identifier of the current position.
    ///
    /// A dirty stack (one that took data-tree steps) is first reconstructed:
    /// every entry is re-resolved against its schema parent and elided
    /// `choice`/`case` levels are re-inserted. If reconstruction does not
    /// change the depth, the stack was clean all along and is remembered as
    /// such.
    pub fn to_schema_node_identifier(&mut self) -> Result<SchemaNodeId, StackError> {
        if !self.in_instantiated_context() {
            return Err(StackError::IllegalState(
                "schema node identifier requested inside a grouping".to_string(),
            ));
        }
        if self.stack.is_empty() {
            return Err(StackError::IllegalState(
                "schema node identifier of an empty stack".to_string(),
            ));
        }
        if self.clean {
            return Ok(self.project_identifier(&self.stack));
        }
        let rebuilt = self.reconstruct()?;
        if rebuilt.len() == self.stack.len() {
            self.clean = true;
        }
        let id = self.project_identifier(&rebuilt);
        Ok(id)
    }

    fn project_identifier(&self, path: &[Arc<EffectiveStmt>]) -> SchemaNodeId {
        let nodes: Vec<QName> = path.iter().filter_map(|s| s.qname().cloned()).collect();
        SchemaNodeId::new(nodes)
    }

    fn reconstruct(&self) -> Result<Vec<Arc<EffectiveStmt>>, StackError> {
        let first = self.stack.first().and_then(|s| s.qname()).ok_or_else(|| {
            StackError::IllegalState("stack entry without a name".to_string())
        })?;
        let mut parent = self.module_root(first.module())?;
        let mut rebuilt: Vec<Arc<EffectiveStmt>> = Vec::with_capacity(self.stack.len());
        for entry in &self.stack {
            let qname = entry.qname().ok_or_else(|| {
                StackError::IllegalState("stack entry without a name".to_string())
            })?;
            if let Some(direct) = parent.schema_child(qname) {
                rebuilt.push(Arc::clone(direct));
            } else if let Some(chain) = parent.data_child_path(qname) {
                rebuilt.extend(chain);
            } else {
                return Err(StackError::NotFound {
                    qname: qname.clone(),
                    parent: self
                        .ctx
                        .module(first.module())
                        .map(|m| m.name().to_string())
                        .unwrap_or_default(),
                });
            }
            parent = Arc::clone(rebuilt.last().unwrap_or(&parent));
        }
        Ok(rebuilt)
    }

    // ========================================================================
    // PATH EXPRESSIONS
    // ========================================================================

    /// Bind a step's node test to a QName: prefixes resolve in `origin`'s
    /// prefix map, unprefixed names bind to `origin` itself.
    fn bind_step(&self, node: &NodeId, origin: &QNameModule) -> Result<QName, StackError> {
        match &node.prefix {
            Some(prefix) => {
                let module = self
                    .ctx
                    .module(origin)
                    .and_then(|m| m.resolve_prefix(prefix))
                    .ok_or_else(|| {
                        StackError::PathResolution(format!(
                            "prefix '{prefix}' is not known in module {origin}"
                        ))
                    })?;
                Ok(QName::new(module.clone(), node.name.clone()))
            }
            None => Ok(QName::new(origin.clone(), node.name.clone())),
        }
    }

    fn walk_steps(&mut self, steps: &[Step], origin: &QNameModule) -> Result<(), StackError> {
        for step in steps {
            match step {
                Step::Parent => {
                    self.exit_to_data_tree()?;
                }
                Step::Child(node) => {
                    let qname = self.bind_step(node, origin)?;
                    self.enter_data_tree(&qname)?;
                }
            }
        }
        Ok(())
    }

    /// Resolve a path expression from the current position; the stack ends
    /// at the resolution result.
    pub fn resolve_path(
        &mut self,
        expr: &PathExpression,
        origin: &QNameModule,
    ) -> Result<Arc<EffectiveStmt>, StackError> {
        match expr {
            PathExpression::Absolute(steps) => {
                self.clear();
                self.walk_steps(steps, origin)?;
            }
            PathExpression::Relative(steps) => {
                self.walk_steps(steps, origin)?;
            }
            PathExpression::Deref { deref, rest } => {
                self.walk_steps(deref, origin)?;
                let target = self.current().cloned().ok_or_else(|| {
                    StackError::PathResolution("deref resolved to the model root".to_string())
                })?;
                let ty = target.type_def().cloned().ok_or_else(|| {
                    StackError::PathResolution(format!(
                        "deref target {} is not a typed node",
                        self.parent_description()
                    ))
                })?;
                match ty.base {
                    BuiltinType::Leafref => {}
                    BuiltinType::InstanceIdentifier => {
                        return Err(StackError::UnsupportedDerefTarget {
                            qname: target
                                .qname()
                                .cloned()
                                .unwrap_or_else(|| QName::new(origin.clone(), "deref")),
                        });
                    }
                    other => {
                        return Err(StackError::PathResolution(format!(
                            "deref target has type '{other}', expected a leafref"
                        )));
                    }
                }
                let path = ty.path.clone().ok_or_else(|| {
                    StackError::PathResolution("leafref type without a path".to_string())
                })?;
                let inner_origin = ty.path_module.clone().unwrap_or_else(|| origin.clone());
                self.resolve_path(&path, &inner_origin)?;
                self.walk_steps(rest, origin)?;
            }
        }
        self.current().cloned().ok_or_else(|| {
            StackError::PathResolution("path resolved to the model root".to_string())
        })
    }

    /// Follow a leafref's path, then any leafref chain at the target, to the
    /// final non-leafref type. The stack ends at the final target.
    pub fn resolve_leafref_chain(
        &mut self,
        ty: &Arc<TypeDefinition>,
    ) -> Result<Arc<TypeDefinition>, StackError> {
        let original = ty.name.clone();
        let mut current = Arc::clone(ty);
        let mut visited: Vec<QName> = Vec::new();
        for _ in 0..MAX_LEAFREF_DEPTH {
            let path = current.path.clone().ok_or_else(|| {
                StackError::PathResolution(format!(
                    "leafref type '{}' has no path",
                    current.name
                ))
            })?;
            let origin = current
                .path_module
                .clone()
                .or_else(|| self.current_module.clone())
                .ok_or_else(|| {
                    StackError::PathResolution("leafref path outside any module".to_string())
                })?;
            let target = self.resolve_path(&path, &origin)?;
            if !matches!(
                target.keyword().as_core(),
                Some(YangKeyword::Leaf | YangKeyword::LeafList)
            ) {
                return Err(StackError::PathResolution(format!(
                    "leafref '{original}' resolves to {}, expected a leaf or leaf-list",
                    target.keyword()
                )));
            }
            let target_type = target.type_def().cloned().ok_or_else(|| {
                StackError::PathResolution(format!(
                    "leafref '{original}' target has no compiled type"
                ))
            })?;
            if target_type.base != BuiltinType::Leafref {
                return Ok(target_type);
            }
            if let Some(qname) = target.qname() {
                if visited.contains(qname) {
                    return Err(StackError::LeafrefCycle {
                        type_name: original.to_string(),
                        cycle_head: qname.clone(),
                    });
                }
                visited.push(qname.clone());
            }
            current = target_type;
        }
        Err(StackError::PathResolution(format!(
            "leafref '{original}' chain exceeds {MAX_LEAFREF_DEPTH} links"
        )))
    }
}
