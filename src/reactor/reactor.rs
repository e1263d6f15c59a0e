//! The statement-compilation reactor.
//!
//! A phased inference engine driving declared statements to the effective
//! model. Each phase walks every statement and runs its support's hook for
//! that phase; hooks either make progress directly or register inference
//! actions whose prerequisites name the namespace entries they wait for.
//! A fixed-point loop then fires actions as their prerequisites appear;
//! actions still stuck at end of phase abort the run with one aggregated
//! error.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::base::{Interner, QName, QNameModule, Revision, XmlNamespace};
use crate::error::{InferenceError, ReactorError, ReactorIssue, SourceError};
use crate::model::{
    ArgumentValue, DeclaredStatement, IfFeatureExpr, NodeId, StatementKeyword, YangKeyword,
};
use crate::reactor::action::{InferenceAction, Requirement};
use crate::reactor::arena::{Arena, StmtId};
use crate::reactor::namespace::{
    ExtensionNs, FeatureNs, ModuleCtx, ModuleForName, ModuleForRevision, Namespace,
    NamespaceBehaviour, NamespaceStore, SchemaTreeNs, SubmoduleForName,
};
use crate::reactor::phase::ModelPhase;
use crate::reactor::support::{ArgKind, Registry, SubstatementValidator};
use crate::reactor::{DeviationPolicy, FeatureSet};
use crate::schema::EffectiveModelContext;

/// Per-source metadata resolved during `SourceLinkage`.
#[derive(Debug, Clone)]
pub struct SourceMeta {
    pub name: SmolStr,
    pub prefix: SmolStr,
    /// The source's module identifier. Submodules receive their parent
    /// module's identifier when included.
    pub module: Option<QNameModule>,
    pub is_submodule: bool,
    pub belongs_to: Option<SmolStr>,
}

/// The reactor. Single-threaded; owns every statement context exclusively
/// until [`Reactor::run`] hands back the immutable effective model.
pub struct Reactor {
    pub(crate) arena: Arena,
    pub(crate) registry: Arc<Registry>,
    pub(crate) interner: Interner,
    pub(crate) global_ns: NamespaceStore,
    pub(crate) actions: Vec<InferenceAction>,
    pub(crate) issues: Vec<ReactorIssue>,
    pub(crate) features: FeatureSet,
    pub(crate) deviations: DeviationPolicy,
    pub(crate) source_roots: Vec<StmtId>,
    pub(crate) meta: FxHashMap<StmtId, SourceMeta>,
    /// (module root, submodule root) pairs awaiting inlining.
    pub(crate) pending_includes: Vec<(StmtId, StmtId)>,
    /// Grouping contexts whose internal `uses` are fully expanded.
    pub(crate) expanded_groupings: FxHashSet<StmtId>,
    /// Groupings already instantiated by some `uses`; the first expansion
    /// is tagged `CopyType::Original`, every later one `AddedByUses`.
    pub(crate) used_groupings: FxHashSet<StmtId>,
    /// Groupings currently being expanded, for cycle detection.
    pub(crate) expansion_stack: Vec<StmtId>,
}

impl Reactor {
    pub fn new(registry: Arc<Registry>, features: FeatureSet, deviations: DeviationPolicy) -> Self {
        Self {
            arena: Arena::new(),
            registry,
            interner: Interner::new(),
            global_ns: NamespaceStore::default(),
            actions: Vec::new(),
            issues: Vec::new(),
            features,
            deviations,
            source_roots: Vec::new(),
            meta: FxHashMap::default(),
            pending_includes: Vec::new(),
            expanded_groupings: FxHashSet::default(),
            used_groupings: FxHashSet::default(),
            expansion_stack: Vec::new(),
        }
    }

    /// Add one parsed source.
    pub fn add_source(&mut self, declared: &DeclaredStatement) {
        let root = self.arena.load(declared);
        self.source_roots.push(root);
    }

    /// Drive every source through all phases and emit the effective model.
    pub fn run(mut self) -> Result<EffectiveModelContext, ReactorError> {
        debug!(sources = self.source_roots.len(), "starting reactor");
        self.run_phase(ModelPhase::SourceLinkage)?;
        self.finish_linkage()?;
        self.run_phase(ModelPhase::StatementDefinition)?;
        self.run_phase(ModelPhase::FullDeclaration)?;
        self.run_phase(ModelPhase::EffectiveModel)?;
        self.build_effective_model()
    }

    fn run_phase(&mut self, phase: ModelPhase) -> Result<(), ReactorError> {
        debug!(%phase, "entering phase");
        self.run_phase_hooks(phase);
        self.run_fixed_point(phase);
        self.end_phase(phase)
    }

    fn run_phase_hooks(&mut self, phase: ModelPhase) {
        let roots = self.source_roots.clone();
        for root in roots {
            for id in self.arena.walk(root) {
                if !self.arena[id].supported {
                    continue;
                }
                let Some(kw) = self.arena[id].keyword.as_core() else {
                    continue;
                };
                let Some(support) = self.registry.get(kw) else {
                    continue;
                };
                let result = match phase {
                    ModelPhase::Init => Ok(()),
                    ModelPhase::SourceLinkage => support.on_linkage(self, id),
                    ModelPhase::StatementDefinition => support.on_statement_definition(self, id),
                    ModelPhase::FullDeclaration => support.on_full_declaration(self, id),
                    ModelPhase::EffectiveModel => support.on_effective_model(self, id),
                };
                if let Err(issue) = result {
                    self.issues.push(issue);
                }
            }
        }
        // unknown (extension) statements resolve after the whole walk, so a
        // use may precede its extension definition in source order
        if phase == ModelPhase::StatementDefinition {
            self.resolve_unknown_statements();
        }
        // the effective-model phase has whole-model passes beyond per-
        // statement hooks; they run between the hook walk and the fixed
        // point so augment/deviation actions see a registered schema tree
        if phase == ModelPhase::EffectiveModel {
            self.expand_all_uses();
            self.evaluate_if_features();
            self.register_schema_tree();
        }
    }

    fn resolve_unknown_statements(&mut self) {
        let roots = self.source_roots.clone();
        for root in roots {
            for id in self.arena.walk(root) {
                if matches!(self.arena[id].keyword, StatementKeyword::Unknown(_)) {
                    if let Err(issue) = self.resolve_unknown(id) {
                        self.issues.push(issue);
                    }
                }
            }
        }
    }

    fn run_fixed_point(&mut self, phase: ModelPhase) {
        loop {
            let pending = std::mem::take(&mut self.actions);
            let mut kept = Vec::new();
            let mut fired = 0usize;
            for action in pending {
                if action.phase != phase {
                    kept.push(action);
                    continue;
                }
                if action.requires.iter().all(|r| self.requirement_met(r)) {
                    trace!(action = %action.description, "firing inference action");
                    fired += 1;
                    if let Err(issue) = (action.apply)(self) {
                        self.issues.push(issue);
                    }
                } else {
                    kept.push(action);
                }
            }
            // actions registered while firing
            kept.append(&mut self.actions);
            self.actions = kept;
            if fired == 0 {
                break;
            }
        }
    }

    fn end_phase(&mut self, phase: ModelPhase) -> Result<(), ReactorError> {
        let remaining = std::mem::take(&mut self.actions);
        let (stuck, kept): (Vec<_>, Vec<_>) =
            remaining.into_iter().partition(|a| a.phase == phase);
        self.actions = kept;
        for action in stuck {
            let missing: Vec<String> = action
                .requires
                .iter()
                .filter(|r| !self.requirement_met(r))
                .map(|r| r.to_string())
                .collect();
            self.issues.push(
                InferenceError::unresolved(action.description, missing.join(", "), action.at)
                    .into(),
            );
        }
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ReactorError::new(std::mem::take(&mut self.issues)))
        }
    }

    // ========================================================================
    // NAMESPACE ACCESS
    // ========================================================================

    fn scope_of<N: Namespace>(&self, ctx: StmtId) -> Option<StmtId> {
        match N::behaviour() {
            NamespaceBehaviour::Global => None,
            NamespaceBehaviour::RootStatementLocal => Some(self.arena[ctx].definition_root),
            NamespaceBehaviour::ModuleLocal => Some(self.arena.structural_root(ctx)),
            NamespaceBehaviour::StatementLocal => Some(ctx),
        }
    }

    /// Look up `key` in namespace `N`, resolving the scope from `ctx` via the
    /// namespace's behaviour.
    pub fn ns_get<N: Namespace>(&self, ctx: StmtId, key: &N::Key) -> Option<N::Value> {
        let store = match self.scope_of::<N>(ctx) {
            None => &self.global_ns,
            Some(scope) => &self.arena[scope].namespaces,
        };
        N::map(store).get(key).cloned()
    }

    /// Write `key → value`, resolving the scope the same way. Returns any
    /// previous value.
    pub fn ns_put<N: Namespace>(
        &mut self,
        ctx: StmtId,
        key: N::Key,
        value: N::Value,
    ) -> Option<N::Value> {
        let store = match self.scope_of::<N>(ctx) {
            None => &mut self.global_ns,
            Some(scope) => &mut self.arena[scope].namespaces,
        };
        N::map_mut(store).insert(key, value)
    }

    /// Statement-local lookup that walks lexically outward: the context
    /// itself, its ancestors, then the root of the source the statement was
    /// written in (so `uses` copies keep seeing the groupings and typedefs
    /// of their defining module).
    pub fn ns_get_lexical<N: Namespace>(&self, ctx: StmtId, key: &N::Key) -> Option<N::Value> {
        for id in self.arena.ancestors(ctx) {
            if let Some(value) = N::map(&self.arena[id].namespaces).get(key) {
                return Some(value.clone());
            }
        }
        let def_root = self.arena[ctx].definition_root;
        N::map(&self.arena[def_root].namespaces).get(key).cloned()
    }

    pub(crate) fn requirement_met(&self, requirement: &Requirement) -> bool {
        match requirement {
            Requirement::ModuleNamed { name } => {
                ModuleForName::map(&self.global_ns).contains_key(name)
            }
            Requirement::ModuleRevision { name, revision } => ModuleForRevision::map(
                &self.global_ns,
            )
            .contains_key(&(name.clone(), *revision)),
            Requirement::SubmoduleNamed { name } => {
                SubmoduleForName::map(&self.global_ns).contains_key(name)
            }
            Requirement::SchemaPath { path } => self.resolve_schema_path(path).is_some(),
        }
    }

    /// Walk the schema-tree namespaces from the owning module context down
    /// the QName list.
    pub(crate) fn resolve_schema_path(&self, path: &[QName]) -> Option<StmtId> {
        let first = path.first()?;
        let mut current = *ModuleCtx::map(&self.global_ns).get(first.module())?;
        for qname in path {
            current = *SchemaTreeNs::map(&self.arena[current].namespaces).get(qname)?;
            if !self.arena[current].supported {
                return None;
            }
        }
        Some(current)
    }

    // ========================================================================
    // LINKAGE
    // ========================================================================

    /// `module` hook: compute the module identifier, register it globally,
    /// and bind the module's own prefix.
    pub(crate) fn link_module(&mut self, ctx: StmtId) -> Result<(), ReactorIssue> {
        if self.arena[ctx].parent.is_some() {
            return Err(SourceError::syntax(
                "'module' is only valid at the top level",
                self.arena[ctx].source_ref.clone(),
            )
            .into());
        }
        let at = self.arena[ctx].source_ref.clone();
        let name: SmolStr = self.required_raw(ctx, "module name")?;
        let namespace = self
            .child_raw(ctx, YangKeyword::Namespace)
            .ok_or_else(|| SourceError::cardinality("Minimal count of NAMESPACE for MODULE is 1, detected 0", at.clone()))?;
        let prefix = self
            .child_raw(ctx, YangKeyword::Prefix)
            .ok_or_else(|| SourceError::cardinality("Minimal count of PREFIX for MODULE is 1, detected 0", at.clone()))?;
        let revision = self.latest_revision(ctx);
        // namespace URIs repeat across every QName of a module; intern once
        let uri = self.interner.intern(namespace.as_str());
        let module = QNameModule::new(XmlNamespace::new(uri), revision);

        self.meta.insert(
            ctx,
            SourceMeta {
                name: name.clone(),
                prefix: prefix.clone(),
                module: Some(module.clone()),
                is_submodule: false,
                belongs_to: None,
            },
        );
        self.ns_put::<ModuleForName>(ctx, name.clone(), ctx);
        if let Some(rev) = revision {
            self.ns_put::<ModuleForRevision>(ctx, (name.clone(), rev), ctx);
        }
        self.ns_put::<ModuleCtx>(ctx, module.clone(), ctx);
        self.ns_put::<crate::reactor::namespace::PrefixToModule>(ctx, prefix, module);
        debug!(module = %name, "linked module");
        Ok(())
    }

    /// `submodule` hook: register by name; prefix binding waits for the
    /// parent module.
    pub(crate) fn link_submodule(&mut self, ctx: StmtId) -> Result<(), ReactorIssue> {
        let at = self.arena[ctx].source_ref.clone();
        let name: SmolStr = self.required_raw(ctx, "submodule name")?;
        let belongs = self.arena[ctx]
            .children
            .iter()
            .find(|c| self.arena[**c].keyword.is(YangKeyword::BelongsTo))
            .copied()
            .ok_or_else(|| {
                SourceError::cardinality(
                    "Minimal count of BELONGS_TO for SUBMODULE is 1, detected 0",
                    at.clone(),
                )
            })?;
        let parent_name: SmolStr = self.required_raw(belongs, "belongs-to module")?;
        let prefix = self
            .child_raw(belongs, YangKeyword::Prefix)
            .ok_or_else(|| SourceError::cardinality("Minimal count of PREFIX for BELONGS_TO is 1, detected 0", at.clone()))?;

        self.meta.insert(
            ctx,
            SourceMeta {
                name: name.clone(),
                prefix: prefix.clone(),
                module: None,
                is_submodule: true,
                belongs_to: Some(parent_name.clone()),
            },
        );
        self.ns_put::<SubmoduleForName>(ctx, name.clone(), ctx);

        // bind the belongs-to prefix once the parent module links
        let description = format!("submodule '{name}' belongs-to '{parent_name}'");
        self.actions.push(InferenceAction::new(
            ModelPhase::SourceLinkage,
            description,
            at,
            vec![Requirement::ModuleNamed {
                name: parent_name.clone(),
            }],
            move |rx| {
                let module_ctx = rx
                    .ns_get::<ModuleForName>(ctx, &parent_name)
                    .and_then(|id| rx.meta.get(&id).cloned());
                if let Some(parent_meta) = module_ctx {
                    if let Some(module) = parent_meta.module.clone() {
                        rx.ns_put::<crate::reactor::namespace::PrefixToModule>(
                            ctx,
                            prefix.clone(),
                            module.clone(),
                        );
                        if let Some(meta) = rx.meta.get_mut(&ctx) {
                            meta.module = Some(module);
                        }
                    }
                }
                Ok(())
            },
        ));
        Ok(())
    }

    /// `import` hook: bind the chosen prefix once the imported module links.
    pub(crate) fn schedule_import(&mut self, ctx: StmtId) -> Result<(), ReactorIssue> {
        let at = self.arena[ctx].source_ref.clone();
        let name: SmolStr = self.required_raw(ctx, "imported module name")?;
        let prefix = self.child_raw(ctx, YangKeyword::Prefix).ok_or_else(|| {
            SourceError::cardinality("Minimal count of PREFIX for IMPORT is 1, detected 0", at.clone())
        })?;
        let revision: Option<Revision> = self
            .arena[ctx]
            .children
            .iter()
            .find(|c| self.arena[**c].keyword.is(YangKeyword::RevisionDate))
            .and_then(|c| self.arena[*c].raw_argument.as_deref())
            .and_then(|raw| raw.parse().ok());

        let requirement = match revision {
            Some(revision) => Requirement::ModuleRevision {
                name: name.clone(),
                revision,
            },
            None => Requirement::ModuleNamed { name: name.clone() },
        };
        let description = format!("import of module '{name}'");
        self.actions.push(InferenceAction::new(
            ModelPhase::SourceLinkage,
            description,
            at.clone(),
            vec![requirement],
            move |rx| {
                let target = match revision {
                    Some(rev) => rx.ns_get::<ModuleForRevision>(ctx, &(name.clone(), rev)),
                    None => rx.ns_get::<ModuleForName>(ctx, &name),
                };
                let Some(target) = target else {
                    return Err(InferenceError::unresolved(
                        format!("import of module '{name}'"),
                        format!("module '{name}'"),
                        at,
                    )
                    .into());
                };
                let module = rx
                    .meta
                    .get(&target)
                    .and_then(|m| m.module.clone())
                    .ok_or_else(|| {
                        InferenceError::other(format!("module '{name}' has no namespace"), at.clone())
                    })?;
                rx.ns_put::<crate::reactor::namespace::PrefixToModule>(ctx, prefix.clone(), module);
                Ok(())
            },
        ));
        Ok(())
    }

    /// `include` hook: inline the submodule's body once it links.
    pub(crate) fn schedule_include(&mut self, ctx: StmtId) -> Result<(), ReactorIssue> {
        let at = self.arena[ctx].source_ref.clone();
        let name: SmolStr = self.required_raw(ctx, "included submodule name")?;
        let module_root = self.arena.structural_root(ctx);
        let description = format!("include of submodule '{name}'");
        self.actions.push(InferenceAction::new(
            ModelPhase::SourceLinkage,
            description,
            at,
            vec![Requirement::SubmoduleNamed { name: name.clone() }],
            move |rx| {
                if let Some(submodule) = rx.ns_get::<SubmoduleForName>(ctx, &name) {
                    rx.pending_includes.push((module_root, submodule));
                }
                Ok(())
            },
        ));
        Ok(())
    }

    /// After the linkage fixed point: move submodule bodies into their
    /// including modules. The moved statements keep the submodule as their
    /// `definition_root`, so their prefixed references still resolve against
    /// the submodule's own imports.
    fn finish_linkage(&mut self) -> Result<(), ReactorError> {
        let includes = std::mem::take(&mut self.pending_includes);
        for (module_root, submodule) in includes {
            let module = self.meta.get(&module_root).and_then(|m| m.module.clone());
            if let (Some(module), Some(meta)) = (module, self.meta.get_mut(&submodule)) {
                meta.module = Some(module);
            }
            let body: Vec<StmtId> = self.arena[submodule]
                .children
                .clone()
                .into_iter()
                .filter(|c| {
                    !matches!(
                        self.arena[*c].keyword.as_core(),
                        Some(
                            YangKeyword::BelongsTo
                                | YangKeyword::YangVersion
                                | YangKeyword::Revision
                        )
                    )
                })
                .collect();
            for child in &body {
                self.arena[*child].parent = Some(module_root);
            }
            self.arena[submodule].children.retain(|c| !body.contains(c));
            self.arena[module_root].children.extend(body);
        }
        Ok(())
    }

    // ========================================================================
    // STATEMENT DEFINITION
    // ========================================================================

    /// Register a named definition (`grouping`/`typedef` in the lexical
    /// parent scope, `feature`/`identity`/`extension` module-wide).
    pub(crate) fn register_definition<N>(&mut self, ctx: StmtId) -> Result<(), ReactorIssue>
    where
        N: Namespace<Key = SmolStr, Value = StmtId>,
    {
        let name: SmolStr = self.required_raw(ctx, "definition name")?;
        let scope = match N::behaviour() {
            NamespaceBehaviour::StatementLocal => {
                self.arena[ctx].parent.unwrap_or(ctx)
            }
            _ => ctx,
        };
        if let Some(previous) = self.ns_put::<N>(scope, name.clone(), ctx) {
            if previous != ctx {
                return Err(InferenceError::other(
                    format!(
                        "duplicate {} '{}'",
                        self.arena[ctx].keyword.text(),
                        name
                    ),
                    self.arena[ctx].source_ref.clone(),
                )
                .into());
            }
        }
        Ok(())
    }

    /// Resolve an unknown (extension) statement against the defining
    /// module's `extension` namespace, or reject it.
    fn resolve_unknown(&mut self, ctx: StmtId) -> Result<(), ReactorIssue> {
        let StatementKeyword::Unknown(raw) = self.arena[ctx].keyword.clone() else {
            return Ok(());
        };
        let at = self.arena[ctx].source_ref.clone();
        let Some((prefix, name)) = raw.split_once(':') else {
            return Err(SourceError::UnknownStatement {
                keyword: raw.to_string(),
                at,
            }
            .into());
        };
        let prefix: SmolStr = prefix.into();
        let module = self
            .ns_get::<crate::reactor::namespace::PrefixToModule>(ctx, &prefix)
            .ok_or_else(|| {
                InferenceError::unresolved(
                    format!("extension statement '{raw}'"),
                    format!("prefix '{prefix}'"),
                    at.clone(),
                )
            })?;
        let module_ctx = self.ns_get::<ModuleCtx>(ctx, &module).ok_or_else(|| {
            InferenceError::unresolved(
                format!("extension statement '{raw}'"),
                format!("module {module}"),
                at.clone(),
            )
        })?;
        if self
            .ns_get::<ExtensionNs>(module_ctx, &SmolStr::from(name))
            .is_none()
        {
            return Err(InferenceError::unresolved(
                format!("extension statement '{raw}'"),
                format!("extension '{name}' in module {module}"),
                at,
            )
            .into());
        }
        // opaque from here on: the generic support carries it through
        Ok(())
    }

    // ========================================================================
    // FULL DECLARATION
    // ========================================================================

    /// Parse and store a statement's argument value.
    pub(crate) fn parse_argument(&mut self, ctx: StmtId, kind: ArgKind) -> Result<(), ReactorIssue> {
        let keyword = self.arena[ctx].keyword.clone();
        let raw = self.arena[ctx].raw_argument.clone();
        let at = self.arena[ctx].source_ref.clone();
        let value = kind.parse(&keyword, raw.as_deref(), &at)?;
        self.arena[ctx].argument = value;
        Ok(())
    }

    /// Enforce a keyword's substatement cardinality grammar.
    pub(crate) fn validate_substatements(
        &mut self,
        ctx: StmtId,
        validator: &SubstatementValidator,
    ) -> Result<(), ReactorIssue> {
        let keywords: Vec<StatementKeyword> = self.arena[ctx]
            .children
            .iter()
            .map(|c| self.arena[*c].keyword.clone())
            .collect();
        let keyword = self.arena[ctx].keyword.clone();
        let at = self.arena[ctx].source_ref.clone();
        validator.validate(&keyword, &keywords, &at)?;
        Ok(())
    }

    // ========================================================================
    // SHARED HELPERS
    // ========================================================================

    pub(crate) fn required_raw(&self, ctx: StmtId, what: &str) -> Result<SmolStr, ReactorIssue> {
        self.arena[ctx]
            .raw_argument
            .clone()
            .ok_or_else(|| {
                SourceError::syntax(
                    format!("missing {what}"),
                    self.arena[ctx].source_ref.clone(),
                )
                .into()
            })
    }

    pub(crate) fn child_raw(&self, ctx: StmtId, kw: YangKeyword) -> Option<SmolStr> {
        self.arena[ctx]
            .children
            .iter()
            .find(|c| self.arena[**c].keyword.is(kw))
            .and_then(|c| self.arena[*c].raw_argument.clone())
    }

    fn latest_revision(&self, ctx: StmtId) -> Option<Revision> {
        self.arena[ctx]
            .children
            .iter()
            .filter(|c| self.arena[**c].keyword.is(YangKeyword::Revision))
            .filter_map(|c| self.arena[*c].raw_argument.as_deref())
            .filter_map(|raw| raw.parse::<Revision>().ok())
            .max()
    }

    /// The module namespace a statement's schema nodes belong to: the
    /// nearest augment-injection stamp, else the structural module.
    pub(crate) fn node_module(&self, ctx: StmtId) -> Option<QNameModule> {
        for id in self.arena.ancestors(ctx) {
            if let Some(module) = &self.arena[id].ns_override {
                return Some(module.clone());
            }
        }
        let root = self.arena.structural_root(ctx);
        self.meta.get(&root).and_then(|m| m.module.clone())
    }

    /// The module identifier of the source a statement was written in, for
    /// resolving unprefixed references.
    pub(crate) fn definition_module(&self, ctx: StmtId) -> Option<QNameModule> {
        let def_root = self.arena[ctx].definition_root;
        self.meta.get(&def_root).and_then(|m| m.module.clone())
    }

    /// Resolve a possibly-prefixed reference to the module it points into.
    pub(crate) fn resolve_reference_module(
        &self,
        ctx: StmtId,
        node: &NodeId,
    ) -> Result<QNameModule, ReactorIssue> {
        match &node.prefix {
            Some(prefix) => self
                .ns_get::<crate::reactor::namespace::PrefixToModule>(ctx, prefix)
                .ok_or_else(|| {
                    InferenceError::unresolved(
                        format!("reference '{node}'"),
                        format!("prefix '{prefix}'"),
                        self.arena[ctx].source_ref.clone(),
                    )
                    .into()
                }),
            None => self.definition_module(ctx).ok_or_else(|| {
                InferenceError::other(
                    format!("reference '{node}' outside any module"),
                    self.arena[ctx].source_ref.clone(),
                )
                .into()
            }),
        }
    }

    /// Resolve a raw schema-node-id argument into QNames.
    pub(crate) fn resolve_target_path(
        &self,
        ctx: StmtId,
        nodes: &[NodeId],
    ) -> Result<Vec<QName>, ReactorIssue> {
        nodes
            .iter()
            .map(|node| {
                let module = self.resolve_reference_module(ctx, node)?;
                Ok(QName::new(module, node.name.clone()))
            })
            .collect()
    }

    /// Module roots, in source order.
    pub(crate) fn module_roots(&self) -> Vec<StmtId> {
        self.source_roots
            .iter()
            .copied()
            .filter(|root| self.meta.get(root).is_some_and(|m| !m.is_submodule))
            .collect()
    }

    /// Resolve a feature reference into its QName, checking the feature
    /// exists in the target module.
    pub(crate) fn resolve_feature_qname(
        &self,
        ctx: StmtId,
        node: &NodeId,
    ) -> Result<QName, ReactorIssue> {
        let module = self.resolve_reference_module(ctx, node)?;
        let at = self.arena[ctx].source_ref.clone();
        let module_ctx = self.ns_get::<ModuleCtx>(ctx, &module).ok_or_else(|| {
            InferenceError::unresolved(
                format!("feature '{node}'"),
                format!("module {module}"),
                at.clone(),
            )
        })?;
        if self.ns_get::<FeatureNs>(module_ctx, &node.name).is_none() {
            return Err(InferenceError::UnknownFeature {
                name: node.to_string(),
                at,
            }
            .into());
        }
        Ok(QName::new(module, node.name.clone()))
    }

    /// Read a statement's if-feature predicate with atoms resolved,
    /// whichever form it is currently stored in.
    pub(crate) fn resolved_if_feature(
        &self,
        if_ctx: StmtId,
    ) -> Result<Option<IfFeatureExpr<QName>>, ReactorIssue> {
        match &self.arena[if_ctx].argument {
            Some(ArgumentValue::IfFeatureResolved(expr)) => Ok(Some(expr.clone())),
            Some(ArgumentValue::IfFeature(expr)) => {
                let expr = expr.clone();
                let resolved =
                    expr.try_map(&mut |node| self.resolve_feature_qname(if_ctx, node))?;
                Ok(Some(resolved))
            }
            _ => Ok(None),
        }
    }
}
