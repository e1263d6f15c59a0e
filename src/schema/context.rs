//! Effective model context: the root of all schema navigation.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::base::{QName, QNameModule};
use crate::model::{ArgumentValue, EffectiveStmt, IfFeatureExpr, YangKeyword};

/// The set of features a consumer supports. Absent (`All`) means every
/// feature is considered supported.
#[derive(Debug, Clone, Default)]
pub enum FeatureSet {
    #[default]
    All,
    Explicit(FxHashSet<QName>),
}

impl FeatureSet {
    /// No features at all.
    pub fn none() -> FeatureSet {
        FeatureSet::Explicit(FxHashSet::default())
    }

    pub fn of(features: impl IntoIterator<Item = QName>) -> FeatureSet {
        FeatureSet::Explicit(features.into_iter().collect())
    }

    pub fn contains(&self, qname: &QName) -> bool {
        match self {
            FeatureSet::All => true,
            FeatureSet::Explicit(set) => set.contains(qname),
        }
    }
}

/// One module of the effective model.
#[derive(Debug, Clone)]
pub struct ModuleEffective {
    name: SmolStr,
    module: QNameModule,
    prefix: SmolStr,
    /// Prefix bindings usable inside this module (its own prefix included).
    prefixes: FxHashMap<SmolStr, QNameModule>,
    stmt: Arc<EffectiveStmt>,
}

impl ModuleEffective {
    pub fn new(
        name: SmolStr,
        module: QNameModule,
        prefix: SmolStr,
        prefixes: FxHashMap<SmolStr, QNameModule>,
        stmt: Arc<EffectiveStmt>,
    ) -> Self {
        Self {
            name,
            module,
            prefix,
            prefixes,
            stmt,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &QNameModule {
        &self.module
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn resolve_prefix(&self, prefix: &str) -> Option<&QNameModule> {
        self.prefixes.get(prefix)
    }

    /// The module effective statement; its substatements are the module's
    /// effective body.
    pub fn stmt(&self) -> &Arc<EffectiveStmt> {
        &self.stmt
    }
}

/// Mapping from module identifier to module effective statement. Immutable
/// after the reactor completes; shared freely between readers.
#[derive(Debug, Clone, Default)]
pub struct EffectiveModelContext {
    modules: IndexMap<QNameModule, Arc<ModuleEffective>>,
    by_name: FxHashMap<SmolStr, QNameModule>,
}

impl EffectiveModelContext {
    pub fn new(modules: Vec<ModuleEffective>) -> Self {
        let mut map = IndexMap::new();
        let mut by_name = FxHashMap::default();
        for module in modules {
            by_name.insert(SmolStr::from(module.name()), module.module().clone());
            map.insert(module.module().clone(), Arc::new(module));
        }
        Self {
            modules: map,
            by_name,
        }
    }

    pub fn module(&self, id: &QNameModule) -> Option<&Arc<ModuleEffective>> {
        self.modules.get(id)
    }

    pub fn module_by_name(&self, name: &str) -> Option<&Arc<ModuleEffective>> {
        self.by_name.get(name).and_then(|id| self.modules.get(id))
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<ModuleEffective>> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Re-run `if-feature` filtering against `features`, producing a new
    /// context. Filtering a model with the same set it was compiled with is
    /// the identity.
    pub fn filter_features(&self, features: &FeatureSet) -> EffectiveModelContext {
        let modules = self
            .modules
            .values()
            .map(|module| {
                let stmt = self
                    .filter_stmt(module.stmt(), features)
                    .unwrap_or_else(|| {
                        // a module statement itself carries no if-feature
                        Arc::clone(module.stmt())
                    });
                ModuleEffective::new(
                    module.name.clone(),
                    module.module.clone(),
                    module.prefix.clone(),
                    module.prefixes.clone(),
                    stmt,
                )
            })
            .collect();
        EffectiveModelContext::new(modules)
    }

    fn filter_stmt(
        &self,
        stmt: &Arc<EffectiveStmt>,
        features: &FeatureSet,
    ) -> Option<Arc<EffectiveStmt>> {
        for gate in stmt.find_all(YangKeyword::IfFeature) {
            if let Some(ArgumentValue::IfFeatureResolved(expr)) = gate.argument() {
                if !self.predicate_holds(expr, features, 0) {
                    return None;
                }
            }
        }
        let substatements: Vec<Arc<EffectiveStmt>> = stmt
            .substatements()
            .iter()
            .filter_map(|sub| self.filter_stmt(sub, features))
            .collect();
        if substatements.len() == stmt.substatements().len() {
            // share the unchanged subtree
            return Some(Arc::clone(stmt));
        }
        Some(Arc::new(EffectiveStmt::new(
            stmt.keyword().clone(),
            stmt.argument().cloned(),
            stmt.qname().cloned(),
            stmt.flags(),
            stmt.schema_path().cloned(),
            stmt.type_def().cloned(),
            substatements,
        )))
    }

    fn predicate_holds(
        &self,
        expr: &IfFeatureExpr<QName>,
        features: &FeatureSet,
        depth: u32,
    ) -> bool {
        expr.evaluate(&|qname| self.feature_enabled(qname, features, depth))
    }

    fn feature_enabled(&self, qname: &QName, features: &FeatureSet, depth: u32) -> bool {
        if depth > 32 || !features.contains(qname) {
            return false;
        }
        let Some(module) = self.module(qname.module()) else {
            return true;
        };
        let feature = module
            .stmt()
            .find_all(YangKeyword::Feature)
            .find(|f| f.qname().map(|q| q.local_name()) == Some(qname.local_name()));
        let Some(feature) = feature else {
            return true;
        };
        feature.find_all(YangKeyword::IfFeature).all(|gate| {
            match gate.argument() {
                Some(ArgumentValue::IfFeatureResolved(expr)) => {
                    expr.evaluate(&|q| self.feature_enabled(q, features, depth + 1))
                }
                _ => true,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::XmlNamespace;

    #[test]
    fn test_feature_set_contains() {
        let module = QNameModule::new(XmlNamespace::new("urn:f"), None);
        let feature = QName::new(module, "ssh");
        assert!(FeatureSet::All.contains(&feature));
        assert!(!FeatureSet::none().contains(&feature));
        assert!(FeatureSet::of([feature.clone()]).contains(&feature));
    }
}
