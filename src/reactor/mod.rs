//! The statement-compilation reactor: declared statements in, effective
//! model out.
//!
//! ```no_run
//! use yangine::reactor::ReactorBuilder;
//!
//! let model = ReactorBuilder::new()
//!     .add_source("example.yang", "module example { /* ... */ }")
//!     .build()?;
//! # Ok::<(), yangine::error::ReactorError>(())
//! ```

mod action;
mod arena;
mod build;
mod effective;
mod namespace;
mod phase;
#[allow(clippy::module_inception)]
mod reactor;
mod support;
mod supports;
mod typedefs;
mod uses;

pub use action::{InferenceAction, Requirement};
pub use arena::{CopyType, StmtId};
pub use namespace::{Namespace, NamespaceBehaviour};
pub use phase::ModelPhase;
pub use reactor::Reactor;
pub use support::{
    ArgKind, Registry, SimpleSupport, StatementPolicy, StatementSupport, SubstatementValidator,
};
pub use supports::default_registry;

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::error::ReactorError;
use crate::parser::parse_sources;
use crate::schema::EffectiveModelContext;
pub use crate::schema::FeatureSet;

/// How deviations are admitted and how strictly they are checked.
#[derive(Debug, Clone, Default)]
pub struct DeviationPolicy {
    /// When present: for each target module named here, only the listed
    /// modules may deviate it; others are dropped with a warning.
    pub supported: Option<FxHashMap<SmolStr, FxHashSet<SmolStr>>>,
    /// Promote `deviate delete` of a missing substatement from a warning to
    /// an error.
    pub strict: bool,
}

/// Builder for one reactor run.
pub struct ReactorBuilder {
    sources: Vec<(String, String)>,
    features: FeatureSet,
    deviations: DeviationPolicy,
    registry: Arc<Registry>,
}

impl ReactorBuilder {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            features: FeatureSet::All,
            deviations: DeviationPolicy::default(),
            registry: default_registry(),
        }
    }

    /// Add one `.yang` source text.
    pub fn add_source(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.sources.push((name.into(), text.into()));
        self
    }

    /// Select the supported feature set. Absent means all features.
    pub fn features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    /// Restrict which modules may deviate `target_module`.
    pub fn supported_deviations(
        mut self,
        target_module: &str,
        deviating_modules: &[&str],
    ) -> Self {
        self.deviations
            .supported
            .get_or_insert_with(FxHashMap::default)
            .insert(
                target_module.into(),
                deviating_modules.iter().map(|m| SmolStr::from(*m)).collect(),
            );
        self
    }

    /// Make `deviate delete` of a missing substatement a hard error.
    pub fn strict_deviations(mut self, strict: bool) -> Self {
        self.deviations.strict = strict;
        self
    }

    /// Use a custom statement-support registry.
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Parse all sources (in parallel) and run the reactor.
    pub fn build(self) -> Result<EffectiveModelContext, ReactorError> {
        let refs: Vec<(&str, &str)> = self
            .sources
            .iter()
            .map(|(name, text)| (name.as_str(), text.as_str()))
            .collect();
        let parsed = parse_sources(&refs)?;
        let mut reactor = Reactor::new(self.registry, self.features, self.deviations);
        for root in &parsed {
            reactor.add_source(root);
        }
        reactor.run()
    }
}

impl Default for ReactorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile sources with every feature supported and default policies.
pub fn compile(sources: &[(&str, &str)]) -> Result<EffectiveModelContext, ReactorError> {
    let mut builder = ReactorBuilder::new();
    for (name, text) in sources {
        builder = builder.add_source(*name, *text);
    }
    builder.build()
}
