//! Inference actions and their prerequisites.
//!
//! A statement support registers an action when it cannot make progress
//! until some other statement (possibly in another source) has produced a
//! namespace entry. The reactor fires every action whose prerequisites are
//! met in fixed-point rounds; a round that fires nothing while actions
//! remain aborts the run with one aggregated error listing each stuck
//! action's missing prerequisites.

use std::fmt;

use smol_str::SmolStr;

use crate::base::{QName, Revision, SourceRef};
use crate::error::ReactorIssue;
use crate::reactor::phase::ModelPhase;
use crate::reactor::reactor::Reactor;

/// A single prerequisite of an inference action.
#[derive(Debug, Clone)]
pub enum Requirement {
    /// Some module with this name has been linked (any revision).
    ModuleNamed { name: SmolStr },
    /// A specific revision of a module has been linked.
    ModuleRevision { name: SmolStr, revision: Revision },
    /// A submodule with this name has been linked.
    SubmoduleNamed { name: SmolStr },
    /// The schema-tree path is resolvable starting from the module context
    /// owning the first QName.
    SchemaPath { path: Vec<QName> },
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::ModuleNamed { name } => write!(f, "module '{name}'"),
            Requirement::ModuleRevision { name, revision } => {
                write!(f, "module '{name}' revision {revision}")
            }
            Requirement::SubmoduleNamed { name } => write!(f, "submodule '{name}'"),
            Requirement::SchemaPath { path } => {
                write!(f, "schema node ")?;
                for qname in path {
                    write!(f, "/{}", qname.local_name())?;
                }
                Ok(())
            }
        }
    }
}

type ApplyFn = Box<dyn FnOnce(&mut Reactor) -> Result<(), ReactorIssue>>;

/// A deferred inference step.
pub struct InferenceAction {
    pub phase: ModelPhase,
    /// Human-readable statement of what this action does; quoted in stuck
    /// reports.
    pub description: String,
    pub at: SourceRef,
    pub requires: Vec<Requirement>,
    pub apply: ApplyFn,
}

impl InferenceAction {
    pub fn new(
        phase: ModelPhase,
        description: impl Into<String>,
        at: SourceRef,
        requires: Vec<Requirement>,
        apply: impl FnOnce(&mut Reactor) -> Result<(), ReactorIssue> + 'static,
    ) -> Self {
        Self {
            phase,
            description: description.into(),
            at,
            requires,
            apply: Box::new(apply),
        }
    }
}

impl fmt::Debug for InferenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceAction")
            .field("phase", &self.phase)
            .field("description", &self.description)
            .field("requires", &self.requires)
            .finish_non_exhaustive()
    }
}
