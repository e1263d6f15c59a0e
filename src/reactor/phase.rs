//! Model processing phases.

use std::fmt;

/// The fixed sequence of phases a statement moves through on its way from
/// declared to effective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelPhase {
    /// Nothing has run yet.
    Init,
    /// Resolve `module`/`submodule`/`belongs-to`/`import`; bind prefixes.
    SourceLinkage,
    /// Identify unknown (extension) statements and attach their supports.
    StatementDefinition,
    /// Parse arguments; validate substatement cardinality per keyword.
    FullDeclaration,
    /// Expand `uses`, evaluate `if-feature`, apply `augment` and `deviate`,
    /// compile types, resolve leafrefs, emit effective statements.
    EffectiveModel,
}

impl ModelPhase {
    pub fn next(self) -> Option<ModelPhase> {
        match self {
            ModelPhase::Init => Some(ModelPhase::SourceLinkage),
            ModelPhase::SourceLinkage => Some(ModelPhase::StatementDefinition),
            ModelPhase::StatementDefinition => Some(ModelPhase::FullDeclaration),
            ModelPhase::FullDeclaration => Some(ModelPhase::EffectiveModel),
            ModelPhase::EffectiveModel => None,
        }
    }
}

impl fmt::Display for ModelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelPhase::Init => "INIT",
            ModelPhase::SourceLinkage => "SOURCE_LINKAGE",
            ModelPhase::StatementDefinition => "STATEMENT_DEFINITION",
            ModelPhase::FullDeclaration => "FULL_DECLARATION",
            ModelPhase::EffectiveModel => "EFFECTIVE_MODEL",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        let mut phase = ModelPhase::Init;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            seen.push(next);
            phase = next;
        }
        assert_eq!(seen.len(), 5);
        assert!(ModelPhase::SourceLinkage < ModelPhase::EffectiveModel);
    }
}
