//! Error types for compilation and data-tree validation.
//!
//! Three layers, matching the pipeline:
//! - [`SourceError`] - a single source is unusable (syntax, cardinality,
//!   unparseable argument); fatal to that source.
//! - [`InferenceError`] - cross-source resolution failed (unresolved
//!   reference, cycle, deviation mismatch); aggregated by the reactor.
//! - [`ReactorError`] - the aggregate of everything the reactor collected
//!   before giving up.
//!
//! The apply engine raises [`SchemaViolation`] and is fail-fast; the
//! inference stack raises [`StackError`], whose `IllegalState` variant
//! flags programmatic misuse rather than bad input.

use thiserror::Error;

use crate::base::{QName, SourceRef};

/// A fatal problem with one source.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("{at}: syntax error: {message}")]
    Syntax { message: String, at: SourceRef },

    #[error("{at}: {message}")]
    Cardinality { message: String, at: SourceRef },

    #[error("{at}: invalid argument '{value}' for {keyword}: {reason}")]
    InvalidArgument {
        keyword: String,
        value: String,
        reason: String,
        at: SourceRef,
    },

    #[error("{at}: missing mandatory argument for {keyword}")]
    MissingArgument { keyword: String, at: SourceRef },

    #[error("{at}: unknown statement '{keyword}'")]
    UnknownStatement { keyword: String, at: SourceRef },
}

impl SourceError {
    pub fn syntax(message: impl Into<String>, at: SourceRef) -> Self {
        Self::Syntax {
            message: message.into(),
            at,
        }
    }

    pub fn cardinality(message: impl Into<String>, at: SourceRef) -> Self {
        Self::Cardinality {
            message: message.into(),
            at,
        }
    }

    pub fn invalid_argument(
        keyword: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
        at: SourceRef,
    ) -> Self {
        Self::InvalidArgument {
            keyword: keyword.into(),
            value: value.into(),
            reason: reason.into(),
            at,
        }
    }

    pub fn source_ref(&self) -> &SourceRef {
        match self {
            Self::Syntax { at, .. }
            | Self::Cardinality { at, .. }
            | Self::InvalidArgument { at, .. }
            | Self::MissingArgument { at, .. }
            | Self::UnknownStatement { at, .. } => at,
        }
    }
}

/// A cross-source inference failure.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("{at}: unresolved reference: {description}, missing {missing}")]
    Unresolved {
        description: String,
        missing: String,
        at: SourceRef,
    },

    #[error("{at}: circular dependency: {description}")]
    Cycle { description: String, at: SourceRef },

    #[error("{at}: type derivation failed for '{type_name}': {reason}")]
    TypeDerivation {
        type_name: String,
        reason: String,
        at: SourceRef,
    },

    #[error("{at}: deviation target mismatch: {reason}")]
    DeviationTarget { reason: String, at: SourceRef },

    #[error("{at}: duplicate schema node {qname}")]
    DuplicateSchemaNode { qname: QName, at: SourceRef },

    #[error("{at}: unknown feature '{name}'")]
    UnknownFeature { name: String, at: SourceRef },

    #[error("{at}: {message}")]
    Other { message: String, at: SourceRef },
}

impl InferenceError {
    pub fn unresolved(
        description: impl Into<String>,
        missing: impl Into<String>,
        at: SourceRef,
    ) -> Self {
        Self::Unresolved {
            description: description.into(),
            missing: missing.into(),
            at,
        }
    }

    pub fn cycle(description: impl Into<String>, at: SourceRef) -> Self {
        Self::Cycle {
            description: description.into(),
            at,
        }
    }

    pub fn other(message: impl Into<String>, at: SourceRef) -> Self {
        Self::Other {
            message: message.into(),
            at,
        }
    }
}

/// One issue collected by the reactor.
#[derive(Debug, Clone, Error)]
pub enum ReactorIssue {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// The aggregate failure of a reactor run: every source and inference issue
/// collected up to the phase that could not complete.
#[derive(Debug, Clone)]
pub struct ReactorError {
    pub issues: Vec<ReactorIssue>,
}

impl std::error::Error for ReactorError {}

impl ReactorError {
    pub fn new(issues: Vec<ReactorIssue>) -> Self {
        Self { issues }
    }

    pub fn single(issue: impl Into<ReactorIssue>) -> Self {
        Self {
            issues: vec![issue.into()],
        }
    }
}

impl std::fmt::Display for ReactorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "model compilation failed with {} issue(s):",
            self.issues.len()
        )?;
        for issue in &self.issues {
            writeln!(f, "  - {issue}")?;
        }
        Ok(())
    }
}

/// A modification that violates the schema. Fail-fast: the first violation
/// aborts the apply pass. `path` is the instance path of the offending node.
#[derive(Debug, Clone, Error)]
pub enum SchemaViolation {
    #[error("schema mismatch at {path}: {detail}")]
    SchemaMismatch { path: String, detail: String },

    #[error("type check failed at {path}: {detail}")]
    TypeCheck { path: String, detail: String },

    #[error("cardinality violated at {path}: {detail}")]
    Cardinality { path: String, detail: String },

    #[error("choice case violated at {path}: {detail}")]
    CaseExclusion { path: String, detail: String },

    #[error("mandatory node missing at {path}: {detail}")]
    MandatoryMissing { path: String, detail: String },

    #[error("unique constraint violated at {path}: {detail}")]
    Unique { path: String, detail: String },
}

impl SchemaViolation {
    pub fn schema_mismatch(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn type_check(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::TypeCheck {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::SchemaMismatch { path, .. }
            | Self::TypeCheck { path, .. }
            | Self::Cardinality { path, .. }
            | Self::CaseExclusion { path, .. }
            | Self::MandatoryMissing { path, .. }
            | Self::Unique { path, .. } => path,
        }
    }
}

/// Inference-stack failures.
#[derive(Debug, Clone, Error)]
pub enum StackError {
    /// The requested child does not exist at the current position.
    #[error("schema node {qname} not found under {parent}")]
    NotFound { qname: QName, parent: String },

    /// The operation is not legal in the stack's current state; a caller
    /// bug, not bad input.
    #[error("illegal inference stack use: {0}")]
    IllegalState(String),

    /// `deref` landed on an `instance-identifier` leaf; resolution has no
    /// static semantics. Recoverable by the caller.
    #[error("deref of instance-identifier leaf {qname} is not supported")]
    UnsupportedDerefTarget { qname: QName },

    /// A leafref chain closed on itself.
    #[error("leafref cycle: type '{type_name}' loops through {cycle_head}")]
    LeafrefCycle { type_name: String, cycle_head: QName },

    #[error("path resolution failed: {0}")]
    PathResolution(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SourceRef;

    #[test]
    fn test_reactor_error_lists_all_issues() {
        let at = SourceRef::new("foo.yang", 3, 5);
        let err = ReactorError::new(vec![
            SourceError::cardinality("Maximal count of DESCRIPTION for AUGMENT is 1", at.clone())
                .into(),
            InferenceError::unresolved("import of module 'bar'", "module bar", at).into(),
        ]);
        let text = err.to_string();
        assert!(text.contains("2 issue(s)"));
        assert!(text.contains("Maximal count"));
        assert!(text.contains("module bar"));
    }

    #[test]
    fn test_source_error_quotes_location() {
        let err = SourceError::syntax("unexpected '}'", SourceRef::new("foo.yang", 7, 2));
        assert!(err.to_string().starts_with("foo.yang:7:2"));
    }
}
