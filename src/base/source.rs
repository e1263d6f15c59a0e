//! Source references carried into diagnostics.

use std::fmt;
use std::sync::Arc;

/// Position of a statement in its source text.
///
/// Every declared statement carries one; every source-level error quotes it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    source: Arc<str>,
    line: u32,
    col: u32,
}

impl SourceRef {
    pub fn new(source: impl Into<Arc<str>>, line: u32, col: u32) -> Self {
        Self {
            source: source.into(),
            line,
            col,
        }
    }

    /// Name of the source (usually the `.yang` file name).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 1-based line.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based column.
    pub fn col(&self) -> u32 {
        self.col
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.line, self.col)
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceRef({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let sref = SourceRef::new("foo.yang", 12, 5);
        assert_eq!(sref.to_string(), "foo.yang:12:5");
    }
}
