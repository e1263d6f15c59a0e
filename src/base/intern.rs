//! String interner for namespace URIs and other hot strings.
//!
//! Uses `Arc<str>` for cheap cloning; interning the same string twice returns
//! the same allocation. Namespace URIs repeat once per statement in a module,
//! so the reactor deduplicates them through one of these.

use rustc_hash::FxHashSet;
use std::sync::Arc;

/// String interner that deduplicates strings.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    strings: FxHashSet<Arc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning a cheap-to-clone reference.
    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            Arc::clone(existing)
        } else {
            let arc: Arc<str> = Arc::from(s);
            self.strings.insert(Arc::clone(&arc));
            arc
        }
    }

    /// Number of unique strings interned.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_returns_same_arc() {
        let mut interner = Interner::new();
        let a = interner.intern("urn:example:mod");
        let b = interner.intern("urn:example:mod");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_intern_different_strings() {
        let mut interner = Interner::new();
        let a = interner.intern("urn:a");
        let b = interner.intern("urn:b");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 2);
    }
}
