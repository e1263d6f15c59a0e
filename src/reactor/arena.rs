//! Statement-context arena.
//!
//! Every statement the reactor touches lives in one flat arena, keyed by a
//! stable [`StmtId`]. Parent/child references are indices, never owning
//! pointers, so cyclic reference *graphs* (grouping → type → leafref →
//! grouping) cannot create ownership loops; true semantic cycles are caught
//! by bounded re-entry counters in the passes themselves.

use std::ops::{Index, IndexMut};

use smol_str::SmolStr;

use crate::base::{QName, QNameModule, SourceRef};
use crate::model::{ArgumentValue, DeclaredStatement, StatementKeyword};
use crate::reactor::namespace::NamespaceStore;

/// Stable index of a statement context in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtId(pub(crate) u32);

/// How a statement entered its current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyType {
    /// Written where it stands.
    Original,
    /// Cloned into place by `uses` expansion.
    AddedByUses,
    /// Injected into place by an `augment` or a `deviate add`/`replace`.
    AddedByAugmentation,
}

/// One statement under reactor control.
#[derive(Debug, Clone)]
pub struct StatementContext {
    pub keyword: StatementKeyword,
    pub raw_argument: Option<SmolStr>,
    /// Parsed during `FullDeclaration`.
    pub argument: Option<ArgumentValue>,
    pub source_ref: SourceRef,
    pub parent: Option<StmtId>,
    pub children: Vec<StmtId>,
    pub copy_type: CopyType,
    /// Root of the source this statement was *written* in. Differs from the
    /// structural root for `uses` copies and inlined submodule content;
    /// prefixed references inside this statement resolve against this root.
    pub definition_root: StmtId,
    /// Namespace stamp for augment-injected subtrees: injected children keep
    /// the augmenting module's namespace regardless of where they now live.
    pub ns_override: Option<QNameModule>,
    /// Cleared by `if-feature` elision and `deviate not-supported`.
    pub supported: bool,
    /// For `uses` statements: expansion already ran (set before copying so
    /// copies of expanded bodies are not re-expanded).
    pub expanded: bool,
    /// Resolved node name, set when the statement enters the schema tree.
    pub qname: Option<QName>,
    pub namespaces: NamespaceStore,
}

/// Flat statement storage.
#[derive(Debug, Default)]
pub struct Arena {
    stmts: Vec<StatementContext>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// Load a declared tree, returning the root id. `definition_root` of
    /// every loaded context is the loaded root itself.
    pub fn load(&mut self, declared: &DeclaredStatement) -> StmtId {
        let root = self.alloc(declared, None);
        // fix up definition roots: the placeholder written by alloc is the
        // node's own id; rewrite the whole subtree to the real root.
        self.stamp_definition_root(root, root);
        root
    }

    fn alloc(&mut self, declared: &DeclaredStatement, parent: Option<StmtId>) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(StatementContext {
            keyword: declared.keyword().clone(),
            raw_argument: declared.raw_argument().map(SmolStr::from),
            argument: None,
            source_ref: declared.source_ref().clone(),
            parent,
            children: Vec::new(),
            copy_type: CopyType::Original,
            definition_root: id,
            ns_override: None,
            supported: true,
            expanded: false,
            qname: None,
            namespaces: NamespaceStore::default(),
        });
        let children: Vec<StmtId> = declared
            .children()
            .iter()
            .map(|child| self.alloc(child, Some(id)))
            .collect();
        self[id].children = children;
        id
    }

    fn stamp_definition_root(&mut self, id: StmtId, root: StmtId) {
        self[id].definition_root = root;
        let children = self[id].children.clone();
        for child in children {
            self.stamp_definition_root(child, root);
        }
    }

    /// Deep-copy a subtree under a new parent. The copy keeps the source's
    /// `definition_root` (prefixes keep resolving where the text was
    /// written), raw and parsed arguments, and support flag.
    pub fn deep_copy(&mut self, src: StmtId, new_parent: StmtId, copy_type: CopyType) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        let template = &self.stmts[src.0 as usize];
        let copied = StatementContext {
            keyword: template.keyword.clone(),
            raw_argument: template.raw_argument.clone(),
            argument: template.argument.clone(),
            source_ref: template.source_ref.clone(),
            parent: Some(new_parent),
            children: Vec::new(),
            copy_type,
            definition_root: template.definition_root,
            ns_override: template.ns_override.clone(),
            supported: template.supported,
            expanded: template.expanded,
            qname: None,
            namespaces: NamespaceStore::default(),
        };
        self.stmts.push(copied);
        let src_children = self[src].children.clone();
        let children: Vec<StmtId> = src_children
            .iter()
            // an Original copy keeps each child's own provenance (statements
            // already AddedByUses inside the template stay that way); every
            // other copy downgrades its subtree to AddedByUses
            .map(|child| {
                let nested = match copy_type {
                    CopyType::Original => self[*child].copy_type,
                    _ => CopyType::AddedByUses,
                };
                self.deep_copy(*child, id, nested)
            })
            .collect();
        self[id].children = children;
        id
    }

    /// Structural root (the module or submodule statement) above `id`.
    pub fn structural_root(&self, id: StmtId) -> StmtId {
        let mut current = id;
        while let Some(parent) = self[current].parent {
            current = parent;
        }
        current
    }

    /// Iterate `id` and every ancestor up to the structural root.
    pub fn ancestors(&self, id: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        let mut next = Some(id);
        std::iter::from_fn(move || {
            let current = next?;
            next = self[current].parent;
            Some(current)
        })
    }

    /// Pre-order walk of a subtree.
    pub fn walk(&self, root: StmtId) -> Vec<StmtId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            // push in reverse so the walk visits children in order
            for child in self[id].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Detach `child` from its parent's child list.
    pub fn detach(&mut self, child: StmtId) {
        if let Some(parent) = self[child].parent {
            self[parent].children.retain(|c| *c != child);
        }
        self[child].parent = None;
    }
}

impl Index<StmtId> for Arena {
    type Output = StatementContext;

    fn index(&self, id: StmtId) -> &StatementContext {
        &self.stmts[id.0 as usize]
    }
}

impl IndexMut<StmtId> for Arena {
    fn index_mut(&mut self, id: StmtId) -> &mut StatementContext {
        &mut self.stmts[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn load(text: &str) -> (Arena, StmtId) {
        let declared = parse_source("test.yang", text).unwrap();
        let mut arena = Arena::new();
        let root = arena.load(&declared);
        (arena, root)
    }

    #[test]
    fn test_load_preserves_structure() {
        let (arena, root) = load(
            "module foo { namespace \"urn:foo\"; prefix foo; container c { leaf l { type string; } } }",
        );
        assert_eq!(arena[root].children.len(), 3);
        let container = arena[root].children[2];
        assert_eq!(arena[container].keyword.text(), "container");
        assert_eq!(arena.structural_root(container), root);
        assert_eq!(arena[container].definition_root, root);
    }

    #[test]
    fn test_deep_copy_keeps_definition_root() {
        let (mut arena, root) = load(
            "module foo { namespace \"urn:foo\"; prefix foo; grouping g { leaf l { type string; } } container c; }",
        );
        let grouping = arena[root].children[2];
        let container = arena[root].children[3];
        let leaf = arena[grouping].children[0];

        let copy = arena.deep_copy(leaf, container, CopyType::AddedByUses);
        arena[container].children.push(copy);

        assert_eq!(arena[copy].copy_type, CopyType::AddedByUses);
        assert_eq!(arena[copy].definition_root, root);
        assert_eq!(arena.structural_root(copy), root);
        // original untouched
        assert_eq!(arena[grouping].children, vec![leaf]);
    }

    #[test]
    fn test_original_copy_preserves_child_provenance() {
        let (mut arena, root) = load(
            "module foo { namespace \"urn:foo\"; prefix foo; grouping g { leaf a { type string; } leaf b { type string; } } container c; }",
        );
        let grouping = arena[root].children[2];
        let container = arena[root].children[3];
        let b = arena[grouping].children[1];
        // simulate a nested expansion having produced `b`
        arena[b].copy_type = CopyType::AddedByUses;

        let original = arena.deep_copy(grouping, container, CopyType::Original);
        assert_eq!(arena[original].copy_type, CopyType::Original);
        assert_eq!(
            arena[arena[original].children[0]].copy_type,
            CopyType::Original
        );
        assert_eq!(
            arena[arena[original].children[1]].copy_type,
            CopyType::AddedByUses
        );

        // a non-original copy downgrades the whole subtree
        let nested = arena.deep_copy(grouping, container, CopyType::AddedByUses);
        assert_eq!(
            arena[arena[nested].children[0]].copy_type,
            CopyType::AddedByUses
        );
    }

    #[test]
    fn test_walk_is_preorder() {
        let (arena, root) = load(
            "module foo { namespace \"urn:foo\"; prefix foo; container a { leaf b { type string; } } leaf c { type string; } }",
        );
        let names: Vec<_> = arena
            .walk(root)
            .into_iter()
            .filter_map(|id| arena[id].raw_argument.clone())
            .collect();
        assert_eq!(names[0], "foo");
        let a_pos = names.iter().position(|n| n == "a").unwrap();
        let b_pos = names.iter().position(|n| n == "b").unwrap();
        let c_pos = names.iter().position(|n| n == "c").unwrap();
        assert!(a_pos < b_pos && b_pos < c_pos);
    }
}
