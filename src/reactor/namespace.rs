//! Typed statement namespaces.
//!
//! Compilation-time lookups all go through a `(context, namespace, key)`
//! triple. Each namespace declares its key and value types and its scoping
//! *behaviour*; the behaviour maps the asking context to the context whose
//! store actually holds the entry. This is what makes forward references
//! across files tractable without a topological sort: an inference action
//! names the (namespace, key) it needs and the reactor re-tries it once
//! someone writes that key.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::{QName, QNameModule, Revision};
use crate::reactor::arena::StmtId;

/// Which context's store a namespace reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceBehaviour {
    /// The entry lives on the statement context itself. Lookups may walk
    /// lexically outward ([`crate::reactor::Reactor::ns_get_lexical`]).
    StatementLocal,
    /// The entry lives on the root of the source the statement was written
    /// in (its `definition_root`).
    RootStatementLocal,
    /// The entry lives on the owning module's root context.
    ModuleLocal,
    /// The entry lives in the reactor-wide store.
    Global,
}

/// Per-context namespace storage. Only roots and schema parents actually
/// populate theirs; everything else stays empty.
#[derive(Debug, Default, Clone)]
pub struct NamespaceStore {
    pub(crate) prefixes: FxHashMap<SmolStr, QNameModule>,
    pub(crate) modules_by_name: FxHashMap<SmolStr, StmtId>,
    pub(crate) modules_by_revision: FxHashMap<(SmolStr, Revision), StmtId>,
    pub(crate) submodules_by_name: FxHashMap<SmolStr, StmtId>,
    pub(crate) module_ctxs: FxHashMap<QNameModule, StmtId>,
    pub(crate) features: FxHashMap<SmolStr, StmtId>,
    pub(crate) identities: FxHashMap<SmolStr, StmtId>,
    pub(crate) groupings: FxHashMap<SmolStr, StmtId>,
    pub(crate) typedefs: FxHashMap<SmolStr, StmtId>,
    pub(crate) extensions: FxHashMap<SmolStr, StmtId>,
    pub(crate) schema_children: FxHashMap<QName, StmtId>,
}

/// A typed namespace: key and value types plus scoping behaviour, projected
/// onto the concrete store. Lookups through
/// [`crate::reactor::Reactor::ns_get`] are ordinary generic functions.
pub trait Namespace {
    type Key: std::hash::Hash + Eq + Clone;
    type Value: Clone;

    const NAME: &'static str;

    fn behaviour() -> NamespaceBehaviour;
    fn map(store: &NamespaceStore) -> &FxHashMap<Self::Key, Self::Value>;
    fn map_mut(store: &mut NamespaceStore) -> &mut FxHashMap<Self::Key, Self::Value>;
}

macro_rules! namespace {
    ($(#[$doc:meta])* $name:ident, $key:ty, $value:ty, $behaviour:ident, $field:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Namespace for $name {
            type Key = $key;
            type Value = $value;

            const NAME: &'static str = stringify!($field);

            fn behaviour() -> NamespaceBehaviour {
                NamespaceBehaviour::$behaviour
            }

            fn map(store: &NamespaceStore) -> &FxHashMap<Self::Key, Self::Value> {
                &store.$field
            }

            fn map_mut(store: &mut NamespaceStore) -> &mut FxHashMap<Self::Key, Self::Value> {
                &mut store.$field
            }
        }
    };
}

namespace!(
    /// prefix → module, per source (module prefix, `belongs-to` prefix, and
    /// one entry per import).
    PrefixToModule, SmolStr, QNameModule, RootStatementLocal, prefixes
);
namespace!(
    /// module name → module root context, latest revision.
    ModuleForName, SmolStr, StmtId, Global, modules_by_name
);
namespace!(
    /// (module name, revision) → module root context.
    ModuleForRevision, (SmolStr, Revision), StmtId, Global, modules_by_revision
);
namespace!(
    /// submodule name → submodule root context.
    SubmoduleForName, SmolStr, StmtId, Global, submodules_by_name
);
namespace!(
    /// module identifier → module root context.
    ModuleCtx, QNameModule, StmtId, Global, module_ctxs
);
namespace!(
    /// feature name → `feature` statement, per module.
    FeatureNs, SmolStr, StmtId, ModuleLocal, features
);
namespace!(
    /// identity name → `identity` statement, per module.
    IdentityNs, SmolStr, StmtId, ModuleLocal, identities
);
namespace!(
    /// grouping name → `grouping` statement; lexically scoped.
    GroupingNs, SmolStr, StmtId, StatementLocal, groupings
);
namespace!(
    /// typedef name → `typedef` statement; lexically scoped.
    TypedefNs, SmolStr, StmtId, StatementLocal, typedefs
);
namespace!(
    /// extension name → `extension` statement, per module.
    ExtensionNs, SmolStr, StmtId, ModuleLocal, extensions
);
namespace!(
    /// schema child QName → child statement, per schema parent.
    SchemaTreeNs, QName, StmtId, StatementLocal, schema_children
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_projection() {
        let mut store = NamespaceStore::default();
        GroupingNs::map_mut(&mut store).insert("g".into(), StmtId(7));
        assert_eq!(GroupingNs::map(&store).get("g"), Some(&StmtId(7)));
        assert!(TypedefNs::map(&store).is_empty());
        assert_eq!(GroupingNs::behaviour(), NamespaceBehaviour::StatementLocal);
        assert_eq!(ModuleForName::behaviour(), NamespaceBehaviour::Global);
    }
}
