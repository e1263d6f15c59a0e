//! Schema-aware tree validation: the modification tree and apply engine.
//!
//! A transaction is: snapshot → [`DataTreeModification`] → record
//! write/merge/delete operations → `seal()` → `apply()` → commit the
//! candidate root. Validation happens entirely inside `apply()`, per-schema
//! strategy by per-schema strategy.

mod engine;
mod modification;
mod strategy;
mod typecheck;

pub use engine::{DataTree, DataTreeModification, DataTreeSnapshot, root_qname};
pub use modification::{ModifiedNode, Operation};
pub use typecheck::check_value;
