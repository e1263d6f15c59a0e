//! # yangine-base
//!
//! Core library for YANG (RFC 6020 / RFC 7950) statement compilation,
//! schema navigation, and schema-aware data tree validation.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! apply     → modification tree, per-schema apply strategies
//!   ↓
//! tree      → normalized nodes, versioned tree nodes
//!   ↓
//! reactor   → phased inference engine (declared → effective)
//!   ↓
//! schema    → effective model context, schema-inference stack
//!   ↓
//! parser    → logos lexer, recursive-descent statement parser
//!   ↓
//! model     → keywords, arguments, declared/effective statements
//!   ↓
//! base      → primitives (QName, Revision, SourceRef, interning)
//! ```
//!
//! Side surfaces: [`codec`] (legacy binary value codec), [`notify`]
//! (queued notification dispatcher), [`error`] (crate-level error types).
//!
//! ## From text to a validated tree
//!
//! ```no_run
//! use yangine::reactor::ReactorBuilder;
//! use yangine::apply::DataTree;
//!
//! let model = ReactorBuilder::new()
//!     .add_source("example.yang", "module example { /* ... */ }")
//!     .build()?;
//!
//! let mut tree = DataTree::new(&model);
//! let mut tx = tree.snapshot().new_modification();
//! // tx.write(...); tx.merge(...);
//! tx.seal();
//! let candidate = tx.apply()?;
//! tree.commit(candidate);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Foundation types: QName, Revision, SchemaNodeId, SourceRef, Interner.
pub mod base;

/// Statement model: keywords, arguments, declared and effective trees.
pub mod model;

/// Parser: logos lexer, recursive-descent statement parser.
pub mod parser;

/// Schema: effective model context and the inference stack.
pub mod schema;

/// Reactor: the phased inference engine.
pub mod reactor;

/// Normalized nodes and versioned tree nodes.
pub mod tree;

/// Modification tree and schema-aware apply engine.
pub mod apply;

/// Legacy binary value codec.
pub mod codec;

/// Queued notification dispatcher.
pub mod notify;

/// Error types for compilation and validation.
pub mod error;

// Re-export the types nearly every consumer touches.
pub use base::{QName, QNameModule, Revision, SchemaNodeId, SourceRef, XmlNamespace};
pub use error::{ReactorError, SchemaViolation, SourceError, StackError};
pub use reactor::{FeatureSet, ReactorBuilder, compile};
pub use schema::{EffectiveModelContext, InferenceStack};
