//! Foundation types for the yangine toolchain.
//!
//! This module provides fundamental types used throughout the compiler:
//! - [`QName`], [`QNameModule`], [`XmlNamespace`] - qualified names
//! - [`Revision`] - YANG revision dates
//! - [`SchemaNodeId`] - schema node identifiers (QName paths from module root)
//! - [`SourceRef`] - source positions for diagnostics
//! - [`Interner`] - string interning
//!
//! This module has NO dependencies on other yangine modules.

mod intern;
mod qname;
mod source;

pub use intern::Interner;
pub use qname::{InvalidRevision, QName, QNameModule, Revision, SchemaNodeId, XmlNamespace};
pub use source::SourceRef;
