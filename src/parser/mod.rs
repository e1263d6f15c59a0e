//! Lexer and parser for YANG module text.
//!
//! This module turns `.yang` source into declared-statement trees:
//!
//! ```text
//! Source Text
//!     ↓
//! Lexer (logos) → Tokens
//!     ↓
//! Parser → DeclaredStatement tree (immutable)
//!     ↓
//! Reactor → EffectiveStmt tree
//! ```
//!
//! The parser is deliberately dumb: it knows the statement shape of RFC 7950
//! §6.3 and nothing about keyword semantics. Independent sources may be
//! parsed in parallel ([`parse_sources`]); everything downstream is
//! single-threaded inside one reactor.

#[allow(clippy::module_inception)]
mod parser;

mod lexer;

pub use lexer::{Lexer, LineIndex, Token, TokenKind, tokenize};
pub use parser::{parse_source, parse_sources};
