//! Statement model: keywords, arguments, declared and effective trees.
//!
//! The entities the whole system manipulates. Declared statements come out
//! of the parser; effective statements come out of the reactor; everything
//! else here is the vocabulary both sides share.

mod argument;
mod declared;
mod effective;
mod keyword;
mod path_expr;
mod types;

pub use argument::{
    ArgumentValue, DeviateKind, IfFeatureExpr, MaxElements, NodeId, OrderedBy, RawSchemaNodeId,
    Status,
};
pub use declared::DeclaredStatement;
pub use effective::{EffectiveStmt, StmtFlags};
pub use keyword::{StatementKeyword, YangKeyword};
pub use path_expr::{PathExpression, Step};
pub use types::{
    BitMember, BuiltinType, EnumMember, PatternRestriction, TypeDefinition, parse_length_arg,
    parse_range_arg,
};
