//! Normalized nodes and versioned tree nodes.

mod node;
mod value;
mod version;

pub use node::{
    AugmentationId, Children, InstancePath, ListEntryId, NormalizedNode, PathArgument,
};
pub use value::Value;
pub use version::{TreeNode, Version};
