//! Effective model context and the schema-inference stack.

mod context;
mod stack;

pub use context::{EffectiveModelContext, FeatureSet, ModuleEffective};
pub use stack::{Inference, InferenceStack};
