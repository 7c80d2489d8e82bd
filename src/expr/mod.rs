//! Condition and effect trees evaluated against the world

pub mod condition;
pub mod context;
pub mod effect;

pub use condition::{all_pass, Comparison, Condition};
pub use context::{EffectContext, Subject};
pub use effect::{apply_all, Effect};
