//! Trigger-bound condition -> effect rules

pub mod definition;
pub mod engine;

pub use definition::{RuleContext, RuleDef, RuleState, TriggerType};
pub use engine::{evaluate_periodic_rules, RuleEngine};
