//! Sim Kernel - data-driven simulation core
//!
//! A single [`World`] owns the entity store, inventories, signal bus,
//! action pipeline, rule engine, timers, staged events and progression.
//! Hosts call [`World::tick`] once per frame; content is declared as
//! condition/effect trees and loaded from TOML or JSON.

pub mod actions;
pub mod bus;
pub mod content;
pub mod core;
pub mod ecs;
pub mod entity;
pub mod expr;
pub mod inventory;
pub mod rules;
pub mod simulation;
pub mod snapshot;
pub mod spatial;

pub use crate::actions::{ActionDef, ActionRequest, ActionResponse, ActionResult};
pub use crate::bus::{Signal, SignalKind, SubscriptionId};
pub use crate::content::{ContentPack, ContentReport};
pub use crate::core::{ContentKey, EntityId, KernelConfig, KernelError, Result, SimTime, Value, Vec2};
pub use crate::ecs::World;
pub use crate::entity::{ArchetypeDef, StatInit};
pub use crate::expr::{Condition, Effect, EffectContext, Subject};
pub use crate::rules::{RuleContext, RuleDef, TriggerType};
pub use crate::simulation::{EventDef, StageDef, TickStage};
pub use crate::snapshot::WorldSnapshot;
