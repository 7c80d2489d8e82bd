//! World-mutating operations

use crate::core::types::ContentKey;
use crate::core::value::Value;
use crate::ecs::world::World;
use crate::expr::condition::Condition;
use crate::expr::context::{EffectContext, Subject};
use serde::{Deserialize, Serialize};
use tracing::debug;

fn default_one() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

/// A serializable mutation tree
///
/// Leaves whose subject does not resolve to a live entity do nothing.
/// Composites keep going after a skipped leaf; nothing is rolled back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    SetStat {
        stat: ContentKey,
        value: f32,
        #[serde(default)]
        on: Subject,
    },
    ModifyStat {
        stat: ContentKey,
        delta: f32,
        #[serde(default)]
        on: Subject,
    },
    AddTag {
        tag: ContentKey,
        #[serde(default)]
        on: Subject,
    },
    RemoveTag {
        tag: ContentKey,
        #[serde(default)]
        on: Subject,
    },
    SetFlag {
        flag: ContentKey,
        #[serde(default)]
        on: Subject,
    },
    ClearFlag {
        flag: ContentKey,
        #[serde(default)]
        on: Subject,
    },
    SetCounter {
        counter: ContentKey,
        value: i64,
        #[serde(default)]
        on: Subject,
    },
    IncrementCounter {
        counter: ContentKey,
        #[serde(default = "default_one")]
        amount: i64,
        #[serde(default)]
        on: Subject,
    },
    AddItem {
        item: ContentKey,
        quantity: u32,
        #[serde(default)]
        on: Subject,
    },
    RemoveItem {
        item: ContentKey,
        quantity: u32,
        #[serde(default)]
        on: Subject,
    },
    SetValue {
        key: ContentKey,
        value: Value,
        #[serde(default)]
        on: Subject,
    },
    ClearValue {
        key: ContentKey,
        #[serde(default)]
        on: Subject,
    },
    /// Owner is the resolved subject
    StartTimer {
        key: ContentKey,
        duration: f64,
        #[serde(default)]
        repeating: bool,
        #[serde(default)]
        effects: Vec<Effect>,
        #[serde(default)]
        on: Subject,
    },
    CancelTimer {
        key: ContentKey,
        #[serde(default)]
        on: Subject,
    },
    /// Spawns on the resolved subject
    SpawnEvent {
        event: ContentKey,
        #[serde(default)]
        on: Subject,
    },
    /// Without an event key, advances the context's event instance
    AdvanceEvent {
        #[serde(default)]
        event: Option<ContentKey>,
    },
    EndEvent {
        #[serde(default)]
        event: Option<ContentKey>,
        #[serde(default = "default_true")]
        completed: bool,
    },
    Unlock {
        key: ContentKey,
    },
    Notify {
        message: String,
        #[serde(default)]
        key: Option<ContentKey>,
        #[serde(default)]
        on: Option<Subject>,
    },
    Sequence {
        #[serde(default)]
        effects: Vec<Effect>,
    },
    /// Evaluates `condition` once and applies exactly one branch
    Conditional {
        condition: Condition,
        #[serde(default)]
        then: Vec<Effect>,
        #[serde(default)]
        otherwise: Vec<Effect>,
    },
}

impl Effect {
    pub fn set_stat(stat: &str, value: f32) -> Self {
        Effect::SetStat {
            stat: ContentKey::new(stat),
            value,
            on: Subject::Actor,
        }
    }

    pub fn modify_stat(stat: &str, delta: f32) -> Self {
        Effect::ModifyStat {
            stat: ContentKey::new(stat),
            delta,
            on: Subject::Actor,
        }
    }

    pub fn add_tag(tag: &str) -> Self {
        Effect::AddTag {
            tag: ContentKey::new(tag),
            on: Subject::Actor,
        }
    }

    pub fn remove_tag(tag: &str) -> Self {
        Effect::RemoveTag {
            tag: ContentKey::new(tag),
            on: Subject::Actor,
        }
    }

    pub fn increment(counter: &str, amount: i64) -> Self {
        Effect::IncrementCounter {
            counter: ContentKey::new(counter),
            amount,
            on: Subject::Actor,
        }
    }

    pub fn add_item(item: &str, quantity: u32) -> Self {
        Effect::AddItem {
            item: ContentKey::new(item),
            quantity,
            on: Subject::Actor,
        }
    }

    pub fn notify(message: &str) -> Self {
        Effect::Notify {
            message: message.to_string(),
            key: None,
            on: None,
        }
    }

    /// Retarget a leaf at another subject. Other nodes are returned unchanged.
    pub fn on(mut self, subject: Subject) -> Self {
        match &mut self {
            Effect::SetStat { on, .. }
            | Effect::ModifyStat { on, .. }
            | Effect::AddTag { on, .. }
            | Effect::RemoveTag { on, .. }
            | Effect::SetFlag { on, .. }
            | Effect::ClearFlag { on, .. }
            | Effect::SetCounter { on, .. }
            | Effect::IncrementCounter { on, .. }
            | Effect::AddItem { on, .. }
            | Effect::RemoveItem { on, .. }
            | Effect::SetValue { on, .. }
            | Effect::ClearValue { on, .. }
            | Effect::StartTimer { on, .. }
            | Effect::CancelTimer { on, .. }
            | Effect::SpawnEvent { on, .. } => *on = subject,
            Effect::Notify { on, .. } => *on = Some(subject),
            _ => {}
        }
        self
    }

    pub fn apply(&self, world: &mut World, ctx: &EffectContext) {
        match self {
            Effect::SetStat { stat, value, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.set_stat(id, stat.clone(), *value);
                }
            }
            Effect::ModifyStat { stat, delta, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.modify_stat(id, stat.clone(), *delta);
                }
            }
            Effect::AddTag { tag, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.add_tag(id, tag.clone());
                }
            }
            Effect::RemoveTag { tag, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.remove_tag(id, tag.clone());
                }
            }
            Effect::SetFlag { flag, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.set_flag(id, flag.clone(), true);
                }
            }
            Effect::ClearFlag { flag, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.set_flag(id, flag.clone(), false);
                }
            }
            Effect::SetCounter { counter, value, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.set_counter(id, counter.clone(), *value);
                }
            }
            Effect::IncrementCounter { counter, amount, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.increment_counter(id, counter.clone(), *amount);
                }
            }
            Effect::AddItem { item, quantity, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.add_item(id, item.clone(), *quantity);
                }
            }
            Effect::RemoveItem { item, quantity, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.remove_item(id, item.clone(), *quantity);
                }
            }
            Effect::SetValue { key, value, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.set_value(id, key.clone(), value.clone());
                }
            }
            Effect::ClearValue { key, on } => {
                if let Some(id) = ctx.resolve(on) {
                    world.clear_value(id, key.as_str());
                }
            }
            Effect::StartTimer {
                key,
                duration,
                repeating,
                effects,
                on,
            } => {
                if let Some(owner) = ctx.resolve(on).filter(|id| world.entities().contains(*id)) {
                    world.start_timer(key.clone(), owner, *duration, *repeating, effects.clone());
                }
            }
            Effect::CancelTimer { key, on } => {
                if let Some(owner) = ctx.resolve(on) {
                    world.cancel_timer(key.as_str(), owner);
                }
            }
            Effect::SpawnEvent { event, on } => {
                if let Some(target) = ctx.resolve(on) {
                    if let Err(rejection) = world.spawn_event(event.as_str(), target, Default::default()) {
                        debug!(target: "sim_kernel::events", "spawn of '{}' skipped: {}", event, rejection);
                    }
                }
            }
            Effect::AdvanceEvent { event } => {
                for id in world.event_instances_for(event.as_ref(), ctx.event_instance) {
                    world.advance_stage(id);
                }
            }
            Effect::EndEvent { event, completed } => {
                for id in world.event_instances_for(event.as_ref(), ctx.event_instance) {
                    world.end_event(id, *completed);
                }
            }
            Effect::Unlock { key } => {
                world.unlock(key.clone());
            }
            Effect::Notify { message, key, on } => {
                let entity = on.as_ref().and_then(|subject| ctx.resolve(subject));
                world.notify(entity, key.clone(), message.clone());
            }
            Effect::Sequence { effects } => apply_all(effects, world, ctx),
            Effect::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if condition.evaluate(world, ctx) {
                    apply_all(then, world, ctx);
                } else {
                    apply_all(otherwise, world, ctx);
                }
            }
        }
    }
}

/// Apply effects strictly in list order
pub fn apply_all(effects: &[Effect], world: &mut World, ctx: &EffectContext) {
    for effect in effects {
        effect.apply(world, ctx);
    }
}
