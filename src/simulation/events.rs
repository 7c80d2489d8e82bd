//! Multi-stage scripted events
//!
//! Instances only move forward through their stages or end. Auto-advance is
//! decided for every instance first and applied after the scan.
//!
//! An advance requested for an instance while it is already spawning or
//! advancing (from its own start, enter or exit effects) is deferred until the
//! running step has published its signal, so subscribers always see stages
//! in order.

use std::rc::Rc;

use ahash::AHashMap;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bus::Signal;
use crate::core::error::{KernelError, Result};
use crate::core::types::{ContentKey, EntityId, EventInstanceId, SimTime};
use crate::core::value::Value;
use crate::ecs::world::World;
use crate::expr::{all_pass, apply_all, Condition, Effect, EffectContext};

/// One step of an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageDef {
    pub name: String,
    #[serde(default)]
    pub enter_effects: Vec<Effect>,
    #[serde(default)]
    pub exit_effects: Vec<Effect>,
    /// Any one passing advances the stage
    #[serde(default)]
    pub advance_conditions: Vec<Condition>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Advancing into this stage ends the event as completed
    #[serde(default)]
    pub is_final: bool,
}

impl StageDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn with_enter(mut self, effect: Effect) -> Self {
        self.enter_effects.push(effect);
        self
    }

    pub fn with_exit(mut self, effect: Effect) -> Self {
        self.exit_effects.push(effect);
        self
    }

    pub fn advance_when(mut self, condition: Condition) -> Self {
        self.advance_conditions.push(condition);
        self
    }

    pub fn final_stage(mut self) -> Self {
        self.is_final = true;
        self
    }
}

/// Registered description of an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDef {
    pub key: ContentKey,
    /// At most one active instance at a time
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub spawn_conditions: Vec<Condition>,
    /// Added to the target while the instance is live
    #[serde(default)]
    pub target_tags: Vec<ContentKey>,
    #[serde(default)]
    pub start_effects: Vec<Effect>,
    #[serde(default)]
    pub end_effects: Vec<Effect>,
    #[serde(default)]
    pub stages: Vec<StageDef>,
}

impl EventDef {
    pub fn new(key: &str) -> Self {
        Self {
            key: ContentKey::new(key),
            ..Default::default()
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_stage(mut self, stage: StageDef) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_target_tag(mut self, tag: &str) -> Self {
        self.target_tags.push(ContentKey::new(tag));
        self
    }

    pub fn spawn_when(mut self, condition: Condition) -> Self {
        self.spawn_conditions.push(condition);
        self
    }

    pub fn on_start(mut self, effect: Effect) -> Self {
        self.start_effects.push(effect);
        self
    }

    pub fn on_end(mut self, effect: Effect) -> Self {
        self.end_effects.push(effect);
        self
    }
}

/// A live run of an [`EventDef`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInstance {
    pub id: EventInstanceId,
    pub event: ContentKey,
    pub target: EntityId,
    pub stage: usize,
    pub stage_started: SimTime,
    #[serde(default)]
    pub params: AHashMap<ContentKey, Value>,
    pub active: bool,
}

impl EventInstance {
    fn context(&self) -> EffectContext {
        EffectContext::for_actor(self.target)
            .with_target(Some(self.target))
            .with_event_instance(self.id)
    }
}

/// Why a spawn did not produce an instance
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SpawnRejection {
    #[display(fmt = "unknown event '{}'", _0)]
    UnknownEvent(ContentKey),
    #[display(fmt = "event '{}' is unique and already active", _0)]
    AlreadyActive(ContentKey),
    #[display(fmt = "spawn conditions for '{}' failed", _0)]
    ConditionsFailed(ContentKey),
    #[display(fmt = "target {} not found", _0)]
    TargetNotFound(EntityId),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub next_id: u64,
    pub instances: Vec<EventInstance>,
}

/// Event definitions and live instances
#[derive(Debug)]
pub struct EventManager {
    definitions: AHashMap<ContentKey, Rc<EventDef>>,
    instances: Vec<EventInstance>,
    next_id: u64,
    /// Instances mid-spawn or mid-advance, with the advances deferred for each
    in_progress: AHashMap<EventInstanceId, usize>,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    pub fn new() -> Self {
        Self {
            definitions: AHashMap::new(),
            instances: Vec::new(),
            next_id: 1,
            in_progress: AHashMap::new(),
        }
    }

    /// Register or replace a definition
    pub fn register(&mut self, def: EventDef) -> Result<()> {
        if !def.key.is_valid() {
            warn!(target: "sim_kernel::events", "ignoring event with empty key");
            return Err(KernelError::InvalidKey(def.key.to_string()));
        }
        if self.definitions.contains_key(&def.key) {
            warn!(target: "sim_kernel::events", "replacing event definition '{}'", def.key);
        }
        self.definitions.insert(def.key.clone(), Rc::new(def));
        Ok(())
    }

    pub fn definition(&self, key: &str) -> Option<&Rc<EventDef>> {
        self.definitions.get(key)
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    pub fn instance(&self, id: EventInstanceId) -> Option<&EventInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    pub fn active_instances(&self) -> impl Iterator<Item = &EventInstance> {
        self.instances.iter().filter(|i| i.active)
    }

    /// True if any instance of `event` is active
    pub fn is_active(&self, event: &str) -> bool {
        self.active_instances().any(|i| i.event.as_str() == event)
    }

    pub fn is_instance_active(&self, id: EventInstanceId) -> bool {
        self.instance(id).is_some_and(|i| i.active)
    }

    /// Seconds spent in the current stage
    pub fn stage_elapsed(&self, id: EventInstanceId, now: SimTime) -> Option<f64> {
        self.instance(id).map(|i| now - i.stage_started)
    }

    pub fn clear_instances(&mut self) {
        self.instances.clear();
        self.in_progress.clear();
    }

    fn instance_mut(&mut self, id: EventInstanceId) -> Option<&mut EventInstance> {
        self.instances.iter_mut().find(|i| i.id == id)
    }

    fn prune(&mut self) {
        self.instances.retain(|i| i.active);
    }

    pub fn create_snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            next_id: self.next_id,
            instances: self.active_instances().cloned().collect(),
        }
    }

    pub fn restore_from_snapshot(&mut self, snapshot: &EventSnapshot) {
        self.instances = snapshot.instances.clone();
        let highest = self.instances.iter().map(|i| i.id.0).max().unwrap_or(0);
        self.next_id = snapshot.next_id.max(highest + 1);
    }
}

impl World {
    pub fn register_event(&mut self, def: EventDef) -> Result<()> {
        self.events.register(def)
    }

    /// Start an instance of `key` on `target`
    pub fn spawn_event(
        &mut self,
        key: &str,
        target: EntityId,
        params: AHashMap<ContentKey, Value>,
    ) -> std::result::Result<EventInstanceId, SpawnRejection> {
        let Some(def) = self.events.definition(key).cloned() else {
            return Err(SpawnRejection::UnknownEvent(ContentKey::new(key)));
        };
        if def.unique && self.events.is_active(key) {
            debug!(target: "sim_kernel::events", "'{}' already active", key);
            return Err(SpawnRejection::AlreadyActive(def.key.clone()));
        }
        if !self.entities.contains(target) {
            return Err(SpawnRejection::TargetNotFound(target));
        }
        let probe = EffectContext::for_actor(target).with_target(Some(target));
        if !all_pass(&def.spawn_conditions, self, &probe) {
            debug!(target: "sim_kernel::events", "spawn conditions failed for '{}'", key);
            return Err(SpawnRejection::ConditionsFailed(def.key.clone()));
        }

        let id = EventInstanceId(self.events.next_id);
        self.events.next_id += 1;
        let instance = EventInstance {
            id,
            event: def.key.clone(),
            target,
            stage: 0,
            stage_started: self.now(),
            params,
            active: true,
        };
        let ctx = instance.context();
        self.events.instances.push(instance);
        self.events.in_progress.insert(id, 0);

        for tag in &def.target_tags {
            self.add_tag(target, tag.clone());
        }
        apply_all(&def.start_effects, self, &ctx);
        if let Some(first) = def.stages.first() {
            if self.events.is_instance_active(id) {
                apply_all(&first.enter_effects, self, &ctx);
            }
        }

        self.publish(Signal::EventStarted {
            instance: id,
            event: def.key.clone(),
            target,
        });

        if def.stages.is_empty() {
            self.end_event(id, true);
        }
        self.run_deferred_advances(id);
        Ok(id)
    }

    /// Exit the current stage and enter the next, ending the event when it
    /// runs past the last stage or enters a final one
    pub fn advance_stage(&mut self, id: EventInstanceId) {
        if let Some(deferred) = self.events.in_progress.get_mut(&id) {
            *deferred += 1;
            return;
        }
        self.events.in_progress.insert(id, 0);
        self.advance_stage_once(id);
        self.run_deferred_advances(id);
    }

    fn run_deferred_advances(&mut self, id: EventInstanceId) {
        while let Some(deferred) = self.events.in_progress.get_mut(&id) {
            if *deferred == 0 {
                break;
            }
            *deferred -= 1;
            self.advance_stage_once(id);
        }
        self.events.in_progress.remove(&id);
    }

    fn advance_stage_once(&mut self, id: EventInstanceId) {
        let Some(instance) = self.events.instance(id).filter(|i| i.active) else {
            return;
        };
        let ctx = instance.context();
        let current = instance.stage;
        let Some(def) = self.events.definition(instance.event.as_str()).cloned() else {
            return;
        };

        if let Some(stage) = def.stages.get(current) {
            apply_all(&stage.exit_effects, self, &ctx);
        }

        let now = self.now();
        let Some(instance) = self.events.instance_mut(id).filter(|i| i.active) else {
            return;
        };
        let next = current + 1;
        instance.stage = next;
        instance.stage_started = now;
        let target = instance.target;

        match def.stages.get(next) {
            Some(stage) if !stage.is_final => {
                apply_all(&stage.enter_effects, self, &ctx);
                if !self.events.is_instance_active(id) {
                    return;
                }
                self.publish(Signal::EventStageChanged {
                    instance: id,
                    event: def.key.clone(),
                    target,
                    stage: next,
                });
            }
            _ => self.end_event(id, true),
        }
    }

    /// End an instance. Ending an inactive or unknown instance does nothing.
    pub fn end_event(&mut self, id: EventInstanceId, completed: bool) {
        let Some(instance) = self.events.instance_mut(id).filter(|i| i.active) else {
            return;
        };
        instance.active = false;
        let ctx = instance.context();
        let stage = instance.stage;
        let target = instance.target;
        let event = instance.event.clone();

        if let Some(def) = self.events.definition(event.as_str()).cloned() {
            if let Some(current) = def.stages.get(stage) {
                apply_all(&current.exit_effects, self, &ctx);
            }
            apply_all(&def.end_effects, self, &ctx);
            for tag in &def.target_tags {
                self.remove_tag(target, tag.clone());
            }
        }

        self.publish(Signal::EventEnded {
            instance: id,
            event,
            target,
            completed,
        });
    }

    /// Instances an advance/end effect applies to: every active instance of
    /// `event`, or the context instance when no key is given
    pub(crate) fn event_instances_for(
        &self,
        event: Option<&ContentKey>,
        context_instance: Option<EventInstanceId>,
    ) -> Vec<EventInstanceId> {
        match event {
            Some(key) => self
                .events
                .active_instances()
                .filter(|i| i.event == *key)
                .map(|i| i.id)
                .collect(),
            None => context_instance
                .filter(|id| self.events.is_instance_active(*id))
                .into_iter()
                .collect(),
        }
    }

    /// Active instances targeting `entity`
    pub fn events_targeting(&self, entity: EntityId) -> Vec<EventInstanceId> {
        self.events
            .active_instances()
            .filter(|i| i.target == entity)
            .map(|i| i.id)
            .collect()
    }
}

/// Queue stage advances for elapsed durations and passing conditions, then
/// apply them and drop finished instances
pub fn tick_events(world: &mut World) {
    let now = world.now();
    let mut queued = Vec::new();
    {
        let world: &World = world;
        for instance in world.events.active_instances() {
            let Some(def) = world.events.definition(instance.event.as_str()) else {
                continue;
            };
            let Some(stage) = def.stages.get(instance.stage) else {
                continue;
            };
            let timed_out = stage
                .duration_seconds
                .is_some_and(|d| now.has_reached(instance.stage_started + d));
            let ctx = instance.context();
            if timed_out || stage.advance_conditions.iter().any(|c| c.evaluate(world, &ctx)) {
                queued.push(instance.id);
            }
        }
    }
    for id in queued {
        world.advance_stage(id);
    }
    world.events.prune();
}
