//! Delayed and repeating effect batches
//!
//! A `(key, owner)` pair names at most one timer. Starting a timer for a
//! pair that already has one restarts it with the new parameters.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bus::Signal;
use crate::core::types::{ContentKey, EntityId, SimTime, TimerId};
use crate::ecs::world::World;
use crate::expr::{apply_all, Effect, EffectContext};

/// Shortest period a repeating timer may have
pub const MIN_REPEAT_SECONDS: f64 = 1e-3;

/// A scheduled batch of completion effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimTimer {
    pub id: TimerId,
    pub key: ContentKey,
    pub owner: EntityId,
    pub start: SimTime,
    pub end: SimTime,
    pub repeating: bool,
    pub effects: Rc<Vec<Effect>>,
    #[serde(default = "active_default")]
    pub active: bool,
}

fn active_default() -> bool {
    true
}

impl SimTimer {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn remaining(&self, now: SimTime) -> f64 {
        (self.end - now).max(0.0)
    }
}

/// What a fired timer hands back to the tick
pub(crate) struct FiredTimer {
    pub id: TimerId,
    pub key: ContentKey,
    pub owner: EntityId,
    pub effects: Rc<Vec<Effect>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub next_id: u64,
    pub timers: Vec<SimTimer>,
}

/// Flat list of live timers
#[derive(Debug)]
pub struct TimerManager {
    timers: Vec<SimTimer>,
    next_id: u64,
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerManager {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 1,
        }
    }

    /// Schedule a timer, replacing any live timer with the same key and owner
    pub fn start(
        &mut self,
        key: ContentKey,
        owner: EntityId,
        now: SimTime,
        duration: f64,
        repeating: bool,
        effects: Vec<Effect>,
    ) -> TimerId {
        let duration = if repeating {
            duration.max(MIN_REPEAT_SECONDS)
        } else {
            duration.max(0.0)
        };

        let before = self.timers.len();
        self.timers
            .retain(|t| !(t.active && t.owner == owner && t.key == key));
        if self.timers.len() != before {
            debug!(target: "sim_kernel::timers", "restarting timer '{}' for {}", key, owner);
        }

        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(SimTimer {
            id,
            key,
            owner,
            start: now,
            end: now + duration,
            repeating,
            effects: Rc::new(effects),
            active: true,
        });
        id
    }

    /// Remove the timer with this exact key and owner
    pub fn cancel(&mut self, key: &str, owner: EntityId) -> bool {
        let before = self.timers.len();
        self.timers
            .retain(|t| !(t.owner == owner && t.key.as_str() == key));
        self.timers.len() != before
    }

    /// Remove every timer owned by `owner`, returning how many were removed
    pub fn cancel_all_for_owner(&mut self, owner: EntityId) -> usize {
        let before = self.timers.len();
        self.timers.retain(|t| t.owner != owner);
        before - self.timers.len()
    }

    pub fn get(&self, id: TimerId) -> Option<&SimTimer> {
        self.timers.iter().find(|t| t.id == id && t.active)
    }

    pub fn find(&self, key: &str, owner: EntityId) -> Option<&SimTimer> {
        self.timers
            .iter()
            .find(|t| t.active && t.owner == owner && t.key.as_str() == key)
    }

    /// Seconds left on the `(key, owner)` timer
    pub fn remaining(&self, key: &str, owner: EntityId, now: SimTime) -> Option<f64> {
        self.find(key, owner).map(|t| t.remaining(now))
    }

    pub fn timers_for_owner(&self, owner: EntityId) -> Vec<&SimTimer> {
        self.timers
            .iter()
            .filter(|t| t.active && t.owner == owner)
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.timers.iter().filter(|t| t.active).count()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Ids of timers whose end time has been reached, in scheduling order
    pub(crate) fn due(&self, now: SimTime) -> Vec<TimerId> {
        self.timers
            .iter()
            .filter(|t| t.active && now.has_reached(t.end))
            .map(|t| t.id)
            .collect()
    }

    /// Roll a due timer forward or retire it
    pub(crate) fn fire(&mut self, id: TimerId) -> Option<FiredTimer> {
        let timer = self.timers.iter_mut().find(|t| t.id == id && t.active)?;
        if timer.repeating {
            let duration = timer.duration().max(MIN_REPEAT_SECONDS);
            timer.start = timer.end;
            timer.end = timer.start + duration;
        } else {
            timer.active = false;
        }
        Some(FiredTimer {
            id: timer.id,
            key: timer.key.clone(),
            owner: timer.owner,
            effects: Rc::clone(&timer.effects),
        })
    }

    pub(crate) fn prune(&mut self) {
        self.timers.retain(|t| t.active);
    }

    pub fn create_snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            next_id: self.next_id,
            timers: self.timers.iter().filter(|t| t.active).cloned().collect(),
        }
    }

    pub fn restore_from_snapshot(&mut self, snapshot: &TimerSnapshot) {
        self.timers = snapshot.timers.clone();
        let highest = self.timers.iter().map(|t| t.id.0).max().unwrap_or(0);
        self.next_id = snapshot.next_id.max(highest + 1);
    }
}

impl World {
    /// Start a timer owned by `owner`. A missing owner is a no-op.
    pub fn start_timer(
        &mut self,
        key: impl Into<ContentKey>,
        owner: EntityId,
        duration: f64,
        repeating: bool,
        effects: Vec<Effect>,
    ) -> Option<TimerId> {
        let key = key.into();
        if !key.is_valid() || !self.entities.contains(owner) {
            return None;
        }
        let now = self.now();
        Some(self.timers.start(key, owner, now, duration, repeating, effects))
    }

    pub fn cancel_timer(&mut self, key: &str, owner: EntityId) -> bool {
        self.timers.cancel(key, owner)
    }

    pub fn cancel_all_timers_for_owner(&mut self, owner: EntityId) -> usize {
        self.timers.cancel_all_for_owner(owner)
    }
}

/// Fire every due timer once, then prune retired ones
///
/// Due timers are collected before any effect runs; a timer cancelled by an
/// earlier completion in the same batch does not fire.
pub fn tick_timers(world: &mut World) {
    let now = world.now();
    let due = world.timers.due(now);
    for id in due {
        let Some(fired) = world.timers.fire(id) else {
            continue;
        };
        let ctx = EffectContext::for_actor(fired.owner);
        apply_all(&fired.effects, world, &ctx);
        world.publish(Signal::TimerCompleted {
            timer: fired.id,
            key: fired.key,
            owner: fired.owner,
        });
    }
    world.timers.prune();
}
