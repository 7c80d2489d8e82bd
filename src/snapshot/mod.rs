//! Complete runtime state of a world
//!
//! Definitions and subscriptions are not part of a snapshot; restore into a
//! world that has the same content registered. Spatial positions belong to
//! the host's index and are not captured.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actions::CooldownEntry;
use crate::core::error::Result;
use crate::core::types::{ContentKey, SimTime};
use crate::ecs::world::World;
use crate::entity::EntityStoreSnapshot;
use crate::inventory::InventorySnapshot;
use crate::rules::RuleState;
use crate::simulation::{EventSnapshot, ProgressionSnapshot, TimerSnapshot};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub now: SimTime,
    pub ticks: u64,
    pub entities: EntityStoreSnapshot,
    pub inventory: InventorySnapshot,
    pub timers: TimerSnapshot,
    pub events: EventSnapshot,
    pub progression: ProgressionSnapshot,
    pub rule_states: Vec<(ContentKey, RuleState)>,
    pub cooldowns: Vec<CooldownEntry>,
}

impl WorldSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

impl World {
    pub fn create_snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            now: self.now(),
            ticks: self.ticks,
            entities: self.entities.create_snapshot(),
            inventory: self.inventory.create_snapshot(),
            timers: self.timers.create_snapshot(),
            events: self.events.create_snapshot(),
            progression: self.progression.create_snapshot(),
            rule_states: self.rules.states(),
            cooldowns: self.actions.cooldown_entries(),
        }
    }

    /// Replace runtime state without publishing anything
    pub fn restore_from_snapshot(&mut self, snapshot: &WorldSnapshot) {
        self.clock.set_now(snapshot.now);
        self.ticks = snapshot.ticks;
        self.entities.restore_from_snapshot(&snapshot.entities);
        self.inventory.restore_from_snapshot(&snapshot.inventory);
        self.timers.restore_from_snapshot(&snapshot.timers);
        self.events.restore_from_snapshot(&snapshot.events);
        self.progression.restore_from_snapshot(&snapshot.progression);
        self.rules.restore_states(&snapshot.rule_states);
        self.actions.restore_cooldowns(&snapshot.cooldowns);
        debug!(
            target: "sim_kernel::snapshot",
            "restored {} entities at {}",
            snapshot.entities.entities.len(),
            snapshot.now
        );
    }
}
