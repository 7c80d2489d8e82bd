//! Load definition tables from TOML or JSON content files

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::actions::ActionDef;
use crate::core::error::Result;
use crate::ecs::world::World;
use crate::entity::ArchetypeDef;
use crate::rules::RuleDef;
use crate::simulation::EventDef;

/// Every definition a content file can carry
///
/// In TOML each table is an array of tables: `[[archetypes]]`, `[[actions]]`,
/// `[[rules]]`, `[[events]]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPack {
    pub archetypes: Vec<ArchetypeDef>,
    pub actions: Vec<ActionDef>,
    pub rules: Vec<RuleDef>,
    pub events: Vec<EventDef>,
}

impl ContentPack {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// `.json` files parse as JSON, everything else as TOML
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    /// Append another pack's definitions after this one's
    pub fn merge(&mut self, other: ContentPack) {
        self.archetypes.extend(other.archetypes);
        self.actions.extend(other.actions);
        self.rules.extend(other.rules);
        self.events.extend(other.events);
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
            && self.actions.is_empty()
            && self.rules.is_empty()
            && self.events.is_empty()
    }
}

/// What `World::load_content` registered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentReport {
    pub archetypes: usize,
    pub actions: usize,
    pub rules: usize,
    pub events: usize,
    /// One line per definition that was refused
    pub rejected: Vec<String>,
}

impl ContentReport {
    pub fn registered(&self) -> usize {
        self.archetypes + self.actions + self.rules + self.events
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl World {
    /// Register a pack; refused definitions are reported, not fatal
    pub fn load_content(&mut self, pack: ContentPack) -> ContentReport {
        let mut report = ContentReport::default();

        for def in pack.archetypes {
            let key = def.key.clone();
            match self.register_archetype(def) {
                Ok(()) => report.archetypes += 1,
                Err(e) => report.rejected.push(format!("archetype '{}': {}", key, e)),
            }
        }
        for def in pack.actions {
            let key = def.key.clone();
            match self.register_action(def) {
                Ok(()) => report.actions += 1,
                Err(e) => report.rejected.push(format!("action '{}': {}", key, e)),
            }
        }
        for def in pack.rules {
            let key = def.key.clone();
            match self.register_rule(def) {
                Ok(()) => report.rules += 1,
                Err(e) => report.rejected.push(format!("rule '{}': {}", key, e)),
            }
        }
        for def in pack.events {
            let key = def.key.clone();
            match self.register_event(def) {
                Ok(()) => report.events += 1,
                Err(e) => report.rejected.push(format!("event '{}': {}", key, e)),
            }
        }

        if report.is_clean() {
            info!(
                target: "sim_kernel::content",
                "loaded {} definitions",
                report.registered()
            );
        } else {
            warn!(
                target: "sim_kernel::content",
                "loaded {} definitions, {} rejected",
                report.registered(),
                report.rejected.len()
            );
        }
        report
    }

    pub fn load_content_file(&mut self, path: &Path) -> Result<ContentReport> {
        let pack = ContentPack::from_file(path)?;
        Ok(self.load_content(pack))
    }
}
