//! Entity archetype definitions used to initialize new entities

use crate::core::types::ContentKey;
use crate::entity::stats::StatValue;
use serde::{Deserialize, Serialize};

/// Initial stat with its clamp bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatInit {
    pub stat: ContentKey,
    pub value: f32,
    #[serde(default)]
    pub min: Option<f32>,
    #[serde(default)]
    pub max: Option<f32>,
}

impl StatInit {
    pub fn new(stat: &str, value: f32) -> Self {
        Self {
            stat: ContentKey::new(stat),
            value,
            min: None,
            max: None,
        }
    }

    pub fn with_bounds(mut self, min: f32, max: f32) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn to_stat(&self) -> StatValue {
        StatValue::bounded(self.value, self.min, self.max)
    }
}

/// Template an entity is created from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeDef {
    pub key: ContentKey,
    #[serde(default)]
    pub stats: Vec<StatInit>,
    #[serde(default)]
    pub tags: Vec<ContentKey>,
    #[serde(default)]
    pub flags: Vec<ContentKey>,
    #[serde(default)]
    pub counters: Vec<(ContentKey, i64)>,
}

impl ArchetypeDef {
    pub fn new(key: &str) -> Self {
        Self {
            key: ContentKey::new(key),
            ..Default::default()
        }
    }

    pub fn with_stat(mut self, stat: StatInit) -> Self {
        self.stats.push(stat);
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(ContentKey::new(tag));
        self
    }

    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flags.push(ContentKey::new(flag));
        self
    }

    pub fn with_counter(mut self, counter: &str, value: i64) -> Self {
        self.counters.push((ContentKey::new(counter), value));
        self
    }
}
