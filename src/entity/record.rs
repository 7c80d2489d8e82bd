//! Per-entity data: stats, tags, flags, counters and a typed scratch store

use crate::core::types::{ContentKey, EntityId};
use crate::core::value::Value;
use crate::entity::stats::StatValue;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// A simulation actor or object
///
/// Tags are transient markers that produce change signals, flags are
/// persistent and silent. Mutation goes through `EntityStore` (and the
/// world for signals) so the tag index stays consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    archetype: Option<ContentKey>,
    pub(crate) stats: AHashMap<ContentKey, StatValue>,
    pub(crate) tags: AHashSet<ContentKey>,
    pub(crate) flags: AHashSet<ContentKey>,
    pub(crate) counters: AHashMap<ContentKey, i64>,
    pub(crate) scratch: AHashMap<ContentKey, Value>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, archetype: Option<ContentKey>) -> Self {
        Self {
            id,
            archetype,
            stats: AHashMap::new(),
            tags: AHashSet::new(),
            flags: AHashSet::new(),
            counters: AHashMap::new(),
            scratch: AHashMap::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn archetype(&self) -> Option<&ContentKey> {
        self.archetype.as_ref()
    }

    pub fn stat(&self, key: &str) -> Option<f32> {
        self.stats.get(key).map(|s| s.value())
    }

    pub fn stat_value(&self, key: &str) -> Option<&StatValue> {
        self.stats.get(key)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Missing counters read as zero
    pub fn counter(&self, key: &str) -> i64 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.scratch.get(key)
    }

    pub fn tags(&self) -> impl Iterator<Item = &ContentKey> {
        self.tags.iter()
    }

    pub fn flags(&self) -> impl Iterator<Item = &ContentKey> {
        self.flags.iter()
    }

    pub fn stats(&self) -> impl Iterator<Item = (&ContentKey, &StatValue)> {
        self.stats.iter()
    }
}
