//! Entity store - owns every entity and the tag index
//!
//! The store is pure data. It reports what changed (stat old/new, whether a
//! tag was actually inserted) and leaves publishing signals to the world.

use crate::core::types::{ContentKey, EntityId};
use crate::core::value::Value;
use crate::entity::archetype::ArchetypeDef;
use crate::entity::record::Entity;
use crate::entity::stats::{StatChange, StatValue};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// Storage for all live entities
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: AHashMap<EntityId, Entity>,
    tag_index: AHashMap<ContentKey, AHashSet<EntityId>>,
    next_id: u64,
}

/// Deep copy of the store, sufficient to rebuild it exactly
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStoreSnapshot {
    pub next_id: u64,
    pub entities: Vec<Entity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            entities: AHashMap::new(),
            tag_index: AHashMap::new(),
            next_id: 1,
        }
    }

    /// Create an entity, optionally initialized from an archetype
    pub fn create(&mut self, archetype: Option<&ArchetypeDef>) -> EntityId {
        let id = EntityId(self.next_id.max(1));
        self.next_id = id.0 + 1;

        let mut entity = Entity::new(id, archetype.map(|a| a.key.clone()));
        if let Some(def) = archetype {
            for init in &def.stats {
                entity.stats.insert(init.stat.clone(), init.to_stat());
            }
            for tag in &def.tags {
                entity.tags.insert(tag.clone());
                self.tag_index.entry(tag.clone()).or_default().insert(id);
            }
            for flag in &def.flags {
                entity.flags.insert(flag.clone());
            }
            for (counter, value) in &def.counters {
                entity.counters.insert(counter.clone(), *value);
            }
        }

        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity and every index entry pointing at it
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        for tag in &entity.tags {
            if let Some(set) = self.tag_index.get_mut(tag) {
                set.remove(&id);
                if set.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All live ids in ascending order
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn stat(&self, id: EntityId, stat: &str) -> Option<f32> {
        self.entities.get(&id).and_then(|e| e.stat(stat))
    }

    /// Set a stat; a missing stat is created unbounded (old value 0)
    pub fn set_stat(&mut self, id: EntityId, stat: &ContentKey, value: f32) -> Option<StatChange> {
        let entity = self.entities.get_mut(&id)?;
        match entity.stats.get_mut(stat) {
            Some(existing) => existing.set(value),
            None => {
                let created = StatValue::unbounded(value);
                entity.stats.insert(stat.clone(), created);
                if created.value().abs() > crate::core::types::STAT_EPSILON {
                    Some(StatChange { old: 0.0, new: created.value() })
                } else {
                    None
                }
            }
        }
    }

    pub fn modify_stat(&mut self, id: EntityId, stat: &ContentKey, delta: f32) -> Option<StatChange> {
        let current = self.stat(id, stat.as_str()).unwrap_or(0.0);
        self.set_stat(id, stat, current + delta)
    }

    /// Returns true if the tag was newly added
    pub fn add_tag(&mut self, id: EntityId, tag: &ContentKey) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        if !entity.tags.insert(tag.clone()) {
            return false;
        }
        self.tag_index.entry(tag.clone()).or_default().insert(id);
        true
    }

    /// Returns true if the tag was present
    pub fn remove_tag(&mut self, id: EntityId, tag: &ContentKey) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        if !entity.tags.remove(tag) {
            return false;
        }
        if let Some(set) = self.tag_index.get_mut(tag) {
            set.remove(&id);
            if set.is_empty() {
                self.tag_index.remove(tag);
            }
        }
        true
    }

    pub fn has_tag(&self, id: EntityId, tag: &str) -> bool {
        self.entities.get(&id).is_some_and(|e| e.has_tag(tag))
    }

    /// Entities carrying `tag`, ascending by id
    pub fn entities_with_tag(&self, tag: &str) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .tag_index
            .get(tag)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Flags are silent: no change report
    pub fn set_flag(&mut self, id: EntityId, flag: &ContentKey, on: bool) {
        if let Some(entity) = self.entities.get_mut(&id) {
            if on {
                entity.flags.insert(flag.clone());
            } else {
                entity.flags.remove(flag);
            }
        }
    }

    pub fn set_counter(&mut self, id: EntityId, counter: &ContentKey, value: i64) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.counters.insert(counter.clone(), value);
        }
    }

    /// Returns the new counter value, or None if the entity is gone
    pub fn increment_counter(&mut self, id: EntityId, counter: &ContentKey, amount: i64) -> Option<i64> {
        let entity = self.entities.get_mut(&id)?;
        let slot = entity.counters.entry(counter.clone()).or_insert(0);
        *slot = slot.saturating_add(amount);
        Some(*slot)
    }

    pub fn set_value(&mut self, id: EntityId, key: &ContentKey, value: Value) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.scratch.insert(key.clone(), value);
        }
    }

    pub fn clear_value(&mut self, id: EntityId, key: &str) -> Option<Value> {
        self.entities.get_mut(&id).and_then(|e| e.scratch.remove(key))
    }

    pub fn value(&self, id: EntityId, key: &str) -> Option<&Value> {
        self.entities.get(&id).and_then(|e| e.value(key))
    }

    /// Drop every entity. The id counter keeps running so ids are not reused.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.tag_index.clear();
    }

    pub fn create_snapshot(&self) -> EntityStoreSnapshot {
        let mut entities: Vec<Entity> = self.entities.values().cloned().collect();
        entities.sort_by_key(|e| e.id());
        EntityStoreSnapshot {
            next_id: self.next_id,
            entities,
        }
    }

    pub fn restore_from_snapshot(&mut self, snapshot: &EntityStoreSnapshot) {
        self.clear();
        for entity in &snapshot.entities {
            for tag in &entity.tags {
                self.tag_index.entry(tag.clone()).or_default().insert(entity.id());
            }
            self.entities.insert(entity.id(), entity.clone());
        }
        let highest = snapshot.entities.iter().map(|e| e.id().0).max().unwrap_or(0);
        self.next_id = snapshot.next_id.max(highest + 1);
    }
}
