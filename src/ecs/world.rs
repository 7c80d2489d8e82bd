//! ECS World - owns every table and is the single mutation surface
//!
//! Entity writes go through the world so that stat, tag, inventory and
//! area changes publish their signals. Flags, counters and scratch values
//! change silently.

use std::rc::Rc;

use ahash::AHashMap;
use tracing::warn;

use crate::actions::ActionPipeline;
use crate::bus::{self, EventBus, Signal, SignalHandler, SignalHost, SignalKind, SubscriptionId};
use crate::core::calendar::Clock;
use crate::core::config::KernelConfig;
use crate::core::error::{KernelError, Result};
use crate::core::types::{ContentKey, EntityId, SimTime, Vec2};
use crate::core::value::Value;
use crate::entity::{ArchetypeDef, EntityStore};
use crate::inventory::InventoryManager;
use crate::rules::RuleEngine;
use crate::simulation::{EventManager, Progression, TickHooks, TimerManager};
use crate::spatial::{AreaTransition, GridSpatialIndex, SpatialIndex};

/// The simulation world containing all entities and managers
pub struct World {
    pub(crate) config: KernelConfig,
    pub(crate) clock: Clock,
    pub(crate) ticks: u64,
    pub(crate) entities: EntityStore,
    pub(crate) archetypes: AHashMap<ContentKey, Rc<ArchetypeDef>>,
    pub(crate) inventory: InventoryManager,
    pub(crate) spatial: Box<dyn SpatialIndex>,
    pub(crate) bus: EventBus<World>,
    pub(crate) actions: ActionPipeline,
    pub(crate) rules: RuleEngine,
    pub(crate) timers: TimerManager,
    pub(crate) events: EventManager,
    pub(crate) progression: Progression,
    pub(crate) hooks: TickHooks,
    pub(crate) rule_subscriptions: Vec<(SignalKind, SubscriptionId)>,
}

impl SignalHost for World {
    fn bus(&self) -> &EventBus<Self> {
        &self.bus
    }

    fn bus_mut(&mut self) -> &mut EventBus<Self> {
        &mut self.bus
    }
}

impl World {
    /// A world using the bundled grid index, with rule triggers installed
    pub fn new(config: KernelConfig) -> Self {
        let spatial = Box::new(GridSpatialIndex::new(config.spatial.cell_size));
        Self::with_spatial_index(config, spatial)
    }

    /// A world using a host-provided spatial index
    pub fn with_spatial_index(config: KernelConfig, spatial: Box<dyn SpatialIndex>) -> Self {
        let mut world = Self {
            clock: Clock::new(&config.calendar),
            ticks: 0,
            entities: EntityStore::new(),
            archetypes: AHashMap::new(),
            inventory: InventoryManager::new(),
            spatial,
            bus: EventBus::new(&config.bus),
            actions: ActionPipeline::new(),
            rules: RuleEngine::new(&config.rules),
            timers: TimerManager::new(),
            events: EventManager::new(),
            progression: Progression::new(),
            hooks: TickHooks::default(),
            rule_subscriptions: Vec::new(),
            config,
        };
        world.install_rule_triggers();
        world
    }

    // -- Read access --

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Ticks run since creation
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn inventory(&self) -> &InventoryManager {
        &self.inventory
    }

    pub fn spatial(&self) -> &dyn SpatialIndex {
        self.spatial.as_ref()
    }

    pub fn actions(&self) -> &ActionPipeline {
        &self.actions
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleEngine {
        &mut self.rules
    }

    pub fn timers(&self) -> &TimerManager {
        &self.timers
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    pub fn archetype(&self, key: &str) -> Option<&Rc<ArchetypeDef>> {
        self.archetypes.get(key)
    }

    // -- Bus --

    pub fn subscribe<F>(&mut self, kind: SignalKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Signal, &mut World) + 'static,
    {
        self.bus.subscribe(kind, Rc::new(handler))
    }

    /// Subscribe a shared handler; subscribing the same one twice delivers twice
    pub fn subscribe_handler(&mut self, kind: SignalKind, handler: SignalHandler<World>) -> SubscriptionId {
        self.bus.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, kind: SignalKind, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(kind, id)
    }

    /// Drop every subscription, rule triggers included
    pub fn clear_subscriptions(&mut self) {
        self.bus.clear();
        self.rule_subscriptions.clear();
    }

    pub fn publish(&mut self, signal: Signal) {
        bus::publish(self, signal);
    }

    // -- Definitions --

    pub fn register_archetype(&mut self, def: ArchetypeDef) -> Result<()> {
        if !def.key.is_valid() {
            warn!(target: "sim_kernel::content", "ignoring archetype with empty key");
            return Err(KernelError::InvalidKey(def.key.to_string()));
        }
        self.archetypes.insert(def.key.clone(), Rc::new(def));
        Ok(())
    }

    // -- Entity lifecycle --

    /// Create an entity, bare or from a registered archetype
    pub fn spawn_entity(&mut self, archetype: Option<&str>) -> Result<EntityId> {
        let def = match archetype {
            Some(key) => Some(
                self.archetypes
                    .get(key)
                    .cloned()
                    .ok_or_else(|| KernelError::UnknownArchetype(ContentKey::new(key)))?,
            ),
            None => None,
        };
        let id = self.entities.create(def.as_deref());
        self.publish(Signal::EntityCreated { entity: id });
        Ok(id)
    }

    /// Remove an entity and everything that refers to it
    ///
    /// Events targeting it end as cancelled while it still exists, then its
    /// inventory, position, cooldowns and timers go.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        if !self.entities.contains(id) {
            return false;
        }
        for instance in self.events_targeting(id) {
            self.end_event(instance, false);
        }

        self.entities.remove(id);
        self.inventory.remove_owner(id);
        self.spatial.remove(id);
        self.actions.remove_actor(id);
        self.timers.cancel_all_for_owner(id);

        self.publish(Signal::EntityDestroyed { entity: id });
        true
    }

    // -- Entity state --

    /// Returns true if the value changed
    pub fn set_stat(&mut self, id: EntityId, stat: impl Into<ContentKey>, value: f32) -> bool {
        let stat = stat.into();
        match self.entities.set_stat(id, &stat, value) {
            Some(change) => {
                self.publish(Signal::StatChanged {
                    entity: id,
                    stat,
                    old: change.old,
                    new: change.new,
                });
                true
            }
            None => false,
        }
    }

    pub fn modify_stat(&mut self, id: EntityId, stat: impl Into<ContentKey>, delta: f32) -> bool {
        let stat = stat.into();
        match self.entities.modify_stat(id, &stat, delta) {
            Some(change) => {
                self.publish(Signal::StatChanged {
                    entity: id,
                    stat,
                    old: change.old,
                    new: change.new,
                });
                true
            }
            None => false,
        }
    }

    pub fn add_tag(&mut self, id: EntityId, tag: impl Into<ContentKey>) -> bool {
        let tag = tag.into();
        let added = self.entities.add_tag(id, &tag);
        if added {
            self.publish(Signal::TagAdded { entity: id, tag });
        }
        added
    }

    pub fn remove_tag(&mut self, id: EntityId, tag: impl Into<ContentKey>) -> bool {
        let tag = tag.into();
        let removed = self.entities.remove_tag(id, &tag);
        if removed {
            self.publish(Signal::TagRemoved { entity: id, tag });
        }
        removed
    }

    pub fn set_flag(&mut self, id: EntityId, flag: impl Into<ContentKey>, on: bool) {
        self.entities.set_flag(id, &flag.into(), on);
    }

    pub fn set_counter(&mut self, id: EntityId, counter: impl Into<ContentKey>, value: i64) {
        self.entities.set_counter(id, &counter.into(), value);
    }

    pub fn increment_counter(&mut self, id: EntityId, counter: impl Into<ContentKey>, amount: i64) -> Option<i64> {
        self.entities.increment_counter(id, &counter.into(), amount)
    }

    pub fn set_value(&mut self, id: EntityId, key: impl Into<ContentKey>, value: Value) {
        self.entities.set_value(id, &key.into(), value);
    }

    pub fn clear_value(&mut self, id: EntityId, key: &str) -> Option<Value> {
        self.entities.clear_value(id, key)
    }

    // -- Inventory --

    /// Returns the quantity actually added
    pub fn add_item(&mut self, id: EntityId, item: impl Into<ContentKey>, quantity: u32) -> u32 {
        if !self.entities.contains(id) {
            return 0;
        }
        let item = item.into();
        match self.inventory.add(id, &item, quantity) {
            Some(change) => {
                self.publish(Signal::InventoryChanged {
                    entity: id,
                    item,
                    old: change.old,
                    new: change.new,
                });
                change.new - change.old
            }
            None => 0,
        }
    }

    /// Returns the quantity actually removed
    pub fn remove_item(&mut self, id: EntityId, item: impl Into<ContentKey>, quantity: u32) -> u32 {
        if !self.entities.contains(id) {
            return 0;
        }
        let item = item.into();
        match self.inventory.remove(id, &item, quantity) {
            Some(change) => {
                self.publish(Signal::InventoryChanged {
                    entity: id,
                    item,
                    old: change.old,
                    new: change.new,
                });
                change.old - change.new
            }
            None => 0,
        }
    }

    pub fn set_item_capacity(&mut self, id: EntityId, item: impl Into<ContentKey>, capacity: Option<u32>) {
        if self.entities.contains(id) {
            self.inventory.set_capacity(id, &item.into(), capacity);
        }
    }

    // -- Spatial --

    /// Update the index and publish one signal per area crossed
    pub fn move_entity(&mut self, id: EntityId, position: Vec2) {
        if !self.entities.contains(id) {
            return;
        }
        for transition in self.spatial.set_position(id, position) {
            let signal = match transition {
                AreaTransition::Entered(area) => Signal::AreaEntered { entity: id, area },
                AreaTransition::Exited(area) => Signal::AreaExited { entity: id, area },
            };
            self.publish(signal);
        }
    }

    // -- UI --

    pub fn notify(&mut self, entity: Option<EntityId>, key: Option<ContentKey>, message: String) {
        self.publish(Signal::Notification { entity, key, message });
    }

    // -- Reset --

    /// Clear runtime state; definitions, hooks and subscriptions survive
    pub fn reset(&mut self) {
        self.entities.clear();
        self.inventory.clear();
        self.spatial.clear();
        self.timers.clear();
        self.events.clear_instances();
        self.progression.clear();
        self.rules.reset_all_states();
        self.actions.clear_cooldowns();
        self.clock.set_now(SimTime::ZERO);
        self.ticks = 0;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("now", &self.clock.now())
            .field("entities", &self.entities.len())
            .field("timers", &self.timers.active_count())
            .field("events", &self.events.active_instances().count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::StatInit;
    use std::cell::RefCell;

    fn recorder(world: &mut World, kind: SignalKind) -> Rc<RefCell<Vec<Signal>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        world.subscribe(kind, move |signal, _| sink.borrow_mut().push(signal.clone()));
        seen
    }

    #[test]
    fn test_spawn_from_archetype() {
        let mut world = World::default();
        world
            .register_archetype(
                ArchetypeDef::new("wolf")
                    .with_stat(StatInit::new("hp", 30.0).with_bounds(0.0, 30.0))
                    .with_tag("beast"),
            )
            .unwrap();
        let created = recorder(&mut world, SignalKind::EntityCreated);

        let id = world.spawn_entity(Some("wolf")).unwrap();
        assert_eq!(world.entities().stat(id, "hp"), Some(30.0));
        assert!(world.entities().has_tag(id, "beast"));
        assert_eq!(created.borrow().len(), 1);

        assert!(matches!(
            world.spawn_entity(Some("dragon")),
            Err(KernelError::UnknownArchetype(_))
        ));
    }

    #[test]
    fn test_ids_never_reused() {
        let mut world = World::default();
        let a = world.spawn_entity(None).unwrap();
        world.destroy_entity(a);
        let b = world.spawn_entity(None).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_stat_signal_only_on_change() {
        let mut world = World::default();
        let id = world.spawn_entity(None).unwrap();
        let seen = recorder(&mut world, SignalKind::StatChanged);

        assert!(world.set_stat(id, "hp", 10.0));
        assert!(!world.set_stat(id, "hp", 10.00001));
        assert!(world.modify_stat(id, "hp", -3.0));
        assert_eq!(seen.borrow().len(), 2);
        assert!(!world.set_stat(EntityId(99), "hp", 1.0));
    }

    #[test]
    fn test_tag_signals_only_on_actual_change() {
        let mut world = World::default();
        let id = world.spawn_entity(None).unwrap();
        let added = recorder(&mut world, SignalKind::TagAdded);
        let removed = recorder(&mut world, SignalKind::TagRemoved);

        world.add_tag(id, "wet");
        world.add_tag(id, "wet");
        world.remove_tag(id, "wet");
        world.remove_tag(id, "wet");
        assert_eq!(added.borrow().len(), 1);
        assert_eq!(removed.borrow().len(), 1);
    }

    #[test]
    fn test_flags_and_counters_are_silent() {
        let mut world = World::default();
        let id = world.spawn_entity(None).unwrap();
        let published = world.bus().published_count();
        world.set_flag(id, "seen", true);
        world.set_counter(id, "kills", 2);
        world.increment_counter(id, "kills", 1);
        assert_eq!(world.bus().published_count(), published);
        assert_eq!(world.entities().get(id).unwrap().counter("kills"), 3);
    }

    #[test]
    fn test_inventory_signals() {
        let mut world = World::default();
        let id = world.spawn_entity(None).unwrap();
        let seen = recorder(&mut world, SignalKind::InventoryChanged);

        world.set_item_capacity(id, "wood", Some(5));
        assert_eq!(world.add_item(id, "wood", 8), 5);
        assert_eq!(world.remove_item(id, "wood", 9), 5);
        assert_eq!(world.remove_item(id, "wood", 1), 0);
        assert_eq!(world.add_item(EntityId(77), "wood", 1), 0);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_area_signals() {
        let mut grid = GridSpatialIndex::new(10.0);
        grid.define_area(
            "camp",
            crate::spatial::AreaShape::Circle {
                center: Vec2::new(0.0, 0.0),
                radius: 5.0,
            },
        );
        let mut world = World::with_spatial_index(KernelConfig::default(), Box::new(grid));
        let id = world.spawn_entity(None).unwrap();
        let entered = recorder(&mut world, SignalKind::AreaEntered);
        let exited = recorder(&mut world, SignalKind::AreaExited);

        world.move_entity(id, Vec2::new(1.0, 1.0));
        world.move_entity(id, Vec2::new(2.0, 1.0));
        world.move_entity(id, Vec2::new(50.0, 1.0));
        assert_eq!(entered.borrow().len(), 1);
        assert_eq!(exited.borrow().len(), 1);
        assert!(!world.spatial().is_in_area(id, "camp"));
    }

    #[test]
    fn test_reset_keeps_definitions_and_subscriptions() {
        let mut world = World::default();
        world.register_archetype(ArchetypeDef::new("wolf")).unwrap();
        let created = recorder(&mut world, SignalKind::EntityCreated);
        let id = world.spawn_entity(Some("wolf")).unwrap();
        world.unlock("forge");
        world.tick(3.0);

        world.reset();
        assert!(!world.entities().contains(id));
        assert!(!world.progression().is_unlocked("forge"));
        assert_eq!(world.now(), SimTime::ZERO);

        world.spawn_entity(Some("wolf")).unwrap();
        assert_eq!(created.borrow().len(), 2);
    }
}
