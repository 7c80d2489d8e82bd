//! Integration tests for the action pipeline
//!
//! - Blocked actions leave the world untouched
//! - Costs are deducted before the action's own effects
//! - Cooldowns, handlers and custom validators

use std::cell::Cell;
use std::rc::Rc;

use sim_kernel::actions::{ActionContext, ActionHandler, ActionRejection, ActionValidator};
use sim_kernel::bus::SignalHost;
use sim_kernel::expr::Effect;
use sim_kernel::{
    ActionDef, ActionRequest, ActionResult, ArchetypeDef, EntityId, Signal, SignalKind, StatInit,
    Vec2, World,
};

fn world_with_mage() -> (World, EntityId) {
    let mut world = World::default();
    world
        .register_archetype(
            ArchetypeDef::new("mage")
                .with_stat(StatInit::new("mana", 3.0).with_bounds(0.0, 10.0))
                .with_stat(StatInit::new("hp", 50.0).with_bounds(0.0, 100.0))
                .with_tag("caster"),
        )
        .unwrap();
    world
        .register_action(
            ActionDef::new("fireball")
                .requires_target()
                .with_cost("mana", 5.0)
                .with_effect(Effect::modify_stat("hp", -20.0).on(sim_kernel::Subject::Target)),
        )
        .unwrap();
    let mage = world.spawn_entity(Some("mage")).unwrap();
    (world, mage)
}

fn count_signals(world: &mut World, kind: SignalKind) -> Rc<Cell<u32>> {
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    world.subscribe(kind, move |_s: &Signal, _w: &mut World| c.set(c.get() + 1));
    count
}

#[test]
fn test_insufficient_cost_blocks_without_mutation() {
    let (mut world, mage) = world_with_mage();
    let target = world.spawn_entity(Some("mage")).unwrap();
    let completed = count_signals(&mut world, SignalKind::ActionCompleted);
    let stat_changes = count_signals(&mut world, SignalKind::StatChanged);
    let before = world.create_snapshot();

    let response = world.process_action(ActionRequest::new(mage, "fireball").with_target(target));

    assert_eq!(response.result, ActionResult::Blocked);
    let reason = response.block_reason.unwrap();
    assert!(reason.contains("mana"), "reason was {:?}", reason);
    assert!(response.effects.is_empty());

    assert_eq!(world.entities().stat(mage, "mana"), Some(3.0));
    assert_eq!(world.entities().stat(target, "hp"), Some(50.0));
    assert_eq!(completed.get(), 0);
    assert_eq!(stat_changes.get(), 0);
    assert_eq!(
        world.create_snapshot().entities.entities,
        before.entities.entities
    );
}

#[test]
fn test_success_deducts_cost_then_applies() {
    let (mut world, mage) = world_with_mage();
    let target = world.spawn_entity(Some("mage")).unwrap();
    world.set_stat(mage, "mana", 10.0);
    let completed = count_signals(&mut world, SignalKind::ActionCompleted);

    let response = world.process_action(ActionRequest::new(mage, "fireball").with_target(target));

    assert!(response.is_success());
    assert_eq!(response.effects.len(), 2);
    assert_eq!(world.entities().stat(mage, "mana"), Some(5.0));
    assert_eq!(world.entities().stat(target, "hp"), Some(30.0));
    assert_eq!(completed.get(), 1);
}

#[test]
fn test_missing_target_and_unknown_action() {
    let (mut world, mage) = world_with_mage();
    world.set_stat(mage, "mana", 10.0);
    let blocked = count_signals(&mut world, SignalKind::ActionBlocked);

    let response = world.process_action(ActionRequest::new(mage, "fireball"));
    assert_eq!(response.result, ActionResult::Blocked);
    assert_eq!(blocked.get(), 1);

    let response = world.process_action(ActionRequest::new(mage, "teleport"));
    assert_eq!(response.result, ActionResult::Failed);
    assert_eq!(blocked.get(), 1, "unknown actions are failures, not blocks");

    let response =
        world.process_action(ActionRequest::new(mage, "fireball").with_target(EntityId(777)));
    assert_eq!(response.result, ActionResult::Blocked);
    assert_eq!(world.entities().stat(mage, "mana"), Some(10.0));
}

#[test]
fn test_cooldown_blocks_until_elapsed() {
    let (mut world, mage) = world_with_mage();
    world
        .register_action(
            ActionDef::new("meditate")
                .with_cooldown(2.0)
                .with_effect(Effect::modify_stat("mana", 1.0)),
        )
        .unwrap();

    assert!(world.process_action(ActionRequest::new(mage, "meditate")).is_success());
    assert!(matches!(
        world.can_perform_action(&ActionRequest::new(mage, "meditate")),
        Err(ActionRejection::OnCooldown { .. })
    ));
    assert_eq!(
        world.process_action(ActionRequest::new(mage, "meditate")).result,
        ActionResult::Blocked
    );

    world.tick(1.0);
    assert!(world.cooldown_remaining(mage, "meditate") > 0.5);
    world.tick(1.0);
    assert!(world.can_perform_action(&ActionRequest::new(mage, "meditate")).is_ok());
    assert!(world.process_action(ActionRequest::new(mage, "meditate")).is_success());
    assert_eq!(world.entities().stat(mage, "mana"), Some(5.0));
}

#[test]
fn test_range_uses_spatial_positions() {
    let (mut world, mage) = world_with_mage();
    world
        .register_action(
            ActionDef::new("touch")
                .requires_target()
                .with_range(2.0)
                .with_effect(Effect::add_tag("touched").on(sim_kernel::Subject::Target)),
        )
        .unwrap();
    let other = world.spawn_entity(None).unwrap();

    // No positions yet
    let request = ActionRequest::new(mage, "touch").with_target(other);
    assert!(world.can_perform_action(&request).is_err());

    world.move_entity(mage, Vec2::new(0.0, 0.0));
    world.move_entity(other, Vec2::new(5.0, 0.0));
    assert!(world.can_perform_action(&request).is_err());

    world.move_entity(other, Vec2::new(1.5, 0.0));
    assert!(world.process_action(request).is_success());
    assert!(world.entities().has_tag(other, "touched"));
}

struct NoCastersAtNight;

impl ActionValidator for NoCastersAtNight {
    fn name(&self) -> &str {
        "no_casters_at_night"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn validate(&self, world: &World, _def: &ActionDef, request: &ActionRequest) -> Result<(), String> {
        if world.entities().has_tag(request.actor, "caster") && world.entities().has_tag(request.actor, "night") {
            return Err("casters rest at night".to_string());
        }
        Ok(())
    }
}

struct DoubleDamage;

impl ActionHandler for DoubleDamage {
    fn can_handle(&self, action: &str) -> bool {
        action == "fireball"
    }

    fn resolve_effects(
        &self,
        _world: &World,
        def: &ActionDef,
        _request: &ActionRequest,
        context: &mut ActionContext,
    ) -> Vec<Effect> {
        context.set("doubled", true);
        let mut effects = def.effects.clone();
        effects.extend(def.effects.iter().cloned());
        effects
    }
}

#[test]
fn test_custom_validator_and_handler() {
    let (mut world, mage) = world_with_mage();
    let target = world.spawn_entity(Some("mage")).unwrap();
    world.set_stat(mage, "mana", 10.0);
    world.add_action_validator(Rc::new(NoCastersAtNight));
    world.add_action_handler(Rc::new(DoubleDamage));

    world.add_tag(mage, "night");
    let response = world.process_action(ActionRequest::new(mage, "fireball").with_target(target));
    assert_eq!(response.block_reason.as_deref(), Some("casters rest at night"));

    world.remove_tag(mage, "night");
    let response = world.process_action(ActionRequest::new(mage, "fireball").with_target(target));
    assert!(response.is_success());
    assert_eq!(response.context.get("doubled").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(world.entities().stat(target, "hp"), Some(10.0));
    assert!(world.bus().published_count() > 0);
}

#[test]
fn test_actor_destroyed_by_own_action_keeps_no_cooldown() {
    let (mut world, mage) = world_with_mage();
    world
        .register_action(
            ActionDef::new("overload")
                .with_cooldown(5.0)
                .with_effect(Effect::modify_stat("hp", -100.0)),
        )
        .unwrap();
    world.subscribe(SignalKind::StatChanged, |s: &Signal, w: &mut World| {
        if let Signal::StatChanged { entity, new, .. } = s {
            if *new <= 0.0 {
                w.destroy_entity(*entity);
            }
        }
    });

    assert!(world.process_action(ActionRequest::new(mage, "overload")).is_success());
    assert!(!world.entities().contains(mage));
    assert!(world.actions().cooldown_entries().is_empty());
}
