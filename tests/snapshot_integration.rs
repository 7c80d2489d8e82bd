//! Integration tests for save/restore and content-driven runs

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use ahash::AHashMap;
use sim_kernel::expr::Effect;
use sim_kernel::{
    ActionRequest, ContentPack, EventDef, Signal, SignalKind, StageDef, World, WorldSnapshot,
};

fn demo_world() -> World {
    let mut world = World::default();
    let report = world
        .load_content_file(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/content/demo.toml")))
        .unwrap();
    assert!(report.is_clean(), "{:?}", report.rejected);
    world
}

#[test]
fn test_demo_content_runs_to_completion() {
    let mut world = demo_world();
    let villager = world.spawn_entity(Some("villager")).unwrap();

    for _ in 0..200 {
        world.tick(0.1);
    }

    assert_eq!(world.entities().stat(villager, "hp"), Some(100.0));
    assert!(world.progression().is_unlocked("healer"));
    assert_eq!(world.timers().active_count(), 0);
    assert_eq!(world.inventory().quantity(villager, "grain"), 12);
    assert!(!world.events().is_active("harvest"));
    assert!(!world.entities().has_tag(villager, "farming"));
}

#[test]
fn test_snapshot_restores_in_flight_state() {
    let mut world = demo_world();
    let villager = world.spawn_entity(Some("villager")).unwrap();
    for _ in 0..25 {
        world.tick(0.1);
    }
    assert!(world.process_action(ActionRequest::new(villager, "rest")).is_success());

    let snapshot = world.create_snapshot();
    let json = snapshot.to_json().unwrap();
    let restored = WorldSnapshot::from_json(&json).unwrap();

    // Run the original forward, then rewind a fresh world and replay
    for _ in 0..30 {
        world.tick(0.1);
    }
    let expected_hp = world.entities().stat(villager, "hp");
    let expected_stage = world
        .events()
        .active_instances()
        .map(|i| i.stage)
        .next();

    let mut replay = demo_world();
    replay.restore_from_snapshot(&restored);
    assert_eq!(replay.now(), snapshot.now);
    assert!(replay.cooldown_remaining(villager, "rest") > 1.0);
    assert_eq!(replay.timers().active_count(), 1);

    for _ in 0..30 {
        replay.tick(0.1);
    }
    assert_eq!(replay.entities().stat(villager, "hp"), expected_hp);
    assert_eq!(
        replay.events().active_instances().map(|i| i.stage).next(),
        expected_stage
    );
}

#[test]
fn test_restore_publishes_nothing_and_keeps_ids_fresh() {
    let mut world = World::default();
    let a = world.spawn_entity(None).unwrap();
    world.add_tag(a, "kept");
    world.unlock("gate");
    let snapshot = world.create_snapshot();

    let mut other = World::default();
    let published = Rc::new(Cell::new(0));
    for kind in [SignalKind::EntityCreated, SignalKind::TagAdded, SignalKind::ProgressionUnlocked] {
        let p = Rc::clone(&published);
        other.subscribe(kind, move |_s: &Signal, _w: &mut World| p.set(p.get() + 1));
    }
    other.restore_from_snapshot(&snapshot);

    assert_eq!(published.get(), 0);
    assert!(other.entities().has_tag(a, "kept"));
    assert!(other.progression().is_unlocked("gate"));

    let b = other.spawn_entity(None).unwrap();
    assert!(b > a);
    assert_eq!(published.get(), 1);
}

#[test]
fn test_event_stage_survives_snapshot() {
    let mut world = World::default();
    world
        .register_event(
            EventDef::new("ritual")
                .with_stage(StageDef::new("chant").with_duration(3.0))
                .with_stage(StageDef::new("summon").with_enter(Effect::add_tag("summoned"))),
        )
        .unwrap();
    let priest = world.spawn_entity(None).unwrap();
    world.spawn_event("ritual", priest, AHashMap::new()).unwrap();
    world.tick(2.0);

    let snapshot = world.create_snapshot();
    let mut copy = World::default();
    copy.register_event(
        EventDef::new("ritual")
            .with_stage(StageDef::new("chant").with_duration(3.0))
            .with_stage(StageDef::new("summon").with_enter(Effect::add_tag("summoned"))),
    )
    .unwrap();
    copy.restore_from_snapshot(&snapshot);

    copy.tick(0.5);
    assert!(!copy.entities().has_tag(priest, "summoned"));
    copy.tick(0.5);
    assert!(copy.entities().has_tag(priest, "summoned"));
}

#[test]
fn test_empty_pack_is_valid() {
    let pack = ContentPack::from_toml_str("").unwrap();
    assert!(pack.is_empty());
    let mut world = World::default();
    assert_eq!(world.load_content(pack).registered(), 0);
}
