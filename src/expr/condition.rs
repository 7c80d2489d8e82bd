//! Boolean predicates over world state

use crate::core::types::{ContentKey, EntityId, STAT_EPSILON};
use crate::ecs::world::World;
use crate::expr::context::{EffectContext, Subject};
use serde::{Deserialize, Serialize};

/// Comparison operator for numeric leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    /// Float comparison; equality is within [`STAT_EPSILON`]
    pub fn compare_f32(self, lhs: f32, rhs: f32) -> bool {
        let eq = (lhs - rhs).abs() <= STAT_EPSILON;
        match self {
            Comparison::Eq => eq,
            Comparison::Ne => !eq,
            Comparison::Lt => lhs < rhs && !eq,
            Comparison::Le => lhs < rhs || eq,
            Comparison::Gt => lhs > rhs && !eq,
            Comparison::Ge => lhs > rhs || eq,
        }
    }

    pub fn compare_i64(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Comparison::Eq => lhs == rhs,
            Comparison::Ne => lhs != rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A serializable predicate tree
///
/// Leaves name the entity they inspect with a [`Subject`]. A subject that
/// does not resolve to a live entity makes the leaf evaluate to `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Constant {
        value: bool,
    },
    And {
        #[serde(default)]
        conditions: Vec<Condition>,
    },
    Or {
        #[serde(default)]
        conditions: Vec<Condition>,
    },
    Not {
        condition: Box<Condition>,
    },
    HasTag {
        tag: ContentKey,
        #[serde(default)]
        on: Subject,
    },
    LacksTag {
        tag: ContentKey,
        #[serde(default)]
        on: Subject,
    },
    StatCompare {
        stat: ContentKey,
        op: Comparison,
        value: f32,
        #[serde(default)]
        on: Subject,
    },
    /// Inclusive on both ends
    StatInRange {
        stat: ContentKey,
        min: f32,
        max: f32,
        #[serde(default)]
        on: Subject,
    },
    FlagSet {
        flag: ContentKey,
        #[serde(default = "default_true")]
        expected: bool,
        #[serde(default)]
        on: Subject,
    },
    CounterCompare {
        counter: ContentKey,
        op: Comparison,
        value: i64,
        #[serde(default)]
        on: Subject,
    },
    HasItem {
        item: ContentKey,
        quantity: u32,
        #[serde(default)]
        on: Subject,
    },
    InArea {
        area: ContentKey,
        #[serde(default)]
        on: Subject,
    },
    WithinRange {
        other: Subject,
        range: f32,
        #[serde(default)]
        on: Subject,
    },
    TimeOfDay {
        start_hour: f32,
        end_hour: f32,
    },
    EventActive {
        event: ContentKey,
    },
    /// With an event instance in context that belongs to `event`, checks that
    /// instance. Otherwise any active instance of `event` at `stage` passes.
    EventAtStage {
        event: ContentKey,
        stage: usize,
    },
    Unlocked {
        key: ContentKey,
    },
}

impl Condition {
    pub fn always() -> Self {
        Condition::Constant { value: true }
    }

    pub fn never() -> Self {
        Condition::Constant { value: false }
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Condition::And { conditions }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Condition::Or { conditions }
    }

    pub fn negate(condition: Condition) -> Self {
        Condition::Not {
            condition: Box::new(condition),
        }
    }

    pub fn has_tag(tag: &str) -> Self {
        Condition::HasTag {
            tag: ContentKey::new(tag),
            on: Subject::Actor,
        }
    }

    pub fn lacks_tag(tag: &str) -> Self {
        Condition::LacksTag {
            tag: ContentKey::new(tag),
            on: Subject::Actor,
        }
    }

    pub fn stat(stat: &str, op: Comparison, value: f32) -> Self {
        Condition::StatCompare {
            stat: ContentKey::new(stat),
            op,
            value,
            on: Subject::Actor,
        }
    }

    pub fn stat_in_range(stat: &str, min: f32, max: f32) -> Self {
        Condition::StatInRange {
            stat: ContentKey::new(stat),
            min,
            max,
            on: Subject::Actor,
        }
    }

    pub fn counter(counter: &str, op: Comparison, value: i64) -> Self {
        Condition::CounterCompare {
            counter: ContentKey::new(counter),
            op,
            value,
            on: Subject::Actor,
        }
    }

    pub fn has_item(item: &str, quantity: u32) -> Self {
        Condition::HasItem {
            item: ContentKey::new(item),
            quantity,
            on: Subject::Actor,
        }
    }

    /// Retarget a leaf at another subject. Combinators are returned unchanged.
    pub fn on(mut self, subject: Subject) -> Self {
        match &mut self {
            Condition::HasTag { on, .. }
            | Condition::LacksTag { on, .. }
            | Condition::StatCompare { on, .. }
            | Condition::StatInRange { on, .. }
            | Condition::FlagSet { on, .. }
            | Condition::CounterCompare { on, .. }
            | Condition::HasItem { on, .. }
            | Condition::InArea { on, .. }
            | Condition::WithinRange { on, .. } => *on = subject,
            _ => {}
        }
        self
    }

    /// Evaluate against the world. AND/OR short-circuit in list order.
    pub fn evaluate(&self, world: &World, ctx: &EffectContext) -> bool {
        match self {
            Condition::Constant { value } => *value,
            Condition::And { conditions } => conditions.iter().all(|c| c.evaluate(world, ctx)),
            Condition::Or { conditions } => conditions.iter().any(|c| c.evaluate(world, ctx)),
            Condition::Not { condition } => !condition.evaluate(world, ctx),

            Condition::HasTag { tag, on } => live(world, ctx, on)
                .map(|id| world.entities().has_tag(id, tag.as_str()))
                .unwrap_or(false),
            Condition::LacksTag { tag, on } => live(world, ctx, on)
                .map(|id| !world.entities().has_tag(id, tag.as_str()))
                .unwrap_or(false),
            Condition::StatCompare { stat, op, value, on } => ctx
                .resolve(on)
                .and_then(|id| world.entities().stat(id, stat.as_str()))
                .map(|current| op.compare_f32(current, *value))
                .unwrap_or(false),
            Condition::StatInRange { stat, min, max, on } => ctx
                .resolve(on)
                .and_then(|id| world.entities().stat(id, stat.as_str()))
                .map(|current| {
                    Comparison::Ge.compare_f32(current, *min) && Comparison::Le.compare_f32(current, *max)
                })
                .unwrap_or(false),
            Condition::FlagSet { flag, expected, on } => ctx
                .resolve(on)
                .and_then(|id| world.entities().get(id))
                .map(|entity| entity.has_flag(flag.as_str()) == *expected)
                .unwrap_or(false),
            Condition::CounterCompare { counter, op, value, on } => ctx
                .resolve(on)
                .and_then(|id| world.entities().get(id))
                .map(|entity| op.compare_i64(entity.counter(counter.as_str()), *value))
                .unwrap_or(false),
            Condition::HasItem { item, quantity, on } => live(world, ctx, on)
                .map(|id| world.inventory().quantity(id, item.as_str()) >= *quantity)
                .unwrap_or(false),

            Condition::InArea { area, on } => live(world, ctx, on)
                .map(|id| world.spatial().is_in_area(id, area.as_str()))
                .unwrap_or(false),
            Condition::WithinRange { other, range, on } => {
                match (live(world, ctx, on), live(world, ctx, other)) {
                    (Some(a), Some(b)) => world
                        .spatial()
                        .distance(a, b)
                        .map(|d| d <= *range + STAT_EPSILON)
                        .unwrap_or(false),
                    _ => false,
                }
            }
            Condition::TimeOfDay { start_hour, end_hour } => {
                world.clock().is_within_hours(*start_hour, *end_hour)
            }

            Condition::EventActive { event } => world.events().is_active(event.as_str()),
            Condition::EventAtStage { event, stage } => {
                let events = world.events();
                match ctx.event_instance.and_then(|id| events.instance(id)) {
                    Some(instance) if instance.event == *event => {
                        instance.active && instance.stage == *stage
                    }
                    _ => events
                        .active_instances()
                        .any(|instance| instance.event == *event && instance.stage == *stage),
                }
            }
            Condition::Unlocked { key } => world.progression().is_unlocked(key.as_str()),
        }
    }
}

/// Evaluate a list as an implicit AND
pub fn all_pass(conditions: &[Condition], world: &World, ctx: &EffectContext) -> bool {
    conditions.iter().all(|c| c.evaluate(world, ctx))
}

fn live(world: &World, ctx: &EffectContext, subject: &Subject) -> Option<EntityId> {
    ctx.resolve(subject).filter(|id| world.entities().contains(*id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::KernelConfig;
    use crate::core::types::Vec2;
    use crate::simulation::{EventDef, StageDef};
    use crate::spatial::{AreaShape, GridSpatialIndex};

    fn world_with_actor() -> (World, EntityId) {
        let mut world = World::new(KernelConfig::default());
        let id = world.spawn_entity(None).unwrap();
        (world, id)
    }

    #[test]
    fn test_empty_combinators() {
        let (world, _) = world_with_actor();
        let ctx = EffectContext::new();
        assert!(Condition::all(vec![]).evaluate(&world, &ctx));
        assert!(!Condition::any(vec![]).evaluate(&world, &ctx));
        assert!(!Condition::negate(Condition::always()).evaluate(&world, &ctx));
    }

    #[test]
    fn test_combinators_nest() {
        let (mut world, actor) = world_with_actor();
        world.add_tag(actor, "hungry");
        let ctx = EffectContext::for_actor(actor);
        let tree = Condition::any(vec![
            Condition::never(),
            Condition::all(vec![Condition::has_tag("hungry"), Condition::lacks_tag("sated")]),
        ]);
        assert!(tree.evaluate(&world, &ctx));
        assert!(!Condition::negate(tree).evaluate(&world, &ctx));
    }

    #[test]
    fn test_stat_compare_epsilon() {
        let (mut world, actor) = world_with_actor();
        world.set_stat(actor, "hp", 10.00005);
        let ctx = EffectContext::for_actor(actor);
        assert!(Condition::stat("hp", Comparison::Eq, 10.0).evaluate(&world, &ctx));
        assert!(!Condition::stat("hp", Comparison::Lt, 10.0).evaluate(&world, &ctx));
        assert!(Condition::stat("hp", Comparison::Ge, 10.0).evaluate(&world, &ctx));
        assert!(!Condition::stat("hp", Comparison::Ne, 10.0).evaluate(&world, &ctx));
    }

    #[test]
    fn test_stat_in_range_inclusive() {
        let (mut world, actor) = world_with_actor();
        world.set_stat(actor, "hp", 5.0);
        let ctx = EffectContext::for_actor(actor);
        assert!(Condition::stat_in_range("hp", 5.0, 10.0).evaluate(&world, &ctx));
        assert!(Condition::stat_in_range("hp", 0.0, 5.0).evaluate(&world, &ctx));
        assert!(!Condition::stat_in_range("hp", 6.0, 10.0).evaluate(&world, &ctx));
    }

    #[test]
    fn test_missing_stat_fails() {
        let (world, actor) = world_with_actor();
        let ctx = EffectContext::for_actor(actor);
        assert!(!Condition::stat("mana", Comparison::Le, 100.0).evaluate(&world, &ctx));
    }

    #[test]
    fn test_missing_subject_is_false() {
        let (world, _) = world_with_actor();
        let ctx = EffectContext::for_actor(EntityId(999));
        assert!(!Condition::has_tag("x").evaluate(&world, &ctx));
        assert!(!Condition::lacks_tag("x").evaluate(&world, &ctx));
        assert!(!Condition::counter("kills", Comparison::Ge, 0).evaluate(&world, &ctx));
        // Missing target role
        assert!(!Condition::lacks_tag("x").on(Subject::Target).evaluate(&world, &EffectContext::new()));
    }

    #[test]
    fn test_target_and_explicit_subjects() {
        let (mut world, actor) = world_with_actor();
        let other = world.spawn_entity(None).unwrap();
        world.add_tag(other, "marked");
        let ctx = EffectContext::for_actor(actor).with_target(Some(other));
        assert!(!Condition::has_tag("marked").evaluate(&world, &ctx));
        assert!(Condition::has_tag("marked").on(Subject::Target).evaluate(&world, &ctx));
        assert!(Condition::has_tag("marked")
            .on(Subject::Entity(other))
            .evaluate(&world, &EffectContext::new()));
    }

    #[test]
    fn test_flag_and_counter() {
        let (mut world, actor) = world_with_actor();
        world.set_flag(actor, "met_king", true);
        world.set_counter(actor, "kills", 3);
        let ctx = EffectContext::for_actor(actor);
        let flag = Condition::FlagSet {
            flag: ContentKey::new("met_king"),
            expected: true,
            on: Subject::Actor,
        };
        assert!(flag.evaluate(&world, &ctx));
        assert!(Condition::counter("kills", Comparison::Ge, 3).evaluate(&world, &ctx));
        assert!(!Condition::counter("kills", Comparison::Gt, 3).evaluate(&world, &ctx));
        // Counters that were never written read as zero
        assert!(Condition::counter("deaths", Comparison::Eq, 0).evaluate(&world, &ctx));
    }

    #[test]
    fn test_has_item() {
        let (mut world, actor) = world_with_actor();
        world.add_item(actor, "wood", 4);
        let ctx = EffectContext::for_actor(actor);
        assert!(Condition::has_item("wood", 4).evaluate(&world, &ctx));
        assert!(!Condition::has_item("wood", 5).evaluate(&world, &ctx));
    }

    #[test]
    fn test_time_of_day_window() {
        // Default calendar: 60 seconds per hour, starting at 08:00
        let (mut world, _) = world_with_actor();
        let ctx = EffectContext::new();
        let morning = Condition::TimeOfDay { start_hour: 6.0, end_hour: 12.0 };
        let night = Condition::TimeOfDay { start_hour: 22.0, end_hour: 4.0 };
        assert!(morning.evaluate(&world, &ctx));
        assert!(!night.evaluate(&world, &ctx));

        world.tick(300.0); // 13:00
        assert!(!morning.evaluate(&world, &ctx));

        world.tick(600.0); // 23:00
        assert!(night.evaluate(&world, &ctx));
    }

    #[test]
    fn test_area_and_range() {
        let mut grid = GridSpatialIndex::new(10.0);
        grid.define_area(
            "market",
            AreaShape::Rect {
                min: Vec2::new(0.0, 0.0),
                max: Vec2::new(10.0, 10.0),
            },
        );
        let mut world = World::with_spatial_index(KernelConfig::default(), Box::new(grid));
        let buyer = world.spawn_entity(None).unwrap();
        let seller = world.spawn_entity(None).unwrap();
        let ctx = EffectContext::for_actor(buyer).with_target(Some(seller));

        let in_market = Condition::InArea {
            area: ContentKey::new("market"),
            on: Subject::Actor,
        };
        let close = Condition::WithinRange {
            other: Subject::Target,
            range: 5.0,
            on: Subject::Actor,
        };
        // Nothing placed yet
        assert!(!in_market.evaluate(&world, &ctx));
        assert!(!close.evaluate(&world, &ctx));

        world.move_entity(buyer, Vec2::new(2.0, 2.0));
        world.move_entity(seller, Vec2::new(5.0, 6.0));
        assert!(in_market.evaluate(&world, &ctx));
        assert!(close.evaluate(&world, &ctx));

        world.move_entity(seller, Vec2::new(30.0, 2.0));
        assert!(!close.evaluate(&world, &ctx));
        world.move_entity(buyer, Vec2::new(-1.0, 2.0));
        assert!(!in_market.evaluate(&world, &ctx));
    }

    #[test]
    fn test_event_active_and_stage() {
        let (mut world, actor) = world_with_actor();
        world
            .register_event(
                EventDef::new("storm")
                    .with_stage(StageDef::new("gathering"))
                    .with_stage(StageDef::new("raging")),
            )
            .unwrap();
        let ctx = EffectContext::for_actor(actor);
        let active = Condition::EventActive { event: ContentKey::new("storm") };
        let raging = Condition::EventAtStage { event: ContentKey::new("storm"), stage: 1 };
        assert!(!active.evaluate(&world, &ctx));
        assert!(!raging.evaluate(&world, &ctx));

        let instance = world.spawn_event("storm", actor, Default::default()).unwrap();
        assert!(active.evaluate(&world, &ctx));
        assert!(!raging.evaluate(&world, &ctx));

        world.advance_stage(instance);
        assert!(raging.evaluate(&world, &ctx));
        assert!(raging.evaluate(&world, &ctx.clone().with_event_instance(instance)));

        world.end_event(instance, false);
        assert!(!active.evaluate(&world, &ctx));
        assert!(!raging.evaluate(&world, &ctx.with_event_instance(instance)));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let src = r#"
            type = "and"
            [[conditions]]
            type = "has_tag"
            tag = "hungry"
            [[conditions]]
            type = "stat_compare"
            stat = "food"
            op = "lt"
            value = 10.0
            on = "target"
        "#;
        let condition: Condition = toml::from_str(src).unwrap();
        match &condition {
            Condition::And { conditions } => {
                assert_eq!(conditions.len(), 2);
                assert_eq!(conditions[0], Condition::has_tag("hungry"));
                assert_eq!(
                    conditions[1],
                    Condition::stat("food", Comparison::Lt, 10.0).on(Subject::Target)
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
