//! Tick system - orchestrates one simulation step
//!
//! Fixed order per tick:
//! clock -> timers -> AI hooks -> periodic rules -> events -> late hooks
//!
//! Reactive rules run inside whichever step publishes their signal.

use std::rc::Rc;

use tracing::warn;

use crate::ecs::world::World;
use crate::rules::evaluate_periodic_rules;
use crate::simulation::events::tick_events;
use crate::simulation::timers::tick_timers;

/// Where in the tick a hook runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickStage {
    /// After timers, before periodic rules
    Ai,
    /// After events
    Late,
}

/// Host code run at a fixed point in every tick
pub trait TickHook {
    fn run(&self, world: &mut World, delta: f64);
}

impl<F> TickHook for F
where
    F: Fn(&mut World, f64),
{
    fn run(&self, world: &mut World, delta: f64) {
        self(world, delta)
    }
}

/// Registered hooks in registration order
#[derive(Clone, Default)]
pub struct TickHooks {
    hooks: Rc<Vec<(TickStage, Rc<dyn TickHook>)>>,
}

impl std::fmt::Debug for TickHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickHooks").field("len", &self.hooks.len()).finish()
    }
}

impl TickHooks {
    pub fn add(&mut self, stage: TickStage, hook: Rc<dyn TickHook>) {
        Rc::make_mut(&mut self.hooks).push((stage, hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl World {
    pub fn add_tick_hook(&mut self, stage: TickStage, hook: Rc<dyn TickHook>) {
        self.hooks.add(stage, hook);
    }

    /// Advance the simulation by `delta` seconds
    pub fn tick(&mut self, delta: f64) {
        run_simulation_tick(self, delta);
    }
}

/// Run one tick. Negative or non-finite deltas are rejected.
pub fn run_simulation_tick(world: &mut World, delta: f64) {
    if !delta.is_finite() || delta < 0.0 {
        warn!(target: "sim_kernel::tick", "rejecting tick with delta {}", delta);
        return;
    }

    world.clock.advance(delta);
    world.ticks += 1;

    tick_timers(world);
    run_hooks(world, TickStage::Ai, delta);
    evaluate_periodic_rules(world);
    tick_events(world);
    run_hooks(world, TickStage::Late, delta);
}

/// Hooks added while running take effect next tick
fn run_hooks(world: &mut World, stage: TickStage, delta: f64) {
    let hooks = Rc::clone(&world.hooks.hooks);
    for (hook_stage, hook) in hooks.iter() {
        if *hook_stage == stage {
            hook.run(world, delta);
        }
    }
}
