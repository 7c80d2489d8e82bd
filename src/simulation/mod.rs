//! Time-driven orchestration: timers, staged events, progression and the tick

pub mod events;
pub mod progression;
pub mod tick;
pub mod timers;

pub use events::{tick_events, EventDef, EventInstance, EventManager, EventSnapshot, SpawnRejection, StageDef};
pub use progression::{Progression, ProgressionSnapshot};
pub use tick::{run_simulation_tick, TickHook, TickHooks, TickStage};
pub use timers::{tick_timers, SimTimer, TimerManager, TimerSnapshot, MIN_REPEAT_SECONDS};
