//! Signal bus: typed, synchronous, reentrancy-safe publish/subscribe

pub mod event_bus;
pub mod signal;

pub use event_bus::{publish, EventBus, SignalHandler, SignalHost, SubscriptionId};
pub use signal::{Signal, SignalKind};
