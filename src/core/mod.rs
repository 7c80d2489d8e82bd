pub mod calendar;
pub mod config;
pub mod error;
pub mod types;
pub mod value;

pub use calendar::Clock;
pub use config::KernelConfig;
pub use error::{KernelError, Result};
pub use types::{ContentKey, EntityId, EventInstanceId, SimTime, TimerId, Vec2};
pub use value::Value;
