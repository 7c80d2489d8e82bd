//! Entity data and storage

pub mod archetype;
pub mod record;
pub mod stats;
pub mod store;

pub use archetype::{ArchetypeDef, StatInit};
pub use record::Entity;
pub use stats::{StatChange, StatValue};
pub use store::{EntityStore, EntityStoreSnapshot};
