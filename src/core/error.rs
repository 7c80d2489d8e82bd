use thiserror::Error;

use crate::core::types::{ContentKey, EntityId};

/// Errors surfaced by registration, content loading and snapshots.
///
/// Validation outcomes of actions and event spawns are typed results, not
/// errors; see `ActionResponse` and `SpawnRejection`.
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("Invalid content key: {0:?}")]
    InvalidKey(String),

    #[error("Unknown archetype: {0}")]
    UnknownArchetype(ContentKey),

    #[error("Unknown action: {0}")]
    UnknownAction(ContentKey),

    #[error("Unknown event: {0}")]
    UnknownEvent(ContentKey),

    #[error("Unknown rule: {0}")]
    UnknownRule(ContentKey),

    #[error("Duplicate rule: {0}")]
    DuplicateRule(ContentKey),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, KernelError>;
