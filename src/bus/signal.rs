//! Signal payloads carried by the bus

use crate::core::types::{ContentKey, EntityId, EventInstanceId, TimerId};
use serde::{Deserialize, Serialize};

/// A typed message delivered through the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    // -- Entity lifecycle --
    EntityCreated {
        entity: EntityId,
    },
    EntityDestroyed {
        entity: EntityId,
    },

    // -- Entity state --
    StatChanged {
        entity: EntityId,
        stat: ContentKey,
        old: f32,
        new: f32,
    },
    TagAdded {
        entity: EntityId,
        tag: ContentKey,
    },
    TagRemoved {
        entity: EntityId,
        tag: ContentKey,
    },
    InventoryChanged {
        entity: EntityId,
        item: ContentKey,
        old: u32,
        new: u32,
    },

    // -- Actions --
    ActionCompleted {
        actor: EntityId,
        target: Option<EntityId>,
        action: ContentKey,
    },
    ActionBlocked {
        actor: EntityId,
        target: Option<EntityId>,
        action: ContentKey,
        reason: String,
    },

    // -- Spatial --
    AreaEntered {
        entity: EntityId,
        area: ContentKey,
    },
    AreaExited {
        entity: EntityId,
        area: ContentKey,
    },

    // -- Staged events --
    EventStarted {
        instance: EventInstanceId,
        event: ContentKey,
        target: EntityId,
    },
    EventStageChanged {
        instance: EventInstanceId,
        event: ContentKey,
        target: EntityId,
        stage: usize,
    },
    EventEnded {
        instance: EventInstanceId,
        event: ContentKey,
        target: EntityId,
        completed: bool,
    },

    // -- Timers --
    TimerCompleted {
        timer: TimerId,
        key: ContentKey,
        owner: EntityId,
    },

    // -- Progression / UI --
    ProgressionUnlocked {
        key: ContentKey,
    },
    Notification {
        entity: Option<EntityId>,
        key: Option<ContentKey>,
        message: String,
    },
}

/// Discriminant of a [`Signal`], used as the subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    EntityCreated,
    EntityDestroyed,
    StatChanged,
    TagAdded,
    TagRemoved,
    InventoryChanged,
    ActionCompleted,
    ActionBlocked,
    AreaEntered,
    AreaExited,
    EventStarted,
    EventStageChanged,
    EventEnded,
    TimerCompleted,
    ProgressionUnlocked,
    Notification,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::EntityCreated { .. } => SignalKind::EntityCreated,
            Signal::EntityDestroyed { .. } => SignalKind::EntityDestroyed,
            Signal::StatChanged { .. } => SignalKind::StatChanged,
            Signal::TagAdded { .. } => SignalKind::TagAdded,
            Signal::TagRemoved { .. } => SignalKind::TagRemoved,
            Signal::InventoryChanged { .. } => SignalKind::InventoryChanged,
            Signal::ActionCompleted { .. } => SignalKind::ActionCompleted,
            Signal::ActionBlocked { .. } => SignalKind::ActionBlocked,
            Signal::AreaEntered { .. } => SignalKind::AreaEntered,
            Signal::AreaExited { .. } => SignalKind::AreaExited,
            Signal::EventStarted { .. } => SignalKind::EventStarted,
            Signal::EventStageChanged { .. } => SignalKind::EventStageChanged,
            Signal::EventEnded { .. } => SignalKind::EventEnded,
            Signal::TimerCompleted { .. } => SignalKind::TimerCompleted,
            Signal::ProgressionUnlocked { .. } => SignalKind::ProgressionUnlocked,
            Signal::Notification { .. } => SignalKind::Notification,
        }
    }

    /// The entity the signal is primarily about, if any
    pub fn subject(&self) -> Option<EntityId> {
        match self {
            Signal::EntityCreated { entity }
            | Signal::EntityDestroyed { entity }
            | Signal::StatChanged { entity, .. }
            | Signal::TagAdded { entity, .. }
            | Signal::TagRemoved { entity, .. }
            | Signal::InventoryChanged { entity, .. }
            | Signal::AreaEntered { entity, .. }
            | Signal::AreaExited { entity, .. } => Some(*entity),
            Signal::ActionCompleted { actor, .. } | Signal::ActionBlocked { actor, .. } => {
                Some(*actor)
            }
            Signal::EventStarted { target, .. }
            | Signal::EventStageChanged { target, .. }
            | Signal::EventEnded { target, .. } => Some(*target),
            Signal::TimerCompleted { owner, .. } => Some(*owner),
            Signal::Notification { entity, .. } => *entity,
            Signal::ProgressionUnlocked { .. } => None,
        }
    }
}
