//! Evaluation context shared by conditions and effects

use crate::core::types::{ContentKey, EntityId, EventInstanceId};
use serde::{Deserialize, Serialize};

/// Which entity a leaf node reads or writes
///
/// Trees never hold live references, only roles or ids that are looked up
/// at evaluation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    #[default]
    Actor,
    Target,
    Entity(EntityId),
}

/// Who is acting, on whom, and where
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectContext {
    pub actor: Option<EntityId>,
    pub target: Option<EntityId>,
    pub area: Option<ContentKey>,
    pub event_instance: Option<EventInstanceId>,
}

impl EffectContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_actor(actor: EntityId) -> Self {
        Self {
            actor: Some(actor),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: Option<EntityId>) -> Self {
        self.target = target;
        self
    }

    pub fn with_area(mut self, area: Option<ContentKey>) -> Self {
        self.area = area;
        self
    }

    pub fn with_event_instance(mut self, instance: EventInstanceId) -> Self {
        self.event_instance = Some(instance);
        self
    }

    /// Resolve a subject to an id. Existence is checked by the caller.
    pub fn resolve(&self, subject: &Subject) -> Option<EntityId> {
        let id = match subject {
            Subject::Entity(id) => Some(*id),
            Subject::Target => self.target,
            Subject::Actor => self.actor,
        };
        id.filter(|id| id.is_valid())
    }
}
