//! Rule definitions and per-rule runtime state

use serde::{Deserialize, Serialize};

use crate::bus::{Signal, SignalKind};
use crate::core::types::{ContentKey, EntityId, EventInstanceId, SimTime};
use crate::expr::{Condition, Effect, EffectContext};

/// When a rule is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Once per tick with an empty context
    Periodic,
    ActionCompleted,
    AreaEntered,
    AreaExited,
    EventStarted,
    EventStageChanged,
    EventEnded,
    TimerCompleted,
    TagAdded,
    TagRemoved,
    StatChanged,
}

impl TriggerType {
    /// Every trigger fed by a bus signal
    pub const REACTIVE: [TriggerType; 10] = [
        TriggerType::ActionCompleted,
        TriggerType::AreaEntered,
        TriggerType::AreaExited,
        TriggerType::EventStarted,
        TriggerType::EventStageChanged,
        TriggerType::EventEnded,
        TriggerType::TimerCompleted,
        TriggerType::TagAdded,
        TriggerType::TagRemoved,
        TriggerType::StatChanged,
    ];

    pub fn signal_kind(self) -> Option<SignalKind> {
        match self {
            TriggerType::Periodic => None,
            TriggerType::ActionCompleted => Some(SignalKind::ActionCompleted),
            TriggerType::AreaEntered => Some(SignalKind::AreaEntered),
            TriggerType::AreaExited => Some(SignalKind::AreaExited),
            TriggerType::EventStarted => Some(SignalKind::EventStarted),
            TriggerType::EventStageChanged => Some(SignalKind::EventStageChanged),
            TriggerType::EventEnded => Some(SignalKind::EventEnded),
            TriggerType::TimerCompleted => Some(SignalKind::TimerCompleted),
            TriggerType::TagAdded => Some(SignalKind::TagAdded),
            TriggerType::TagRemoved => Some(SignalKind::TagRemoved),
            TriggerType::StatChanged => Some(SignalKind::StatChanged),
        }
    }
}

/// Registered condition -> effect binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDef {
    pub key: ContentKey,
    pub trigger: TriggerType,
    /// Compared against the trigger's key (action, area, event, timer, tag or stat)
    #[serde(default)]
    pub filter: Option<ContentKey>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// Higher runs first
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub max_fires: Option<u32>,
    #[serde(default)]
    pub cooldown_seconds: f64,
}

impl RuleDef {
    pub fn new(key: &str, trigger: TriggerType) -> Self {
        Self {
            key: ContentKey::new(key),
            trigger,
            filter: None,
            conditions: Vec::new(),
            effects: Vec::new(),
            priority: 0,
            max_fires: None,
            cooldown_seconds: 0.0,
        }
    }

    pub fn with_filter(mut self, key: &str) -> Self {
        self.filter = Some(ContentKey::new(key));
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_fires(mut self, max_fires: u32) -> Self {
        self.max_fires = Some(max_fires);
        self
    }

    pub fn with_cooldown(mut self, seconds: f64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }

    pub fn is_exhausted(&self, state: &RuleState) -> bool {
        self.max_fires.is_some_and(|max| state.fire_count >= max)
    }
}

/// Mutable counters for one rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleState {
    pub fire_count: u32,
    pub last_fire: Option<SimTime>,
    pub disabled: bool,
}

/// What a trigger knows about the thing that triggered it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleContext {
    pub actor: Option<EntityId>,
    pub target: Option<EntityId>,
    /// The key a rule's filter is compared with
    pub key: Option<ContentKey>,
    pub area: Option<ContentKey>,
    pub event_instance: Option<EventInstanceId>,
}

impl RuleContext {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Translate a bus signal into its trigger and context
    pub fn from_signal(signal: &Signal) -> Option<(TriggerType, RuleContext)> {
        let actor = signal.subject();
        let base = RuleContext {
            actor,
            ..Default::default()
        };
        let pair = match signal {
            Signal::ActionCompleted { target, action, .. } => (
                TriggerType::ActionCompleted,
                RuleContext {
                    target: *target,
                    key: Some(action.clone()),
                    ..base
                },
            ),
            Signal::AreaEntered { area, .. } => (
                TriggerType::AreaEntered,
                RuleContext {
                    key: Some(area.clone()),
                    area: Some(area.clone()),
                    ..base
                },
            ),
            Signal::AreaExited { area, .. } => (
                TriggerType::AreaExited,
                RuleContext {
                    key: Some(area.clone()),
                    area: Some(area.clone()),
                    ..base
                },
            ),
            Signal::EventStarted { instance, event, target } => (
                TriggerType::EventStarted,
                RuleContext {
                    target: Some(*target),
                    key: Some(event.clone()),
                    event_instance: Some(*instance),
                    ..base
                },
            ),
            Signal::EventStageChanged {
                instance,
                event,
                target,
                ..
            } => (
                TriggerType::EventStageChanged,
                RuleContext {
                    target: Some(*target),
                    key: Some(event.clone()),
                    event_instance: Some(*instance),
                    ..base
                },
            ),
            Signal::EventEnded {
                instance,
                event,
                target,
                ..
            } => (
                TriggerType::EventEnded,
                RuleContext {
                    target: Some(*target),
                    key: Some(event.clone()),
                    event_instance: Some(*instance),
                    ..base
                },
            ),
            Signal::TimerCompleted { key, .. } => (
                TriggerType::TimerCompleted,
                RuleContext {
                    key: Some(key.clone()),
                    ..base
                },
            ),
            Signal::TagAdded { tag, .. } => (
                TriggerType::TagAdded,
                RuleContext {
                    key: Some(tag.clone()),
                    ..base
                },
            ),
            Signal::TagRemoved { tag, .. } => (
                TriggerType::TagRemoved,
                RuleContext {
                    key: Some(tag.clone()),
                    ..base
                },
            ),
            Signal::StatChanged { stat, .. } => (
                TriggerType::StatChanged,
                RuleContext {
                    key: Some(stat.clone()),
                    ..base
                },
            ),
            _ => return None,
        };
        Some(pair)
    }

    pub fn effect_context(&self) -> EffectContext {
        EffectContext {
            actor: self.actor,
            target: self.target,
            area: self.area.clone(),
            event_instance: self.event_instance,
        }
    }

    /// A rule with no filter always matches
    pub fn matches_filter(&self, filter: Option<&ContentKey>) -> bool {
        match filter {
            None => true,
            Some(filter) => self.key.as_ref() == Some(filter),
        }
    }
}
