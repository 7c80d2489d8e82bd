//! Action definitions

use serde::{Deserialize, Serialize};

use crate::core::types::ContentKey;
use crate::expr::{Condition, Effect, Subject};

/// Stat deducted from the actor when the action runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatCost {
    pub stat: ContentKey,
    pub amount: f32,
}

impl StatCost {
    pub fn new(stat: &str, amount: f32) -> Self {
        Self {
            stat: ContentKey::new(stat),
            amount,
        }
    }

    pub fn to_effect(&self) -> Effect {
        Effect::ModifyStat {
            stat: self.stat.clone(),
            delta: -self.amount,
            on: Subject::Actor,
        }
    }
}

/// A one-shot operation an actor can attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub key: ContentKey,
    #[serde(default)]
    pub target_required: bool,
    #[serde(default)]
    pub max_range: Option<f32>,
    #[serde(default)]
    pub required_actor_tags: Vec<ContentKey>,
    #[serde(default)]
    pub required_target_tags: Vec<ContentKey>,
    #[serde(default)]
    pub forbidden_actor_tags: Vec<ContentKey>,
    #[serde(default)]
    pub costs: Vec<StatCost>,
    #[serde(default)]
    pub cooldown_seconds: f64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub effects: Vec<Effect>,
}

impl ActionDef {
    pub fn new(key: &str) -> Self {
        Self {
            key: ContentKey::new(key),
            ..Default::default()
        }
    }

    pub fn requires_target(mut self) -> Self {
        self.target_required = true;
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.max_range = Some(range);
        self
    }

    pub fn with_actor_tag(mut self, tag: &str) -> Self {
        self.required_actor_tags.push(ContentKey::new(tag));
        self
    }

    pub fn with_target_tag(mut self, tag: &str) -> Self {
        self.required_target_tags.push(ContentKey::new(tag));
        self
    }

    pub fn forbid_actor_tag(mut self, tag: &str) -> Self {
        self.forbidden_actor_tags.push(ContentKey::new(tag));
        self
    }

    pub fn with_cost(mut self, stat: &str, amount: f32) -> Self {
        self.costs.push(StatCost::new(stat, amount));
        self
    }

    pub fn with_cooldown(mut self, seconds: f64) -> Self {
        self.cooldown_seconds = seconds;
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_becomes_negative_modify() {
        let cost = StatCost::new("stamina", 5.0);
        assert_eq!(cost.to_effect(), Effect::modify_stat("stamina", -5.0));
    }

    #[test]
    fn test_defaults_from_toml() {
        let def: ActionDef = toml::from_str(
            r#"
            key = "chop"
            required_actor_tags = ["lumberjack"]
            costs = [{ stat = "stamina", amount = 2.0 }]
            cooldown_seconds = 1.5

            [[effects]]
            type = "add_item"
            item = "wood"
            quantity = 1
            "#,
        )
        .unwrap();
        assert_eq!(def.key.as_str(), "chop");
        assert!(!def.target_required);
        assert_eq!(def.max_range, None);
        assert_eq!(def.costs[0], StatCost::new("stamina", 2.0));
        assert_eq!(def.effects, vec![Effect::add_item("wood", 1)]);
    }
}
