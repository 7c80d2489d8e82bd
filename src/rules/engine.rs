//! Rule registration and evaluation
//!
//! Rules are bucketed by trigger and kept sorted by descending priority;
//! equal priorities run in registration order. Buckets are shared `Rc`
//! slices so an evaluation pass never copies them.

use std::rc::Rc;

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::bus::{Signal, SignalHandler, SubscriptionId};
use crate::core::config::RuleConfig;
use crate::core::error::{KernelError, Result};
use crate::core::types::{ContentKey, TIME_EPSILON};
use crate::ecs::world::World;
use crate::expr::{all_pass, apply_all};
use crate::rules::definition::{RuleContext, RuleDef, RuleState, TriggerType};

#[derive(Debug)]
pub struct RuleEngine {
    rules: AHashMap<ContentKey, Rc<RuleDef>>,
    buckets: AHashMap<TriggerType, Rc<[Rc<RuleDef>]>>,
    states: AHashMap<ContentKey, RuleState>,
    enabled: bool,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(&RuleConfig::default())
    }
}

impl RuleEngine {
    pub fn new(config: &RuleConfig) -> Self {
        Self {
            rules: AHashMap::new(),
            buckets: AHashMap::new(),
            states: AHashMap::new(),
            enabled: config.enabled,
        }
    }

    pub fn register(&mut self, def: RuleDef) -> Result<()> {
        if !def.key.is_valid() {
            warn!(target: "sim_kernel::rules", "ignoring rule with empty key");
            return Err(KernelError::InvalidKey(def.key.to_string()));
        }
        if self.rules.contains_key(&def.key) {
            warn!(target: "sim_kernel::rules", "duplicate rule '{}' ignored", def.key);
            return Err(KernelError::DuplicateRule(def.key));
        }

        let def = Rc::new(def);
        let mut bucket: Vec<Rc<RuleDef>> = self
            .buckets
            .get(&def.trigger)
            .map(|b| b.to_vec())
            .unwrap_or_default();
        bucket.push(Rc::clone(&def));
        bucket.sort_by(|a, b| b.priority.cmp(&a.priority));
        self.buckets.insert(def.trigger, bucket.into());

        self.states.insert(def.key.clone(), RuleState::default());
        self.rules.insert(def.key.clone(), def);
        Ok(())
    }

    pub fn rule(&self, key: &str) -> Option<&Rc<RuleDef>> {
        self.rules.get(key)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Rules for `trigger` in evaluation order
    pub fn rules_for(&self, trigger: TriggerType) -> &[Rc<RuleDef>] {
        self.buckets.get(&trigger).map(|b| &b[..]).unwrap_or(&[])
    }

    pub fn rule_state(&self, key: &str) -> Option<&RuleState> {
        self.states.get(key)
    }

    /// An exhausted rule cannot be re-enabled
    pub fn set_rule_enabled(&mut self, key: &str, enabled: bool) -> bool {
        let Some(def) = self.rules.get(key) else {
            return false;
        };
        let Some(state) = self.states.get_mut(key) else {
            return false;
        };
        state.disabled = !enabled || def.is_exhausted(state);
        true
    }

    pub fn reset_rule(&mut self, key: &str) -> bool {
        match self.states.get_mut(key) {
            Some(state) => {
                *state = RuleState::default();
                true
            }
            None => false,
        }
    }

    pub fn reset_all_states(&mut self) {
        for state in self.states.values_mut() {
            *state = RuleState::default();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Global switch; a disabled engine evaluates nothing
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// States sorted by rule key
    pub fn states(&self) -> Vec<(ContentKey, RuleState)> {
        let mut states: Vec<_> = self
            .states
            .iter()
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    /// Restore saved states; rules missing from the saved set start fresh
    pub fn restore_states(&mut self, saved: &[(ContentKey, RuleState)]) {
        self.reset_all_states();
        for (key, state) in saved {
            if let Some(slot) = self.states.get_mut(key) {
                *slot = state.clone();
            }
        }
    }
}

impl World {
    pub fn register_rule(&mut self, def: RuleDef) -> Result<()> {
        self.rules.register(def)
    }

    pub fn set_rule_enabled(&mut self, key: &str, enabled: bool) -> bool {
        self.rules.set_rule_enabled(key, enabled)
    }

    /// Run every rule bound to `trigger` against `context`, returning how
    /// many fired
    pub fn evaluate_rules(&mut self, trigger: TriggerType, context: &RuleContext) -> usize {
        if !self.rules.enabled {
            return 0;
        }
        let Some(bucket) = self.rules.buckets.get(&trigger).cloned() else {
            return 0;
        };

        let ctx = context.effect_context();
        let mut fired = 0;
        for rule in bucket.iter() {
            if !self.rules.enabled {
                break;
            }
            let now = self.now();
            let Some(state) = self.rules.states.get_mut(&rule.key) else {
                continue;
            };
            if state.disabled {
                continue;
            }
            if !context.matches_filter(rule.filter.as_ref()) {
                continue;
            }
            if let Some(last) = state.last_fire {
                if now - last < rule.cooldown_seconds - TIME_EPSILON {
                    continue;
                }
            }
            if rule.is_exhausted(state) {
                state.disabled = true;
                continue;
            }

            if !all_pass(&rule.conditions, self, &ctx) {
                continue;
            }
            apply_all(&rule.effects, self, &ctx);

            if let Some(state) = self.rules.states.get_mut(&rule.key) {
                state.fire_count += 1;
                state.last_fire = Some(self.clock.now());
                if rule.is_exhausted(state) {
                    state.disabled = true;
                }
            }
            debug!(target: "sim_kernel::rules", "rule '{}' fired", rule.key);
            fired += 1;
        }
        fired
    }

    /// Subscribe the reactive trigger handlers, replacing any installed earlier
    pub fn install_rule_triggers(&mut self) {
        let previous: Vec<_> = self.rule_subscriptions.drain(..).collect();
        for (kind, id) in previous {
            self.unsubscribe(kind, id);
        }

        let handler: SignalHandler<World> = Rc::new(|signal: &Signal, world: &mut World| {
            if let Some((trigger, context)) = RuleContext::from_signal(signal) {
                world.evaluate_rules(trigger, &context);
            }
        });
        let mut installed: Vec<(_, SubscriptionId)> = Vec::new();
        for trigger in TriggerType::REACTIVE {
            if let Some(kind) = trigger.signal_kind() {
                installed.push((kind, self.subscribe_handler(kind, Rc::clone(&handler))));
            }
        }
        self.rule_subscriptions = installed;
    }
}

/// Evaluate periodic rules once with an empty context
pub fn evaluate_periodic_rules(world: &mut World) -> usize {
    world.evaluate_rules(TriggerType::Periodic, &RuleContext::empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_and_invalid_keys() {
        let mut engine = RuleEngine::default();
        assert!(engine.register(RuleDef::new("a", TriggerType::Periodic)).is_ok());
        assert!(matches!(
            engine.register(RuleDef::new("a", TriggerType::TagAdded)),
            Err(KernelError::DuplicateRule(_))
        ));
        assert!(matches!(
            engine.register(RuleDef::new("", TriggerType::Periodic)),
            Err(KernelError::InvalidKey(_))
        ));
        assert_eq!(engine.rule_count(), 1);
    }

    #[test]
    fn test_bucket_sorted_by_priority_then_registration() {
        let mut engine = RuleEngine::default();
        engine.register(RuleDef::new("low", TriggerType::Periodic).with_priority(-1)).unwrap();
        engine.register(RuleDef::new("first", TriggerType::Periodic).with_priority(3)).unwrap();
        engine.register(RuleDef::new("second", TriggerType::Periodic).with_priority(3)).unwrap();
        engine.register(RuleDef::new("other", TriggerType::TagAdded)).unwrap();

        let order: Vec<_> = engine
            .rules_for(TriggerType::Periodic)
            .iter()
            .map(|r| r.key.as_str())
            .collect();
        assert_eq!(order, vec!["first", "second", "low"]);
        assert_eq!(engine.rules_for(TriggerType::StatChanged).len(), 0);
    }

    #[test]
    fn test_exhausted_rule_stays_disabled() {
        let mut engine = RuleEngine::default();
        engine
            .register(RuleDef::new("once", TriggerType::Periodic).with_max_fires(1))
            .unwrap();
        if let Some(state) = engine.states.get_mut("once") {
            state.fire_count = 1;
            state.disabled = true;
        }
        engine.set_rule_enabled("once", true);
        assert!(engine.rule_state("once").unwrap().disabled);

        engine.reset_rule("once");
        assert!(!engine.rule_state("once").unwrap().disabled);
        assert!(!engine.set_rule_enabled("missing", true));
    }

    #[test]
    fn test_restore_states() {
        let mut engine = RuleEngine::default();
        engine.register(RuleDef::new("a", TriggerType::Periodic)).unwrap();
        let saved = vec![(
            ContentKey::new("a"),
            RuleState {
                fire_count: 4,
                last_fire: None,
                disabled: false,
            },
        )];
        engine.restore_states(&saved);
        assert_eq!(engine.rule_state("a").unwrap().fire_count, 4);
        assert_eq!(engine.states(), saved);
    }
}
