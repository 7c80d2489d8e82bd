//! Action pipeline: lookup, validation, cooldown, effect resolution, apply
//!
//! Every stage short-circuits. A blocked action leaves the world untouched
//! apart from the `ActionBlocked` signal.

use std::rc::Rc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actions::definition::ActionDef;
use crate::actions::request::{
    ActionRejection, ActionRequest, ActionResponse, ActionResult,
};
use crate::actions::validator::{ActionHandler, ActionValidator, DefaultValidator};
use crate::bus::Signal;
use crate::core::error::{KernelError, Result};
use crate::core::types::{ContentKey, EntityId, SimTime, TIME_EPSILON};
use crate::ecs::world::World;
use crate::expr::{apply_all, EffectContext};

/// Definitions, validators, handlers and per-actor cooldown deadlines
pub struct ActionPipeline {
    definitions: AHashMap<ContentKey, Rc<ActionDef>>,
    validators: Vec<Rc<dyn ActionValidator>>,
    handlers: Vec<Rc<dyn ActionHandler>>,
    cooldowns: AHashMap<EntityId, AHashMap<ContentKey, SimTime>>,
}

/// One cooldown deadline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownEntry {
    pub actor: EntityId,
    pub action: ContentKey,
    pub until: SimTime,
}

impl Default for ActionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionPipeline")
            .field("definitions", &self.definitions.len())
            .field("validators", &self.validators.len())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl ActionPipeline {
    /// A pipeline with only the [`DefaultValidator`] installed
    pub fn new() -> Self {
        Self {
            definitions: AHashMap::new(),
            validators: vec![Rc::new(DefaultValidator)],
            handlers: Vec::new(),
            cooldowns: AHashMap::new(),
        }
    }

    /// Register or replace a definition
    pub fn register(&mut self, def: ActionDef) -> Result<()> {
        if !def.key.is_valid() {
            warn!(target: "sim_kernel::actions", "ignoring action with empty key");
            return Err(KernelError::InvalidKey(def.key.to_string()));
        }
        if self.definitions.contains_key(&def.key) {
            warn!(target: "sim_kernel::actions", "replacing action definition '{}'", def.key);
        }
        self.definitions.insert(def.key.clone(), Rc::new(def));
        Ok(())
    }

    pub fn definition(&self, key: &str) -> Option<&Rc<ActionDef>> {
        self.definitions.get(key)
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Insert keeping descending priority; equal priorities keep insertion order
    pub fn add_validator(&mut self, validator: Rc<dyn ActionValidator>) {
        let at = self
            .validators
            .iter()
            .position(|v| v.priority() < validator.priority())
            .unwrap_or(self.validators.len());
        self.validators.insert(at, validator);
    }

    pub fn validator_names(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn add_handler(&mut self, handler: Rc<dyn ActionHandler>) {
        self.handlers.push(handler);
    }

    pub fn cooldown_until(&self, actor: EntityId, action: &str) -> Option<SimTime> {
        self.cooldowns.get(&actor).and_then(|m| m.get(action)).copied()
    }

    /// Seconds until `action` is usable again by `actor`; zero when ready
    pub fn cooldown_remaining(&self, actor: EntityId, action: &str, now: SimTime) -> f64 {
        self.cooldown_until(actor, action)
            .map(|until| (until - now).max(0.0))
            .unwrap_or(0.0)
    }

    pub fn clear_cooldowns(&mut self) {
        self.cooldowns.clear();
    }

    pub(crate) fn remove_actor(&mut self, actor: EntityId) {
        self.cooldowns.remove(&actor);
    }

    fn set_cooldown(&mut self, actor: EntityId, action: ContentKey, until: SimTime) {
        self.cooldowns.entry(actor).or_default().insert(action, until);
    }

    /// Deadlines sorted by actor then action
    pub fn cooldown_entries(&self) -> Vec<CooldownEntry> {
        let mut entries: Vec<CooldownEntry> = self
            .cooldowns
            .iter()
            .flat_map(|(actor, actions)| {
                actions.iter().map(move |(action, until)| CooldownEntry {
                    actor: *actor,
                    action: action.clone(),
                    until: *until,
                })
            })
            .collect();
        entries.sort_by(|a, b| (a.actor, &a.action).cmp(&(b.actor, &b.action)));
        entries
    }

    pub fn restore_cooldowns(&mut self, entries: &[CooldownEntry]) {
        self.cooldowns.clear();
        for entry in entries {
            self.set_cooldown(entry.actor, entry.action.clone(), entry.until);
        }
    }
}

impl World {
    pub fn register_action(&mut self, def: ActionDef) -> Result<()> {
        self.actions.register(def)
    }

    pub fn add_action_validator(&mut self, validator: Rc<dyn ActionValidator>) {
        self.actions.add_validator(validator);
    }

    pub fn add_action_handler(&mut self, handler: Rc<dyn ActionHandler>) {
        self.actions.add_handler(handler);
    }

    pub fn cooldown_remaining(&self, actor: EntityId, action: &str) -> f64 {
        self.actions.cooldown_remaining(actor, action, self.now())
    }

    /// Lookup, validators and cooldown, without executing anything
    pub fn can_perform_action(&self, request: &ActionRequest) -> std::result::Result<(), ActionRejection> {
        self.check_action(request).map(|_| ())
    }

    fn check_action(&self, request: &ActionRequest) -> std::result::Result<Rc<ActionDef>, ActionRejection> {
        let def = self
            .actions
            .definition(request.action.as_str())
            .cloned()
            .ok_or_else(|| ActionRejection::UnknownAction(request.action.clone()))?;

        for validator in &self.actions.validators {
            validator
                .validate(self, &def, request)
                .map_err(ActionRejection::Blocked)?;
        }

        let remaining = self
            .actions
            .cooldown_remaining(request.actor, request.action.as_str(), self.now());
        if remaining > TIME_EPSILON {
            return Err(ActionRejection::OnCooldown { remaining });
        }
        Ok(def)
    }

    /// Validate and execute an action request
    pub fn process_action(&mut self, mut request: ActionRequest) -> ActionResponse {
        let mut context = std::mem::take(&mut request.context);

        let def = match self.check_action(&request) {
            Ok(def) => def,
            Err(rejection) => {
                let reason = rejection.to_string();
                debug!(
                    target: "sim_kernel::actions",
                    "{} '{}' by {}: {}",
                    if rejection.result() == ActionResult::Failed { "failed" } else { "blocked" },
                    request.action,
                    request.actor,
                    reason
                );
                if rejection.result() == ActionResult::Blocked {
                    self.publish(Signal::ActionBlocked {
                        actor: request.actor,
                        target: request.target,
                        action: request.action.clone(),
                        reason: reason.clone(),
                    });
                }
                return ActionResponse::rejected(rejection.result(), reason, context);
            }
        };

        let handler = self
            .actions
            .handlers
            .iter()
            .find(|h| h.can_handle(request.action.as_str()))
            .cloned();
        let resolved = match handler {
            Some(handler) => handler.resolve_effects(self, &def, &request, &mut context),
            None => def.effects.clone(),
        };
        let mut effects: Vec<_> = def.costs.iter().map(|c| c.to_effect()).collect();
        effects.extend(resolved);

        let ctx = EffectContext::for_actor(request.actor).with_target(request.target);
        apply_all(&effects, self, &ctx);

        if def.cooldown_seconds > 0.0 && self.entities.contains(request.actor) {
            let until = self.now() + def.cooldown_seconds;
            self.actions.set_cooldown(request.actor, def.key.clone(), until);
        }

        self.publish(Signal::ActionCompleted {
            actor: request.actor,
            target: request.target,
            action: def.key.clone(),
        });
        ActionResponse::success(effects, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, i32);

    impl ActionValidator for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn priority(&self) -> i32 {
            self.1
        }

        fn validate(&self, _: &World, _: &ActionDef, _: &ActionRequest) -> std::result::Result<(), String> {
            Ok(())
        }
    }

    #[test]
    fn test_validators_sorted_by_priority() {
        let mut pipeline = ActionPipeline::new();
        pipeline.add_validator(Rc::new(Named("low", -5)));
        pipeline.add_validator(Rc::new(Named("high", 10)));
        pipeline.add_validator(Rc::new(Named("tie", 0)));
        assert_eq!(pipeline.validator_names(), vec!["high", "default", "tie", "low"]);
    }

    #[test]
    fn test_register_rejects_empty_key() {
        let mut pipeline = ActionPipeline::new();
        assert!(pipeline.register(ActionDef::new("")).is_err());
        assert!(pipeline.register(ActionDef::new("chop")).is_ok());
        assert!(pipeline.definition("chop").is_some());
    }

    #[test]
    fn test_cooldown_bookkeeping() {
        let mut pipeline = ActionPipeline::new();
        pipeline.set_cooldown(EntityId(1), ContentKey::new("chop"), SimTime::from_secs(5.0));
        assert_eq!(pipeline.cooldown_remaining(EntityId(1), "chop", SimTime::from_secs(2.0)), 3.0);
        assert_eq!(pipeline.cooldown_remaining(EntityId(1), "chop", SimTime::from_secs(6.0)), 0.0);
        assert_eq!(pipeline.cooldown_remaining(EntityId(2), "chop", SimTime::ZERO), 0.0);

        let entries = pipeline.cooldown_entries();
        pipeline.clear_cooldowns();
        assert!(pipeline.cooldown_until(EntityId(1), "chop").is_none());
        pipeline.restore_cooldowns(&entries);
        assert!(pipeline.cooldown_until(EntityId(1), "chop").is_some());
    }
}
