//! Validation and effect resolution seams of the pipeline

use crate::actions::definition::ActionDef;
use crate::actions::request::{ActionContext, ActionRequest};
use crate::ecs::world::World;
use crate::expr::{all_pass, Effect, EffectContext};

/// A check run before an action executes
///
/// Validators run in descending priority; the first `Err` blocks the action
/// and its message becomes the block reason.
pub trait ActionValidator {
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        0
    }

    fn validate(&self, world: &World, def: &ActionDef, request: &ActionRequest) -> Result<(), String>;
}

/// Supplies effects for actions it recognizes instead of the definition's list
pub trait ActionHandler {
    fn can_handle(&self, action: &str) -> bool;

    fn resolve_effects(
        &self,
        world: &World,
        def: &ActionDef,
        request: &ActionRequest,
        context: &mut ActionContext,
    ) -> Vec<Effect>;
}

/// Actor and target existence, tags, range, costs and custom conditions
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultValidator;

impl ActionValidator for DefaultValidator {
    fn name(&self) -> &str {
        "default"
    }

    fn validate(&self, world: &World, def: &ActionDef, request: &ActionRequest) -> Result<(), String> {
        let entities = world.entities();
        let actor = entities
            .get(request.actor)
            .ok_or_else(|| format!("actor {} not found", request.actor))?;

        let target = match request.target {
            Some(id) => Some(
                entities
                    .get(id)
                    .ok_or_else(|| format!("target {} not found", id))?,
            ),
            None if def.target_required => return Err("target required".to_string()),
            None => None,
        };

        if let Some(tag) = def.required_actor_tags.iter().find(|t| !actor.has_tag(t.as_str())) {
            return Err(format!("actor lacks tag '{}'", tag));
        }
        if let Some(tag) = def.forbidden_actor_tags.iter().find(|t| actor.has_tag(t.as_str())) {
            return Err(format!("actor has forbidden tag '{}'", tag));
        }

        if let Some(target) = target {
            if let Some(tag) = def
                .required_target_tags
                .iter()
                .find(|t| !target.has_tag(t.as_str()))
            {
                return Err(format!("target lacks tag '{}'", tag));
            }
            if let Some(range) = def.max_range {
                match world.spatial().distance(actor.id(), target.id()) {
                    Some(d) if d <= range => {}
                    Some(d) => return Err(format!("target out of range ({:.1} > {:.1})", d, range)),
                    None => return Err("target position unknown".to_string()),
                }
            }
        } else if !def.required_target_tags.is_empty() {
            return Err("target required".to_string());
        }

        for cost in &def.costs {
            let have = actor.stat(cost.stat.as_str()).unwrap_or(0.0);
            if have < cost.amount {
                return Err(format!(
                    "insufficient {}: need {}, have {}",
                    cost.stat, cost.amount, have
                ));
            }
        }

        let ctx = EffectContext::for_actor(request.actor).with_target(request.target);
        if !all_pass(&def.conditions, world, &ctx) {
            return Err("conditions not met".to_string());
        }
        Ok(())
    }
}
