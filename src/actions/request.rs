//! Requests, responses and the per-invocation context bag

use ahash::AHashMap;
use derive_more::Display;

use crate::core::types::{ContentKey, EntityId};
use crate::core::value::Value;
use crate::expr::Effect;

/// Outcome of processing a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    Success,
    /// A validator or cooldown refused the action
    Blocked,
    /// The request could not be interpreted (unknown action)
    Failed,
}

/// Typed key/value bag handlers use to pass data back to the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionContext {
    values: AHashMap<ContentKey, Value>,
}

impl ActionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<ContentKey>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub actor: EntityId,
    pub target: Option<EntityId>,
    pub action: ContentKey,
    pub context: ActionContext,
}

impl ActionRequest {
    pub fn new(actor: EntityId, action: &str) -> Self {
        Self {
            actor,
            target: None,
            action: ContentKey::new(action),
            context: ActionContext::new(),
        }
    }

    pub fn with_target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_value(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.set(key, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionResponse {
    pub result: ActionResult,
    pub block_reason: Option<String>,
    /// Effects that were applied, cost deductions first
    pub effects: Vec<Effect>,
    pub context: ActionContext,
}

impl ActionResponse {
    pub(crate) fn success(effects: Vec<Effect>, context: ActionContext) -> Self {
        Self {
            result: ActionResult::Success,
            block_reason: None,
            effects,
            context,
        }
    }

    pub(crate) fn rejected(result: ActionResult, reason: String, context: ActionContext) -> Self {
        Self {
            result,
            block_reason: Some(reason),
            effects: Vec::new(),
            context,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == ActionResult::Success
    }
}

/// Why an action cannot be performed right now
#[derive(Debug, Clone, PartialEq, Display)]
pub enum ActionRejection {
    #[display(fmt = "unknown action '{}'", _0)]
    UnknownAction(ContentKey),
    #[display(fmt = "{}", _0)]
    Blocked(String),
    #[display(fmt = "on cooldown for {:.2}s", remaining)]
    OnCooldown { remaining: f64 },
}

impl ActionRejection {
    pub fn result(&self) -> ActionResult {
        match self {
            ActionRejection::UnknownAction(_) => ActionResult::Failed,
            ActionRejection::Blocked(_) | ActionRejection::OnCooldown { .. } => ActionResult::Blocked,
        }
    }
}
