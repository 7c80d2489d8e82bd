//! Action definitions and the validation/execution pipeline

pub mod definition;
pub mod pipeline;
pub mod request;
pub mod validator;

pub use definition::{ActionDef, StatCost};
pub use pipeline::{ActionPipeline, CooldownEntry};
pub use request::{ActionContext, ActionRejection, ActionRequest, ActionResponse, ActionResult};
pub use validator::{ActionHandler, ActionValidator, DefaultValidator};
