//! Plan generation
//!
//! - [`oracle`] - the planning oracle seam and its LLM implementation
//! - [`generator`] - sanitization, retry policy and the fallback plan
//! - [`normalizer`] - raw oracle output to uniform plan steps
//! - [`plan`] - plan and step types with snapshot persistence

pub mod generator;
pub mod normalizer;
pub mod oracle;
mod plan;

pub use generator::{
    AttemptState, ERROR_SIGNATURES, FALLBACK_OUTPUT, Outcome, PlanGenerator, classify_outcome, fallback_plan,
    sanitize_prompt,
};
pub use normalizer::{PlanShape, StepDraft, default_steps, normalize};
pub use oracle::{LlmPlanOracle, OracleError, PlanOracle, PlanRun, RunState};
pub use plan::{Plan, PlanStatus, PlanStep, next_step_id};
