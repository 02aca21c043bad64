//! Human review of a generated plan
//!
//! - [`machine`] - the `generated -> approved` state machine
//! - [`action`] - the action alphabet and the bounded input reader
//! - [`prompter`] - blocking line input (rustyline in production)
//! - [`render`] - plan and menu display

pub mod action;
pub mod machine;
pub mod prompter;
pub mod render;

pub use action::{ActionKey, ParsedInput, ReviewAction, parse_step_number, read_action, read_selector};
pub use machine::{ReviewError, ReviewSession, Transition};
pub use prompter::{PromptError, Prompter, ReadlinePrompter};
pub use render::render_plan;
