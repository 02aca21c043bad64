//! Review actions and how they are read from the user

use colored::Colorize;
use tracing::{debug, warn};

use super::prompter::{PromptError, Prompter};
use crate::planning::PlanStep;

/// One user command against a plan under review; step indices are 0-based
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    Toggle(usize),
    Edit { index: usize, text: String },
    Add(String),
    Skip,
    Approve,
    Quit,
}

/// The single-character action selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKey {
    Check,
    Edit,
    Add,
    Skip,
    Approve,
    Quit,
}

impl ActionKey {
    /// `c`, `e`, `a`, `s`, `x` or `q`, case-insensitive
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "c" => Some(ActionKey::Check),
            "e" => Some(ActionKey::Edit),
            "a" => Some(ActionKey::Add),
            "s" => Some(ActionKey::Skip),
            "x" => Some(ActionKey::Approve),
            "q" => Some(ActionKey::Quit),
            _ => None,
        }
    }
}

/// Result of reading one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput<T> {
    Valid(T),
    /// Rejected input, with the message shown to the user
    Invalid(String),
}

/// Parse a 1-based step number into a 0-based index
pub fn parse_step_number(input: &str) -> ParsedInput<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if n >= 1 => ParsedInput::Valid(n - 1),
        Ok(_) => ParsedInput::Invalid("Invalid step number".to_string()),
        Err(_) => ParsedInput::Invalid("Please enter a valid number".to_string()),
    }
}

/// Read the action selector, re-asking on bad input
///
/// After `max_invalid` consecutive bad selectors the reader gives up and
/// yields [`ActionKey::Skip`] so the caller re-displays the plan.
pub fn read_selector<P: Prompter + ?Sized>(prompter: &mut P, max_invalid: u32) -> Result<ActionKey, PromptError> {
    debug!(max_invalid, "read_selector: called");
    for attempt in 1..=max_invalid.max(1) {
        let line = prompter.read_line("\nChoose action: ")?;
        if let Some(key) = ActionKey::parse(&line) {
            return Ok(key);
        }
        warn!(attempt, input = %line.trim(), "read_selector: invalid choice");
        println!("{}", "Invalid choice. Please try again.".red());
    }
    println!("{}", "Too many invalid choices, showing the plan again.".yellow());
    Ok(ActionKey::Skip)
}

/// Read a full action: the selector plus any follow-up prompts
pub fn read_action<P: Prompter + ?Sized>(
    prompter: &mut P,
    steps: &[PlanStep],
    max_invalid: u32,
) -> Result<ParsedInput<ReviewAction>, PromptError> {
    let key = read_selector(prompter, max_invalid)?;
    debug!(?key, "read_action: selector read");

    let action = match key {
        ActionKey::Check => {
            let line = prompter.read_line("Enter step number to check/uncheck: ")?;
            match parse_step_number(&line) {
                ParsedInput::Valid(index) => ReviewAction::Toggle(index),
                ParsedInput::Invalid(msg) => return Ok(ParsedInput::Invalid(msg)),
            }
        }
        ActionKey::Edit => {
            let line = prompter.read_line("Enter step number to edit: ")?;
            let index = match parse_step_number(&line) {
                ParsedInput::Valid(index) => index,
                ParsedInput::Invalid(msg) => return Ok(ParsedInput::Invalid(msg)),
            };
            // out-of-range indices go straight to the state machine, which rejects them
            let text = match steps.get(index) {
                Some(step) => {
                    println!("Current: {}", step.description);
                    prompter.read_line("New description: ")?
                }
                None => String::new(),
            };
            ReviewAction::Edit { index, text }
        }
        ActionKey::Add => ReviewAction::Add(prompter.read_line("Enter new step description: ")?),
        ActionKey::Skip => ReviewAction::Skip,
        ActionKey::Approve => ReviewAction::Approve,
        ActionKey::Quit => ReviewAction::Quit,
    };
    Ok(ParsedInput::Valid(action))
}
