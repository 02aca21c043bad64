//! Plan workflow controller
//!
//! Generate a plan, run the review loop until the user approves or quits,
//! then persist the approved plan and hand it to the dispatcher.

use std::path::PathBuf;

use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use super::dispatcher::{CompletionDispatcher, WorkflowResults};
use crate::planning::{Plan, PlanGenerator};
use crate::review::{ParsedInput, Prompter, ReviewSession, Transition, read_action, render_plan};

/// How a workflow run ended
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    Completed(Box<WorkflowResults>),
    Quit,
}

/// Drives one goal from plan generation to dispatch
pub struct WorkflowController {
    generator: PlanGenerator,
    dispatcher: CompletionDispatcher,
    plan_path: PathBuf,
    max_invalid_inputs: u32,
}

impl WorkflowController {
    pub fn new(
        generator: PlanGenerator,
        dispatcher: CompletionDispatcher,
        plan_path: PathBuf,
        max_invalid_inputs: u32,
    ) -> Self {
        debug!(?plan_path, max_invalid_inputs, "WorkflowController::new: called");
        Self {
            generator,
            dispatcher,
            plan_path,
            max_invalid_inputs,
        }
    }

    /// Run the whole workflow for `goal`
    pub async fn run(&self, goal: &str, prompter: &mut dyn Prompter) -> Result<WorkflowOutcome> {
        info!("Starting plan workflow");
        println!("{} Generating plan...", "→".bright_blue());
        let plan = self.generator.generate_plan(goal).await;

        let Some(plan) = self.review(plan, prompter)? else {
            info!("Workflow quit by user");
            return Ok(WorkflowOutcome::Quit);
        };

        plan.save(&self.plan_path).context("Failed to save approved plan")?;
        println!("{} Plan approved, continuing workflow...", "✓".green());

        let results = self.dispatcher.dispatch(&plan).await?;
        info!(prd_sent = results.prd_sent, notified = results.notified, "Workflow completed");
        Ok(WorkflowOutcome::Completed(Box::new(results)))
    }

    /// The review loop; `None` when the user quits
    pub fn review(&self, plan: Plan, prompter: &mut dyn Prompter) -> Result<Option<Plan>> {
        debug!("review: called");
        let mut session = ReviewSession::new(plan);

        loop {
            println!("{}", render_plan(session.plan()));

            let action = match read_action(&mut *prompter, &session.plan().steps, self.max_invalid_inputs) {
                Ok(ParsedInput::Valid(action)) => action,
                Ok(ParsedInput::Invalid(msg)) => {
                    println!("{}", msg.red());
                    continue;
                }
                Err(e) if e.is_quit() => {
                    println!("\nExiting...");
                    return Ok(None);
                }
                Err(e) => return Err(e).context("Failed to read user input"),
            };

            match session.apply(action) {
                Ok(Transition::Approved) => return Ok(Some(session.into_plan())),
                Ok(Transition::Quit) => return Ok(None),
                Ok(Transition::Toggled { index, checked }) => {
                    let state = if checked { "checked" } else { "unchecked" };
                    println!("Step {} {}", index + 1, state);
                }
                Ok(Transition::Edited { .. }) => println!("{}", "Step updated successfully".green()),
                Ok(Transition::Added { .. }) => println!("{}", "New step added successfully".green()),
                Ok(Transition::Skipped) => println!("Skipping to next step..."),
                Err(e) => println!("{}", e.to_string().red()),
            }
        }
    }
}
