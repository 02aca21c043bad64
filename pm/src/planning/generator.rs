//! Plan generation with retry and fallback
//!
//! Retry policy is a pure function ([`classify_outcome`]) plus a small state
//! machine ([`AttemptState`]); [`PlanGenerator`] only drives the calls.

use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::normalizer::{default_steps, normalize};
use super::oracle::{OracleError, PlanOracle, PlanRun, RunState};
use super::plan::Plan;

/// Oracle validation-error text that makes a run or its output unusable (also read by the normalizer)
pub const ERROR_SIGNATURES: &[&str] = &[
    "validation error",
    "LLMToolSchema",
    "InvalidAgentOutputError",
    "Input should be a valid",
    "{$",
];

/// `plan_output` of a fallback plan
pub const FALLBACK_OUTPUT: &str = "Planning oracle failed to generate a plan. Using default steps.";

const PROBLEM_STATEMENT: &str = "The problem statement will be defined based on user requirements";
const SUCCESS_METRICS: &str = "Success metrics will include user adoption, performance, and business impact";

// $name, ${name}, {$name}
static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{?\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").ok());

/// Strip interpolation markers and fill in the well-known placeholders
pub fn sanitize_prompt(prompt: &str) -> String {
    let replaced = match PLACEHOLDER.as_ref() {
        Some(re) => re
            .replace_all(prompt, |caps: &Captures| match &caps[1] {
                "problem_statement" => PROBLEM_STATEMENT.to_string(),
                "success_metrics" => SUCCESS_METRICS.to_string(),
                name => name.to_string(),
            })
            .into_owned(),
        None => prompt.to_string(),
    };
    replaced.replace('$', "")
}

/// What to do with one attempt's result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Retry,
    Fallback,
    Accept,
}

/// Decide how to treat an oracle result
pub fn classify_outcome(result: &Result<Option<PlanRun>, OracleError>) -> Outcome {
    match result {
        Err(OracleError::Server(_)) => Outcome::Fallback,
        Err(OracleError::NoOutput(_)) | Err(OracleError::Call(_)) => Outcome::Retry,
        Ok(None) => Outcome::Retry,
        Ok(Some(run)) if run.state == RunState::Failed => Outcome::Fallback,
        Ok(Some(run)) => {
            let text = run.output_text();
            if ERROR_SIGNATURES.iter().any(|s| text.contains(s)) {
                Outcome::Fallback
            } else {
                Outcome::Accept
            }
        }
    }
}

/// Progress of the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// About to make attempt `n` (1-based)
    Attempting(u32),
    Exhausted,
    Succeeded,
}

impl AttemptState {
    /// Next state after an attempt ended with `outcome`
    pub fn advance(self, outcome: Outcome, max_attempts: u32) -> Self {
        match (self, outcome) {
            (AttemptState::Attempting(_), Outcome::Accept) => AttemptState::Succeeded,
            (AttemptState::Attempting(_), Outcome::Fallback) => AttemptState::Exhausted,
            (AttemptState::Attempting(n), Outcome::Retry) if n < max_attempts => AttemptState::Attempting(n + 1),
            (AttemptState::Attempting(_), Outcome::Retry) => AttemptState::Exhausted,
            (terminal, _) => terminal,
        }
    }
}

/// Generates a plan for a goal, falling back to the default plan when needed
pub struct PlanGenerator {
    oracle: Arc<dyn PlanOracle>,
    max_attempts: u32,
}

impl PlanGenerator {
    pub fn new(oracle: Arc<dyn PlanOracle>, max_attempts: u32) -> Self {
        debug!(max_attempts, "PlanGenerator::new: called");
        Self {
            oracle,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Always returns a plan; oracle failures end in the fallback plan
    pub async fn generate_plan(&self, prompt: &str) -> Plan {
        debug!(prompt_len = prompt.len(), "generate_plan: called");
        let sanitized = sanitize_prompt(prompt);
        if sanitized != prompt {
            info!("Resolved template variables in prompt");
        }

        let mut state = AttemptState::Attempting(1);
        let mut accepted = None;

        while let AttemptState::Attempting(attempt) = state {
            info!(attempt, max = self.max_attempts, "Generating plan");
            let result = self.oracle.run(&sanitized).await;
            let outcome = classify_outcome(&result);

            match (&result, outcome) {
                (Err(e), Outcome::Fallback) => error!(attempt, error = %e, "Oracle server error, using default plan"),
                (Err(e), _) => warn!(attempt, error = %e, "Oracle attempt failed"),
                (Ok(None), _) => warn!(attempt, "Oracle returned no result"),
                (Ok(Some(_)), Outcome::Fallback) => warn!(attempt, "Oracle output unusable, using default plan"),
                (Ok(Some(_)), _) => debug!(attempt, "generate_plan: output accepted"),
            }

            state = state.advance(outcome, self.max_attempts);
            if state == AttemptState::Succeeded {
                accepted = result.ok().flatten();
            }
        }

        match accepted {
            Some(run) => {
                let steps = normalize(&run.final_output);
                info!(step_count = steps.len(), "Plan generated");
                Plan::new(prompt, run.final_output, steps)
            }
            None => {
                warn!("All attempts failed, using default plan");
                fallback_plan(prompt)
            }
        }
    }
}

/// The deterministic plan used when the oracle gives nothing usable
pub fn fallback_plan(prompt: &str) -> Plan {
    Plan::new(prompt, Value::String(FALLBACK_OUTPUT.to_string()), default_steps())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedOracle;
    use serde_json::json;

    #[test]
    fn test_sanitize_prompt() {
        assert_eq!(
            sanitize_prompt("Problem: {$problem_statement}"),
            format!("Problem: {}", PROBLEM_STATEMENT)
        );
        assert_eq!(
            sanitize_prompt("Measure ${success_metrics} and $owner"),
            format!("Measure {} and owner", SUCCESS_METRICS)
        );
        assert_eq!(sanitize_prompt("Budget $5"), "Budget 5");
        assert_eq!(sanitize_prompt("plain goal"), "plain goal");
    }

    #[test]
    fn test_classify_outcome() {
        assert_eq!(classify_outcome(&Err(OracleError::Server("500".into()))), Outcome::Fallback);
        assert_eq!(classify_outcome(&Err(OracleError::NoOutput("none".into()))), Outcome::Retry);
        assert_eq!(classify_outcome(&Err(OracleError::Call("timeout".into()))), Outcome::Retry);
        assert_eq!(classify_outcome(&Ok(None)), Outcome::Retry);

        let failed = PlanRun {
            state: RunState::Failed,
            final_output: json!("Step 1"),
        };
        assert_eq!(classify_outcome(&Ok(Some(failed))), Outcome::Fallback);

        let leaked = PlanRun::complete(json!("InvalidAgentOutputError: Input should be a valid list"));
        assert_eq!(classify_outcome(&Ok(Some(leaked))), Outcome::Fallback);

        let template = PlanRun::complete(json!([{ "description": "Define {$success_metrics}" }]));
        assert_eq!(classify_outcome(&Ok(Some(template))), Outcome::Fallback);

        let truncated = PlanRun {
            state: RunState::Incomplete,
            final_output: json!("Step 1: research"),
        };
        assert_eq!(classify_outcome(&Ok(Some(truncated))), Outcome::Accept);
    }

    #[test]
    fn test_attempt_state_transitions() {
        let s = AttemptState::Attempting(1);
        assert_eq!(s.advance(Outcome::Retry, 3), AttemptState::Attempting(2));
        assert_eq!(AttemptState::Attempting(3).advance(Outcome::Retry, 3), AttemptState::Exhausted);
        assert_eq!(s.advance(Outcome::Fallback, 3), AttemptState::Exhausted);
        assert_eq!(s.advance(Outcome::Accept, 3), AttemptState::Succeeded);
        assert_eq!(AttemptState::Succeeded.advance(Outcome::Retry, 3), AttemptState::Succeeded);
        assert_eq!(AttemptState::Exhausted.advance(Outcome::Accept, 3), AttemptState::Exhausted);
    }

    #[tokio::test]
    async fn test_transient_errors_then_success_uses_output() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Err(OracleError::NoOutput("StepsOrError was None".into())),
            Err(OracleError::Call("connection reset".into())),
            Ok(Some(PlanRun::complete(json!([
                { "description": "Interview customers" },
                { "description": "Draft PRD" }
            ])))),
        ]));
        let generator = PlanGenerator::new(oracle.clone(), 3);

        let plan = generator.generate_plan("Add CSV export").await;
        assert_eq!(oracle.calls(), 3);
        assert_ne!(plan.plan_output, json!(FALLBACK_OUTPUT));
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].description, "Interview customers");
        assert_eq!(plan.original_prompt, "Add CSV export");
    }

    #[tokio::test]
    async fn test_exhausted_retries_give_fallback() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(None), Ok(None), Ok(None), Ok(None)]));
        let generator = PlanGenerator::new(oracle.clone(), 3);

        let plan = generator.generate_plan("goal").await;
        assert_eq!(oracle.calls(), 3);
        assert_eq!(plan, fallback_plan("goal"));
    }

    #[tokio::test]
    async fn test_server_error_short_circuits() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Err(OracleError::Server("InternalServerError".into())),
            Ok(Some(PlanRun::complete(json!("Step 1: never reached")))),
        ]));
        let generator = PlanGenerator::new(oracle.clone(), 3);

        let plan = generator.generate_plan("goal").await;
        assert_eq!(oracle.calls(), 1);
        assert_eq!(plan.steps, default_steps());
    }

    #[tokio::test]
    async fn test_provider_500_is_one_request_then_fallback() {
        use crate::config::ResolvedLlmConfig;
        use crate::planning::LlmPlanOracle;
        use crate::prompts::PromptLoader;
        use crate::testing::StubHttpServer;

        let server = StubHttpServer::start(500, r#"{"type":"error","error":{"type":"api_error"}}"#)
            .await
            .unwrap();
        let client = crate::llm::create_client(&ResolvedLlmConfig {
            provider: "anthropic".to_string(),
            model: "claude-test".to_string(),
            api_key: "key".to_string(),
            base_url: server.url(""),
            max_tokens: 1024,
            timeout_ms: 5000,
        })
        .unwrap();
        let oracle = LlmPlanOracle::new(client, &PromptLoader::embedded_only(), 1024).unwrap();
        let generator = PlanGenerator::new(Arc::new(oracle), 3);

        let plan = generator.generate_plan("Add CSV export").await;
        assert_eq!(server.hits(), 1);
        assert_eq!(plan, fallback_plan("Add CSV export"));
    }

    #[tokio::test]
    async fn test_oracle_sees_sanitized_prompt() {
        let oracle = Arc::new(ScriptedOracle::new(vec![Ok(Some(PlanRun::complete(json!(
            "Step 1: research"
        ))))]));
        let generator = PlanGenerator::new(oracle.clone(), 3);

        let plan = generator.generate_plan("Goal with {$problem_statement}").await;
        assert_eq!(oracle.prompts(), vec![format!("Goal with {}", PROBLEM_STATEMENT)]);
        assert_eq!(plan.original_prompt, "Goal with {$problem_statement}");
    }
}
