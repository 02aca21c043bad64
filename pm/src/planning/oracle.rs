//! Planning oracle
//!
//! The oracle turns a natural-language goal into a plan artifact. The
//! [`PlanOracle`] trait is the seam; [`LlmPlanOracle`] backs it with an LLM
//! that answers through a `submit_plan` tool.

use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm::{CompletionRequest, LlmClient, LlmError, Message, StopReason, ToolDefinition};
use crate::prompts::{PlanPromptContext, PromptLoader};

const SUBMIT_PLAN: &str = "submit_plan";

/// Execution state of an oracle run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Finished normally
    Complete,
    /// Cut short (token limit); output may still be usable
    Incomplete,
    /// The oracle declined or failed the run
    Failed,
}

/// A finished oracle run
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRun {
    pub state: RunState,
    /// A JSON array of step objects, a string, or null
    pub final_output: Value,
}

impl PlanRun {
    pub fn complete(final_output: Value) -> Self {
        Self {
            state: RunState::Complete,
            final_output,
        }
    }

    /// The output flattened to text, for signature checks and logging
    pub fn output_text(&self) -> String {
        match &self.final_output {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Oracle call failures
#[derive(Debug, Error)]
pub enum OracleError {
    /// The oracle answered but its structured output was missing
    #[error("oracle produced no plan output: {0}")]
    NoOutput(String),

    /// The oracle's backend reported a server-side fault
    #[error("oracle server error: {0}")]
    Server(String),

    /// Any other call failure
    #[error("oracle call failed: {0}")]
    Call(String),
}

impl From<LlmError> for OracleError {
    fn from(e: LlmError) -> Self {
        if e.is_server_error() {
            OracleError::Server(e.to_string())
        } else {
            OracleError::Call(e.to_string())
        }
    }
}

/// External planning service
#[async_trait]
pub trait PlanOracle: Send + Sync {
    /// Run the oracle on a goal; `Ok(None)` means it returned nothing at all
    async fn run(&self, prompt: &str) -> Result<Option<PlanRun>, OracleError>;
}

/// Planning oracle backed by an LLM
pub struct LlmPlanOracle {
    client: Arc<dyn LlmClient>,
    system_prompt: String,
    max_tokens: u32,
}

impl LlmPlanOracle {
    pub fn new(client: Arc<dyn LlmClient>, loader: &PromptLoader, max_tokens: u32) -> Result<Self> {
        debug!(model = client.model(), max_tokens, "LlmPlanOracle::new: called");
        let system_prompt = loader.plan_prompt(&PlanPromptContext::default())?;
        Ok(Self {
            client,
            system_prompt,
            max_tokens,
        })
    }

    fn submit_plan_tool() -> ToolDefinition {
        ToolDefinition::new(
            SUBMIT_PLAN,
            "Submit the execution plan as an ordered list of steps",
            json!({
                "type": "object",
                "properties": {
                    "steps": {
                        "type": "array",
                        "description": "Ordered plan steps",
                        "items": {
                            "type": "object",
                            "properties": {
                                "description": {
                                    "type": "string",
                                    "description": "One concrete action, phrased as an imperative sentence"
                                }
                            },
                            "required": ["description"]
                        }
                    }
                },
                "required": ["steps"]
            }),
        )
    }

    /// Accept both `{"description": ...}` objects and bare strings
    fn steps_output(steps: &[Value]) -> Value {
        Value::Array(
            steps
                .iter()
                .map(|s| match s {
                    Value::String(text) => json!({ "description": text }),
                    other => other.clone(),
                })
                .collect(),
        )
    }
}

#[async_trait]
impl PlanOracle for LlmPlanOracle {
    async fn run(&self, prompt: &str) -> Result<Option<PlanRun>, OracleError> {
        debug!(prompt_len = prompt.len(), "LlmPlanOracle::run: called");
        let request = CompletionRequest {
            system_prompt: self.system_prompt.clone(),
            messages: vec![Message::user(prompt)],
            tools: vec![Self::submit_plan_tool()],
            max_tokens: self.max_tokens,
        };

        let response = self.client.complete(request).await?;
        info!(
            model = self.client.model(),
            stop_reason = ?response.stop_reason,
            tokens = response.usage.total(),
            "Oracle responded"
        );

        let state = match response.stop_reason {
            StopReason::Refusal => RunState::Failed,
            StopReason::MaxTokens => RunState::Incomplete,
            _ => RunState::Complete,
        };

        if let Some(call) = response.tool_call(SUBMIT_PLAN) {
            return match call.input.get("steps").and_then(Value::as_array) {
                Some(steps) => Ok(Some(PlanRun {
                    state,
                    final_output: Self::steps_output(steps),
                })),
                None => {
                    warn!(tool_call_id = %call.id, "run: submit_plan called without steps");
                    Err(OracleError::NoOutput("submit_plan called without a steps array".to_string()))
                }
            };
        }

        if let Some(text) = response.content.as_deref().filter(|t| !t.trim().is_empty()) {
            debug!("run: free text output");
            return Ok(Some(PlanRun {
                state,
                final_output: Value::String(text.to_string()),
            }));
        }

        if state == RunState::Failed {
            return Ok(Some(PlanRun {
                state,
                final_output: Value::Null,
            }));
        }

        debug!("run: empty response");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionResponse, TokenUsage, ToolCall};

    fn oracle(responses: Vec<Result<CompletionResponse, LlmError>>) -> (LlmPlanOracle, Arc<MockLlmClient>) {
        let client = Arc::new(MockLlmClient::new(responses));
        let oracle = LlmPlanOracle::new(client.clone(), &PromptLoader::embedded_only(), 2048).unwrap();
        (oracle, client)
    }

    fn tool_response(input: Value, stop_reason: StopReason) -> CompletionResponse {
        CompletionResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: "tu_1".to_string(),
                name: SUBMIT_PLAN.to_string(),
                input,
            }],
            stop_reason,
            usage: TokenUsage::default(),
        }
    }

    #[tokio::test]
    async fn test_tool_call_becomes_structured_output() {
        let (oracle, client) = oracle(vec![Ok(tool_response(
            json!({ "steps": [{ "description": "Research" }, "Write PRD"] }),
            StopReason::ToolUse,
        ))]);

        let run = oracle.run("Add CSV export").await.unwrap().unwrap();
        assert_eq!(run.state, RunState::Complete);
        assert_eq!(
            run.final_output,
            json!([{ "description": "Research" }, { "description": "Write PRD" }])
        );

        let requests = client.requests();
        assert_eq!(requests[0].messages[0].content, "Add CSV export");
        assert_eq!(requests[0].tools[0].name, SUBMIT_PLAN);
        assert_eq!(requests[0].max_tokens, 2048);
    }

    #[tokio::test]
    async fn test_tool_call_without_steps_is_no_output() {
        let (oracle, _) = oracle(vec![Ok(tool_response(json!({ "plan": "x" }), StopReason::ToolUse))]);
        assert!(matches!(oracle.run("goal").await, Err(OracleError::NoOutput(_))));
    }

    #[tokio::test]
    async fn test_text_and_empty_responses() {
        let (oracle, _) = oracle(vec![
            Ok(CompletionResponse::text("Step 1: research")),
            Ok(CompletionResponse::text("   ")),
        ]);

        let run = oracle.run("goal").await.unwrap().unwrap();
        assert_eq!(run.final_output, Value::String("Step 1: research".to_string()));
        assert!(oracle.run("goal").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stop_reasons_map_to_state() {
        let mut truncated = CompletionResponse::text("Step 1: partial");
        truncated.stop_reason = StopReason::MaxTokens;
        let mut refused = CompletionResponse::text("");
        refused.content = None;
        refused.stop_reason = StopReason::Refusal;

        let (oracle, _) = oracle(vec![Ok(truncated), Ok(refused)]);
        assert_eq!(oracle.run("goal").await.unwrap().unwrap().state, RunState::Incomplete);

        let run = oracle.run("goal").await.unwrap().unwrap();
        assert_eq!(run.state, RunState::Failed);
        assert_eq!(run.final_output, Value::Null);
    }

    #[tokio::test]
    async fn test_transport_errors_are_classified() {
        let (oracle, _) = oracle(vec![
            Err(LlmError::ApiError {
                status: 500,
                message: "InternalServerError".to_string(),
            }),
            Err(LlmError::ApiError {
                status: 400,
                message: "bad request".to_string(),
            }),
        ]);

        assert!(matches!(oracle.run("goal").await, Err(OracleError::Server(_))));
        assert!(matches!(oracle.run("goal").await, Err(OracleError::Call(_))));
    }
}
