//! OpenAI Chat Completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

use super::transport::{self, RetryPolicy};
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage, ToolCall};
use crate::config::ResolvedLlmConfig;

/// Model families that take `max_completion_tokens` instead of `max_tokens`
const COMPLETION_TOKEN_MODELS: &[&str] = &["gpt-5", "o1", "o3", "o4"];

/// Planning calls against OpenAI-compatible endpoints
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl OpenAIClient {
    pub fn from_config(config: &ResolvedLlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "OpenAIClient::from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
            retry: RetryPolicy::default(),
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut messages = vec![json!({ "role": "system", "content": request.system_prompt })];
        messages.extend(request.messages.iter().map(|m| json!(m)));

        let token_key = if COMPLETION_TOKEN_MODELS.iter().any(|p| self.model.starts_with(p)) {
            "max_completion_tokens"
        } else {
            "max_tokens"
        };

        let mut body = json!({ "model": self.model, "messages": messages });
        body[token_key] = json!(request.max_tokens.min(self.max_tokens));

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": { "name": t.name, "description": t.description, "parameters": t.input_schema },
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = json!("auto");
        }
        body
    }
}

fn stop_reason(raw: Option<&str>) -> StopReason {
    match raw {
        Some("tool_calls") | Some("function_call") => StopReason::ToolUse,
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::Refusal,
        _ => StopReason::EndTurn,
    }
}

/// Arguments arrive as a JSON string; unparseable arguments become `null`
fn parse_arguments(name: &str, arguments: &str) -> Value {
    serde_json::from_str(arguments).unwrap_or_else(|e| {
        warn!(%name, error = %e, "parse_arguments: tool arguments are not JSON");
        Value::Null
    })
}

fn into_completion(reply: ChatReply) -> CompletionResponse {
    let usage = reply
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    let Some(choice) = reply.choices.into_iter().next() else {
        return CompletionResponse {
            content: None,
            tool_calls: Vec::new(),
            stop_reason: StopReason::EndTurn,
            usage,
        };
    };

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|tc| ToolCall {
            input: parse_arguments(&tc.function.name, &tc.function.arguments),
            id: tc.id,
            name: tc.function.name,
        })
        .collect();

    CompletionResponse {
        content: choice.message.content.filter(|t| !t.trim().is_empty()),
        tool_calls,
        stop_reason: stop_reason(choice.finish_reason.as_deref()),
        usage,
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %self.model, tools = request.tools.len(), "OpenAIClient::complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let headers = [("Authorization", format!("Bearer {}", self.api_key))];

        let raw = transport::post_json(&self.http, &url, &headers, &self.request_body(&request), self.retry).await?;
        let reply: ChatReply =
            serde_json::from_value(raw).map_err(|e| LlmError::InvalidResponse(format!("chat completion: {}", e)))?;
        Ok(into_completion(reply))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    id: String,
    function: Function,
}

#[derive(Debug, Deserialize)]
struct Function {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
