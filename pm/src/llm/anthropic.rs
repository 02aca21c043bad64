//! Anthropic Messages API client

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::transport::{self, RetryPolicy};
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage, ToolCall};
use crate::config::ResolvedLlmConfig;

const API_VERSION: &str = "2023-06-01";

/// Planning calls against Claude models
pub struct AnthropicClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl AnthropicClient {
    pub fn from_config(config: &ResolvedLlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "AnthropicClient::from_config: called");
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
        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens.min(self.max_tokens),
            "system": request.system_prompt,
            "messages": request.messages,
        });
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| json!({ "name": t.name, "description": t.description, "input_schema": t.input_schema }))
                .collect();
            body["tools"] = Value::Array(tools);
        }
        body
    }
}

fn stop_reason(raw: Option<&str>) -> StopReason {
    match raw {
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        Some("refusal") => StopReason::Refusal,
        _ => StopReason::EndTurn,
    }
}

/// Fold the content blocks into text plus tool calls; unknown block types are skipped
fn into_completion(reply: MessagesReply) -> CompletionResponse {
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in reply.content {
        match block {
            ContentBlock::Text { text: t } => text.push_str(&t),
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall { id, name, input }),
            ContentBlock::Other => {}
        }
    }

    CompletionResponse {
        content: Some(text).filter(|t| !t.trim().is_empty()),
        tool_calls,
        stop_reason: stop_reason(reply.stop_reason.as_deref()),
        usage: TokenUsage {
            input_tokens: reply.usage.input_tokens,
            output_tokens: reply.usage.output_tokens,
        },
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %self.model, tools = request.tools.len(), "AnthropicClient::complete: called");
        let url = format!("{}/v1/messages", self.base_url);
        let headers = [
            ("x-api-key", self.api_key.clone()),
            ("anthropic-version", API_VERSION.to_string()),
        ];

        let raw = transport::post_json(&self.http, &url, &headers, &self.request_body(&request), self.retry).await?;
        let reply: MessagesReply =
            serde_json::from_value(raw).map_err(|e| LlmError::InvalidResponse(format!("messages reply: {}", e)))?;
        Ok(into_completion(reply))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, ToolDefinition};

    fn client(max_tokens: u32) -> AnthropicClient {
        AnthropicClient {
            model: "claude-sonnet-4-20250514".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            http: Client::new(),
            max_tokens,
            retry: RetryPolicy::default(),
        }
    }

    fn request(max_tokens: u32, tools: Vec<ToolDefinition>) -> CompletionRequest {
        CompletionRequest {
            system_prompt: "You plan".to_string(),
            messages: vec![Message::user("Add CSV export")],
            tools,
            max_tokens,
        }
    }

    #[test]
    fn test_request_body_with_tools() {
        let tool = ToolDefinition::new("submit_plan", "Submit", json!({ "type": "object" }));
        let body = client(8192).request_body(&request(1000, vec![tool]));

        assert_eq!(body["system"], "You plan");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Add CSV export");
        assert_eq!(body["tools"][0]["name"], "submit_plan");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_max_tokens_capped_and_no_tools_key() {
        let body = client(1000).request_body(&request(5000, vec![]));
        assert_eq!(body["max_tokens"], 1000);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_reply_with_text_and_tool_use() {
        let reply: MessagesReply = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "Here is the plan." },
                { "type": "tool_use", "id": "tu_1", "name": "submit_plan", "input": { "steps": [] } },
                { "type": "thinking", "thinking": "..." }
            ],
            "stop_reason": "tool_use",
            "usage": { "input_tokens": 12, "output_tokens": 34 }
        }))
        .unwrap();

        let response = into_completion(reply);
        assert_eq!(response.content.as_deref(), Some("Here is the plan."));
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.usage.total(), 46);
    }

    #[test]
    fn test_stop_reason() {
        assert_eq!(stop_reason(Some("end_turn")), StopReason::EndTurn);
        assert_eq!(stop_reason(Some("max_tokens")), StopReason::MaxTokens);
        assert_eq!(stop_reason(Some("refusal")), StopReason::Refusal);
        assert_eq!(stop_reason(Some("pause_turn")), StopReason::EndTurn);
        assert_eq!(stop_reason(None), StopReason::EndTurn);
    }

    #[test]
    fn test_blank_text_is_no_content() {
        let reply: MessagesReply = serde_json::from_value(json!({
            "content": [{ "type": "text", "text": "  \n" }],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert!(into_completion(reply).content.is_none());
    }
}
