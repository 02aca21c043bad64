//! LLM client module
//!
//! Provides the transport used by the planning oracle: a provider-agnostic
//! `LlmClient` trait with Anthropic and OpenAI implementations.

use std::sync::Arc;

use tracing::debug;

mod anthropic;
pub mod client;
mod error;
mod openai;
mod transport;
mod types;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use transport::{RetryPolicy, is_throttled};
pub use types::{
    CompletionRequest, CompletionResponse, Message, Role, StopReason, TokenUsage, ToolCall, ToolDefinition,
};

use crate::config::ResolvedLlmConfig;

/// Create an LLM client for the configured provider
///
/// Supports "anthropic" and "openai" providers.
pub fn create_client(config: &ResolvedLlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicClient::from_config(config)?)),
        "openai" => Ok(Arc::new(OpenAIClient::from_config(config)?)),
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::InvalidResponse(format!(
                "Unknown LLM provider: '{}'. Supported: anthropic, openai",
                other
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(provider: &str) -> ResolvedLlmConfig {
        ResolvedLlmConfig {
            provider: provider.to_string(),
            model: "some-model".to_string(),
            api_key: "key".to_string(),
            base_url: "https://example.invalid".to_string(),
            max_tokens: 1024,
            timeout_ms: 1000,
        }
    }

    #[test]
    fn test_create_client_known_providers() {
        assert_eq!(create_client(&resolved("anthropic")).unwrap().model(), "some-model");
        assert_eq!(create_client(&resolved("openai")).unwrap().model(), "some-model");
    }

    #[test]
    fn test_create_client_unknown_provider() {
        let err = create_client(&resolved("portia")).err().unwrap();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }
}
