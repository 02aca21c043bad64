//! Chat platform adapter (Slack Web API)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use super::{IntegrationError, check_status, http_client};
use crate::config::ResolvedChatConfig;

const SERVICE: &str = "slack";

/// One message read from a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user: String,
    pub text: String,
    pub timestamp: String,
}

/// Read and post channel messages
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Most recent messages of a channel, by channel name; empty on any failure
    async fn fetch_channel_messages(&self, channel: &str, limit: u32) -> Vec<ChatMessage>;

    /// Post a message to a channel, by channel name
    async fn send_message(&self, channel: &str, text: &str) -> bool;
}

/// Slack Web API client authenticated with a bot token
pub struct SlackClient {
    http: Client,
    token: String,
    base_url: String,
}

impl SlackClient {
    pub fn from_config(config: &ResolvedChatConfig) -> Result<Self, IntegrationError> {
        debug!(base_url = %config.base_url, "SlackClient::from_config: called");
        Ok(Self {
            http: http_client()?,
            token: config.token.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET/POST a Web API method and unwrap Slack's `ok` envelope
    async fn call(&self, method: &str, request: reqwest::RequestBuilder) -> Result<Value, IntegrationError> {
        debug!(%method, "SlackClient::call: called");
        let response = request.bearer_auth(&self.token).send().await?;
        let body: Value = check_status(SERVICE, response).await?.json().await?;
        ok_envelope(body)
    }

    async fn channel_id(&self, name: &str) -> Result<String, IntegrationError> {
        let url = format!("{}/conversations.list", self.base_url);
        let body = self
            .call(
                "conversations.list",
                self.http
                    .get(url)
                    .query(&[("limit", "1000"), ("types", "public_channel,private_channel")]),
            )
            .await?;
        find_channel_id(&body, name).ok_or_else(|| IntegrationError::NotFound(format!("channel '{}'", name)))
    }

    async fn history(&self, channel: &str, limit: u32) -> Result<Vec<ChatMessage>, IntegrationError> {
        let id = self.channel_id(channel).await?;
        let url = format!("{}/conversations.history", self.base_url);
        let body = self
            .call(
                "conversations.history",
                self.http.get(url).query(&[("channel", id), ("limit", limit.to_string())]),
            )
            .await?;
        Ok(messages_from_history(&body))
    }

    async fn post(&self, channel: &str, text: &str) -> Result<(), IntegrationError> {
        let id = self.channel_id(channel).await?;
        let url = format!("{}/chat.postMessage", self.base_url);
        self.call(
            "chat.postMessage",
            self.http.post(url).json(&json!({ "channel": id, "text": text })),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ChatAdapter for SlackClient {
    async fn fetch_channel_messages(&self, channel: &str, limit: u32) -> Vec<ChatMessage> {
        debug!(%channel, limit, "SlackClient::fetch_channel_messages: called");
        match self.history(channel, limit).await {
            Ok(messages) => {
                info!(%channel, count = messages.len(), "Fetched chat messages");
                messages
            }
            Err(e) => {
                error!(%channel, error = %e, "Failed to fetch chat messages");
                Vec::new()
            }
        }
    }

    async fn send_message(&self, channel: &str, text: &str) -> bool {
        debug!(%channel, len = text.len(), "SlackClient::send_message: called");
        match self.post(channel, text).await {
            Ok(()) => true,
            Err(e) => {
                error!(%channel, error = %e, "Failed to send chat message");
                false
            }
        }
    }
}

fn ok_envelope(body: Value) -> Result<Value, IntegrationError> {
    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(body);
    }
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error")
        .to_string();
    Err(IntegrationError::Api {
        service: SERVICE,
        message,
    })
}

fn find_channel_id(body: &Value, name: &str) -> Option<String> {
    body.get("channels")?
        .as_array()?
        .iter()
        .find(|c| c.get("name").and_then(Value::as_str) == Some(name))
        .and_then(|c| c.get("id"))
        .and_then(Value::as_str)
        .map(String::from)
}

/// Keep only messages that carry both a user and text
fn messages_from_history(body: &Value) -> Vec<ChatMessage> {
    let Some(messages) = body.get("messages").and_then(Value::as_array) else {
        warn!("messages_from_history: no messages array");
        return Vec::new();
    };
    messages
        .iter()
        .filter_map(|m| {
            Some(ChatMessage {
                user: m.get("user")?.as_str()?.to_string(),
                text: m.get("text")?.as_str()?.to_string(),
                timestamp: m.get("ts").and_then(Value::as_str).unwrap_or_default().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope() {
        assert!(ok_envelope(json!({ "ok": true, "channels": [] })).is_ok());

        let err = ok_envelope(json!({ "ok": false, "error": "channel_not_found" })).unwrap_err();
        assert!(err.to_string().contains("channel_not_found"));

        assert!(ok_envelope(json!({})).is_err());
    }

    #[test]
    fn test_find_channel_id() {
        let body = json!({
            "ok": true,
            "channels": [
                { "id": "C1", "name": "general" },
                { "id": "C2", "name": "feedback-and-issues" }
            ]
        });
        assert_eq!(find_channel_id(&body, "feedback-and-issues"), Some("C2".to_string()));
        assert_eq!(find_channel_id(&body, "random"), None);
    }

    #[test]
    fn test_history_skips_incomplete_messages() {
        let body = json!({
            "ok": true,
            "messages": [
                { "user": "U1", "text": "Please add SSO", "ts": "1700000000.0001" },
                { "subtype": "channel_join", "text": "joined" },
                { "user": "U2", "bot_id": "B1" },
                { "user": "U3", "text": "Export is slow" }
            ]
        });
        let messages = messages_from_history(&body);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].timestamp, "1700000000.0001");
        assert_eq!(messages[1].user, "U3");
        assert_eq!(messages[1].timestamp, "");
    }

    #[tokio::test]
    async fn test_unreachable_api_fails_soft() {
        let client = SlackClient::from_config(&ResolvedChatConfig {
            token: "xoxb-test".to_string(),
            base_url: "http://127.0.0.1:9/api".to_string(),
        })
        .unwrap();

        assert!(client.fetch_channel_messages("general", 10).await.is_empty());
        assert!(!client.send_message("general", "hello").await);
    }
}
