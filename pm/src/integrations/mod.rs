//! External collaborators
//!
//! Thin HTTP wrappers over the chat, document and issue-tracker APIs. Every
//! trait method fails soft: errors are logged inside the adapter and the
//! caller sees an empty list, `false` or `None`.

mod chat;
mod docs;
mod issues;

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

pub use chat::{ChatAdapter, ChatMessage, SlackClient};
pub use docs::{DatabaseSchema, DocumentStore, MAX_BLOCK_CHARS, NotionClient, StatusProperty, chunk_text};
pub use issues::{GitHubClient, IssueRecord, IssueRequest, IssueTracker, Priority, derive_labels};

const HTTP_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("pmagent/", env!("CARGO_PKG_VERSION"));

/// Adapter failures; never escape the adapter traits
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Status { service: &'static str, status: u16, body: String },

    #[error("{service} API error: {message}")]
    Api { service: &'static str, message: String },

    #[error("not found: {0}")]
    NotFound(String),
}

/// Shared client settings for all adapters
fn http_client() -> Result<Client, IntegrationError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?)
}

/// Turn a non-success response into a [`IntegrationError::Status`]
async fn check_status(service: &'static str, response: reqwest::Response) -> Result<reqwest::Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IntegrationError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}
