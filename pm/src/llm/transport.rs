//! Shared HTTP transport for the provider clients
//!
//! One POST, resent only when the provider asks us to slow down (408/429).
//! Server faults and network errors are returned at once: the planning
//! retry budget and the fallback plan live above this layer.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::LlmError;

/// Longest we honor a server's `retry-after`
const MAX_RETRY_AFTER_SECS: u64 = 30;

/// How many times to resend a throttled request, and the fixed wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Wait before resending: the server's `retry-after` (capped) or the fixed delay
    pub fn wait(&self, retry_after_secs: Option<u64>) -> Duration {
        match retry_after_secs {
            Some(secs) => Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)),
            None => self.delay,
        }
    }
}

/// Statuses that mean "try again shortly": request timeout and rate limit
pub fn is_throttled(status: u16) -> bool {
    matches!(status, 408 | 429)
}

fn retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

fn status_error(status: u16, retry_after_secs: Option<u64>, message: String) -> LlmError {
    if status == 429 {
        LlmError::RateLimited {
            retry_after: Duration::from_secs(retry_after_secs.unwrap_or(MAX_RETRY_AFTER_SECS)),
        }
    } else {
        LlmError::ApiError { status, message }
    }
}

/// POST `body` as JSON and return the successful response's JSON body
pub async fn post_json(
    http: &Client,
    url: &str,
    headers: &[(&str, String)],
    body: &Value,
    policy: RetryPolicy,
) -> Result<Value, LlmError> {
    debug!(%url, max_retries = policy.max_retries, "post_json: called");
    let mut retry = 0;

    loop {
        let mut builder = http.post(url).json(body);
        for (name, value) in headers {
            builder = builder.header(*name, value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            debug!(error = %e, "post_json: network error");
            LlmError::Network(e)
        })?;
        if response.status().is_success() {
            return response.json::<Value>().await.map_err(LlmError::Network);
        }

        let status = response.status().as_u16();
        let hint = retry_after(&response);
        let message = response.text().await.unwrap_or_default();
        debug!(retry, status, "post_json: error status");
        let error = status_error(status, hint, message);

        if !is_throttled(status) || retry >= policy.max_retries {
            return Err(error);
        }
        retry += 1;
        let wait = policy.wait(hint);
        warn!(retry, wait_ms = wait.as_millis() as u64, error = %error, "post_json: throttled, resending");
        tokio::time::sleep(wait).await;
    }
}
