//! LLM transport errors

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// HTTP 5xx from the provider
    pub fn is_server_error(&self) -> bool {
        matches!(self, LlmError::ApiError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_server_error() {
        let api = |status| LlmError::ApiError {
            status,
            message: String::new(),
        };
        assert!(api(500).is_server_error());
        assert!(api(529).is_server_error());
        assert!(!api(400).is_server_error());
        assert!(
            !LlmError::RateLimited {
                retry_after: Duration::from_secs(1)
            }
            .is_server_error()
        );
        assert!(!LlmError::InvalidResponse("nope".to_string()).is_server_error());
    }
}
