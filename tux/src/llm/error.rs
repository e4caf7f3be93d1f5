//! Model gateway error types

use thiserror::Error;

/// Errors that can occur while talking to the inference endpoint
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection, timeout or server-side failure reaching the endpoint
    #[error("Model endpoint unavailable: {0}")]
    Unavailable(String),

    /// The endpoint answered with something we cannot interpret
    #[error("Invalid response from model endpoint: {0}")]
    Protocol(String),
}

impl GatewayError {
    /// Check if the same turn may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: &str) -> Self {
        if matches!(status, 408 | 429) || status >= 500 {
            GatewayError::Unavailable(format!("HTTP {}: {}", status, body))
        } else {
            GatewayError::Protocol(format!("HTTP {}: {}", status, body))
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Protocol(e.to_string())
        } else {
            GatewayError::Unavailable(e.to_string())
        }
    }
}
