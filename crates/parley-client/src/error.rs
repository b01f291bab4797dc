//! Error types for the completion gateway.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Error response body returned by OpenAI-compatible APIs.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// The error detail object from the API.
    pub error: ErrorDetail,
}

/// Detailed error information from the API.
#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    /// The error message text describing what went wrong.
    pub message: String,
}

/// Errors that can occur when requesting a completion.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network or HTTP transport failure.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// API authentication failure (HTTP 401).
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limit exceeded: {message}")]
    RateLimitError {
        /// Error text returned by the API.
        message: String,
        /// Suggested wait time, if the API sent a `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// Client configuration issue, such as an unparsable base URL.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The request exceeded the configured timeout.
    #[error("Timeout error")]
    TimeoutError,

    /// The request is malformed and was not sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The API answered with data that does not match the expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// API service unavailable (5xx).
    #[error("Service unavailable ({status}): {message}")]
    ServiceUnavailable {
        /// HTTP status code.
        status: u16,
        /// Error text returned by the API.
        message: String,
    },

    /// Any other non-success HTTP status.
    #[error("Request failed with status {status}: {message}")]
    RequestError {
        /// HTTP status code.
        status: u16,
        /// Error text returned by the API.
        message: String,
    },
}

impl ClientError {
    /// Check if this is an authentication error.
    pub const fn is_authentication_error(&self) -> bool {
        matches!(self, Self::AuthenticationError(_))
    }

    /// Get the retry-after duration if this is a rate limit error.
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitError { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status code of the failed response, if there was one.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::AuthenticationError(_) => Some(401),
            Self::RateLimitError { .. } => Some(429),
            Self::ServiceUnavailable { status, .. } | Self::RequestError { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_only_for_rate_limits() {
        let err = ClientError::RateLimitError {
            message: "slow down".to_string(),
            retry_after: Some(Duration::from_secs(3)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
        assert_eq!(err.status(), Some(429));
        assert_eq!(ClientError::TimeoutError.retry_after(), None);
    }
}
