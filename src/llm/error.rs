//! LLM error types

use thiserror::Error;

/// LLM error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
}

impl LlmError {
    pub fn new(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::RateLimit, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::ServerError, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(LlmErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status from a provider.
    ///
    /// `body` is the raw response body. When it is an OpenAI-style error
    /// object its `message` is used.
    pub fn from_status(status: u16, body: &str) -> Self {
        let error_object = serde_json::from_str::<serde_json::Value>(body).ok();
        let detail = error_object
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(|e| e.get("message"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or(body);

        match status {
            401 | 403 => Self::auth(format!("Authentication failed: {detail}")),
            429 => Self::rate_limit(format!("Rate limited: {detail}")),
            400..=499 => Self::invalid_request(format!("Invalid request ({status}): {detail}")),
            500..=599 => Self::server_error(format!("Server error ({status}): {detail}")),
            _ => Self::unknown(format!("Unexpected status {status}: {detail}")),
        }
    }

    /// Classify a transport failure
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(format!("Request timeout: {err}"))
        } else if err.is_connect() {
            Self::network(format!("Connection failed: {err}"))
        } else {
            Self::unknown(format!("Request failed: {err}"))
        }
    }
}

/// Error classification for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Network issues, timeouts - retryable
    Network,
    /// Rate limited (429) - retryable with backoff
    RateLimit,
    /// Server error (5xx) - retryable
    ServerError,
    /// Authentication failed (401, 403) - not retryable
    Auth,
    /// Bad request (400) - not retryable
    InvalidRequest,
    /// Unknown error
    Unknown,
}

impl LlmErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::ServerError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(LlmError::from_status(401, "").kind, LlmErrorKind::Auth);
        assert_eq!(LlmError::from_status(403, "").kind, LlmErrorKind::Auth);
        assert_eq!(LlmError::from_status(400, "bad").kind, LlmErrorKind::InvalidRequest);
        assert_eq!(LlmError::from_status(503, "").kind, LlmErrorKind::ServerError);
        assert_eq!(LlmError::from_status(302, "").kind, LlmErrorKind::Unknown);
    }

    #[test]
    fn test_rate_limit_uses_error_message() {
        let err = LlmError::from_status(429, r#"{"error":{"message":"Too many requests"}}"#);
        assert_eq!(err.kind, LlmErrorKind::RateLimit);
        assert_eq!(err.message, "Rate limited: Too many requests");

        let err = LlmError::from_status(429, "slow down");
        assert_eq!(err.message, "Rate limited: slow down");
    }

    #[test]
    fn test_error_object_message_used() {
        let err = LlmError::from_status(401, r#"{"error":{"message":"Invalid API Key"}}"#);
        assert_eq!(err.message, "Authentication failed: Invalid API Key");
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(LlmErrorKind::Network.is_retryable());
        assert!(LlmErrorKind::RateLimit.is_retryable());
        assert!(LlmErrorKind::ServerError.is_retryable());
        assert!(!LlmErrorKind::Auth.is_retryable());
        assert!(!LlmErrorKind::InvalidRequest.is_retryable());
    }
}
