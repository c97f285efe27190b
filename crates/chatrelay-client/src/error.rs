//! Error types for the stream consumer

use chatrelay_contracts::ValidationError;
use thiserror::Error;

/// Client stream consumer errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Authentication required: {0}")]
    Authentication(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Service unavailable (HTTP {status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("Response has no body")]
    MissingBody,

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ClientError {
    /// Map a non-2xx status and the relay's `error` message to an error kind.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => ClientError::Validation(message),
            401 | 403 => ClientError::Authentication(message),
            402 => ClientError::QuotaExhausted(message),
            429 => ClientError::RateLimited(message),
            _ => ClientError::Unavailable { status, message },
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ClientError::RateLimited(_))
    }

    /// Whether a caller-side retry could succeed. The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RateLimited(_) | ClientError::Timeout(_) => true,
            ClientError::Unavailable { status, .. } => *status >= 500,
            ClientError::Http(err) => err.is_connect() || err.is_timeout(),
            _ => false,
        }
    }
}

impl From<ValidationError> for ClientError {
    fn from(error: ValidationError) -> Self {
        ClientError::Validation(error.to_string())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ClientError::from_status(429, "slow down".into()),
            ClientError::RateLimited(m) if m == "slow down"
        ));
        assert!(matches!(
            ClientError::from_status(402, String::new()),
            ClientError::QuotaExhausted(_)
        ));
        assert!(matches!(
            ClientError::from_status(401, String::new()),
            ClientError::Authentication(_)
        ));
        assert!(matches!(
            ClientError::from_status(400, String::new()),
            ClientError::Validation(_)
        ));
        assert!(matches!(
            ClientError::from_status(503, String::new()),
            ClientError::Unavailable { status: 503, .. }
        ));
    }

    #[test]
    fn test_is_retryable() {
        assert!(ClientError::RateLimited(String::new()).is_retryable());
        assert!(ClientError::from_status(500, String::new()).is_retryable());
        assert!(!ClientError::QuotaExhausted(String::new()).is_retryable());
        assert!(!ClientError::Validation(String::new()).is_retryable());
    }
}
