use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::{MAX_CONTENT_CHARS, MAX_MESSAGES};

/// Reasons a chat request is rejected at the relay boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid JSON body")]
    InvalidJson,

    #[error("messages must be an array")]
    MessagesNotArray,

    #[error("messages must not be empty")]
    EmptyMessages,

    #[error("Too many messages (max {max})", max = MAX_MESSAGES)]
    TooManyMessages(usize),

    #[error("Invalid role at index {0}")]
    InvalidRole(usize),

    #[error("Invalid content at index {0}")]
    InvalidContent(usize),

    #[error("Message at index {0} exceeds {max} characters", max = MAX_CONTENT_CHARS)]
    ContentTooLong(usize),
}

/// JSON error envelope: `{ "error": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl From<&ValidationError> for ErrorBody {
    fn from(error: &ValidationError) -> Self {
        Self::new(error.to_string())
    }
}
