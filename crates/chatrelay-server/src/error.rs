//! Relay errors and their JSON envelope

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chatrelay_contracts::{ErrorBody, ValidationError};
use thiserror::Error;
use tracing::error;

const UNAVAILABLE_MESSAGE: &str = "AI service temporarily unavailable";

#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Rate limits exceeded, please try again later.")]
    RateLimited,

    #[error("Payment required, please add credits to continue.")]
    QuotaExhausted,

    #[error("Upstream returned HTTP {status}")]
    UpstreamStatus { status: u16 },

    #[error("Upstream request failed: {0}")]
    UpstreamTransport(#[from] reqwest::Error),

    #[error("Upstream did not respond in time")]
    UpstreamTimeout,

    #[error("Upstream API key is not configured")]
    MissingCredential,
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RelayError::QuotaExhausted => StatusCode::PAYMENT_REQUIRED,
            RelayError::UpstreamStatus { .. }
            | RelayError::UpstreamTransport(_)
            | RelayError::UpstreamTimeout
            | RelayError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller. Internal failures collapse to generic copy.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::UpstreamStatus { .. }
            | RelayError::UpstreamTransport(_)
            | RelayError::UpstreamTimeout => UNAVAILABLE_MESSAGE.to_string(),
            RelayError::MissingCredential => "Server configuration error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Chat relay failed");
        }
        (status, Json(ErrorBody::new(self.public_message()))).into_response()
    }
}
