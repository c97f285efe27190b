use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::RelayError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Claims {
    sub: Option<String>,
    exp: Option<usize>,
}

/// Bearer-token check for the chat endpoint.
///
/// Open when neither API keys nor a JWT secret are configured.
pub struct RelayAuth {
    key_hashes: HashSet<String>,
    jwt_key: Option<DecodingKey>,
}

impl RelayAuth {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key_hashes: config.api_keys.iter().map(|key| hash_key(key)).collect(),
            jwt_key: config
                .jwt_secret
                .as_ref()
                .map(|secret| DecodingKey::from_secret(secret.as_bytes())),
        }
    }

    pub fn is_required(&self) -> bool {
        !self.key_hashes.is_empty() || self.jwt_key.is_some()
    }

    pub fn authorize(&self, header: Option<&HeaderValue>) -> bool {
        if !self.is_required() {
            return true;
        }

        let Some(token) = extract_bearer(header) else {
            return false;
        };

        if self.key_hashes.contains(&hash_key(&token)) {
            return true;
        }

        if let Some(key) = &self.jwt_key {
            let validation = Validation::new(Algorithm::HS256);
            if decode::<Claims>(&token, key, &validation).is_ok() {
                return true;
            }
        }

        false
    }
}

fn hash_key(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

pub async fn auth_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.auth.authorize(req.headers().get(AUTHORIZATION)) {
        return next.run(req).await;
    }

    debug!(path = %req.uri().path(), "Rejected request without valid bearer token");
    RelayError::Unauthorized.into_response()
}

fn extract_bearer(header: Option<&HeaderValue>) -> Option<String> {
    let value = header?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
