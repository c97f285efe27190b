//! Origin allow-list CORS policy
//!
//! The response `Access-Control-Allow-Origin` is always one of the configured
//! values: a recognised origin is answered with its allow-list entry, anything
//! else gets the default origin. Request header bytes are never echoed.

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, InvalidHeaderValue, ORIGIN, VARY,
        },
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::config::CorsConfig;

const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const ALLOW_METHODS: &str = "POST, OPTIONS";

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed: Vec<HeaderValue>,
    default_origin: HeaderValue,
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig) -> Result<Self, InvalidHeaderValue> {
        let allowed = config
            .allowed_origins
            .iter()
            .map(|origin| HeaderValue::from_str(origin.trim_end_matches('/')))
            .collect::<Result<Vec<_>, _>>()?;
        let default_origin =
            HeaderValue::from_str(config.default_origin.trim_end_matches('/'))?;
        Ok(Self {
            allowed,
            default_origin,
        })
    }

    /// Allow-origin value for a request carrying `origin`.
    pub fn allow_origin(&self, origin: Option<&HeaderValue>) -> HeaderValue {
        origin
            .and_then(|origin| {
                self.allowed
                    .iter()
                    .find(|allowed| allowed.as_bytes().eq_ignore_ascii_case(origin.as_bytes()))
            })
            .unwrap_or(&self.default_origin)
            .clone()
    }

    pub fn apply(&self, origin: Option<&HeaderValue>, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin(origin));
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }
}

/// Answers preflight requests and stamps CORS headers on every response.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req.headers().get(ORIGIN).cloned();

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    policy.apply(origin.as_ref(), response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(&CorsConfig {
            allowed_origins: vec![
                "https://app.example.com".to_string(),
                "http://localhost:5173/".to_string(),
            ],
            default_origin: "https://app.example.com".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_known_origin_is_allowed() {
        let origin = HeaderValue::from_static("http://localhost:5173");
        assert_eq!(policy().allow_origin(Some(&origin)), "http://localhost:5173");

        let shouty = HeaderValue::from_static("HTTPS://APP.EXAMPLE.COM");
        assert_eq!(policy().allow_origin(Some(&shouty)), "https://app.example.com");
    }

    #[test]
    fn test_unknown_origin_gets_default() {
        let origin = HeaderValue::from_static("https://evil.example.net");
        assert_eq!(policy().allow_origin(Some(&origin)), "https://app.example.com");
        assert_eq!(policy().allow_origin(None), "https://app.example.com");
    }

    #[test]
    fn test_apply_sets_all_headers() {
        let mut headers = HeaderMap::new();
        policy().apply(None, &mut headers);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], ALLOW_HEADERS);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
        assert_eq!(headers[VARY], "Origin");
    }

    #[test]
    fn test_rejects_unrepresentable_origin() {
        let config = CorsConfig {
            allowed_origins: vec!["https://ok.example".to_string()],
            default_origin: "bad\norigin".to_string(),
        };
        assert!(CorsPolicy::new(&config).is_err());
    }
}
