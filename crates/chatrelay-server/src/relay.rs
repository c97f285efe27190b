//! Chat relay endpoint
//!
//! Validates `{ "messages": [...] }`, opens one upstream streaming completion
//! and pipes the upstream SSE bytes back untouched. Only headers are set here.

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{
        HeaderName, StatusCode,
        header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chatrelay_contracts::{ChatRequest, ValidationError};
use futures::TryStreamExt;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::auth::auth_middleware;
use crate::cors::cors_middleware;
use crate::error::RelayError;
use crate::state::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Build the relay router: `/chat`, its edge-function alias, and `/health`.
pub fn relay_router(state: AppState) -> Router {
    let chat_routes = Router::new()
        .route("/chat", post(chat_completions))
        .route("/functions/v1/chat", post(chat_completions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(chat_routes)
        .layer(DefaultBodyLimit::max(state.body_limit_bytes))
        .layer(middleware::from_fn_with_state(
            state.cors.clone(),
            cors_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat_completions(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, RelayError> {
    let request_id = Uuid::new_v4();
    relay(state, body)
        .instrument(info_span!("chat", %request_id))
        .await
}

async fn relay(
    state: AppState,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, RelayError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            RelayError::PayloadTooLarge
        } else {
            RelayError::Validation(ValidationError::InvalidJson)
        }
    })?;

    let request = ChatRequest::from_slice(&body)
        .inspect_err(|err| debug!(error = %err, "Rejected chat request"))?;
    info!(messages = request.messages().len(), "Relaying chat request");

    let upstream = state.upstream.open_stream(&request).await?;
    Ok(stream_response(upstream))
}

/// Pass the upstream body through unbuffered. Dropping the returned body (client
/// disconnect) drops the upstream stream and closes that connection.
fn stream_response(upstream: reqwest::Response) -> Response {
    let stream = upstream
        .bytes_stream()
        .inspect_err(|err| warn!(error = %err, "Upstream stream interrupted"));

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
