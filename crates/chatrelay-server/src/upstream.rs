//! Client for the upstream chat-completion API

use chatrelay_contracts::{ChatMessage, ChatRequest};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::RelayError;

const DISABLE_SYSTEM_PROXY_ENV: &str = "CHATRELAY_DISABLE_SYSTEM_PROXY";

/// Upstream error bodies are logged, truncated to this many bytes.
const MAX_LOGGED_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct UpstreamClient {
    http_client: Client,
    url: String,
    model: String,
    system_prompt: Option<String>,
    api_key: Option<String>,
    response_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> reqwest::Result<Self> {
        let builder = Client::builder().connect_timeout(config.connect_timeout);
        let http_client = if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() || cfg!(test) {
            builder.no_proxy().build()?
        } else {
            builder.build()?
        };

        Ok(Self {
            http_client,
            url: config.url.clone(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            api_key: config.api_key.clone(),
            response_timeout: config.response_timeout,
        })
    }

    /// Send exactly one streaming completion request and return the response
    /// once its status is known to be successful.
    pub async fn open_stream(&self, request: &ChatRequest) -> Result<Response, RelayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RelayError::MissingCredential)?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": self.upstream_messages(request),
            "stream": true,
        });

        debug!(url = %self.url, model = %self.model, "Opening upstream stream");
        let send = self
            .http_client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send();
        let response = tokio::time::timeout(self.response_timeout, send)
            .await
            .map_err(|_| RelayError::UpstreamTimeout)??;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            status = status.as_u16(),
            body = %truncate(&body, MAX_LOGGED_ERROR_BODY),
            "Upstream rejected chat request"
        );

        Err(match status.as_u16() {
            429 => RelayError::RateLimited,
            402 => RelayError::QuotaExhausted,
            status => RelayError::UpstreamStatus { status },
        })
    }

    fn upstream_messages(&self, request: &ChatRequest) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(request.messages().len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(ChatMessage::system(prompt.clone()));
        }
        messages.extend(request.messages().iter().cloned());
        messages
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated]", &body[..end])
}
