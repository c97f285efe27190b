//! Streaming chat consumer

use std::sync::Arc;

use chatrelay_contracts::{ChatMessage, ChatRequest, ErrorBody};
use futures::{Stream, StreamExt};
use reqwest::{Client, Response, StatusCode, Url};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::credentials::CredentialProvider;
use crate::decoder::Utf8Decoder;
use crate::error::{ClientError, Result};
use crate::http_client::build_http_client;
use crate::sse::{SseEvent, SseParser};

/// How a [`ChatStreamClient::stream_chat`] call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Stream ended cleanly and `on_done` ran
    Completed,
    /// The error was handed to `on_error`
    Failed,
    /// The cancellation token fired; no callback ran afterwards
    Cancelled,
}

type DeltaFn<'a> = Box<dyn FnMut(&str) + Send + 'a>;
type DoneFn<'a> = Box<dyn FnOnce() + Send + 'a>;
type ErrorFn<'a> = Box<dyn FnOnce(ClientError) + Send + 'a>;

/// Callbacks for one streamed reply.
///
/// `on_delta` runs once per text fragment in arrival order, `on_done` once on
/// clean completion. Without `on_error`, failures are returned to the caller.
pub struct StreamCallbacks<'a> {
    on_delta: DeltaFn<'a>,
    on_done: Option<DoneFn<'a>>,
    on_error: Option<ErrorFn<'a>>,
}

impl<'a> StreamCallbacks<'a> {
    pub fn new(on_delta: impl FnMut(&str) + Send + 'a) -> Self {
        Self {
            on_delta: Box::new(on_delta),
            on_done: None,
            on_error: None,
        }
    }

    pub fn on_done(mut self, on_done: impl FnOnce() + Send + 'a) -> Self {
        self.on_done = Some(Box::new(on_done));
        self
    }

    pub fn on_error(mut self, on_error: impl FnOnce(ClientError) + Send + 'a) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }
}

/// Client for a chat relay endpoint
pub struct ChatStreamClient {
    http: Client,
    endpoint: Url,
    credentials: Arc<dyn CredentialProvider>,
    config: ClientConfig,
}

impl ChatStreamClient {
    /// Create a client with default timeouts
    pub fn new(endpoint: &str, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        Self::with_config(endpoint, credentials, ClientConfig::default())
    }

    pub fn with_config(
        endpoint: &str,
        credentials: Arc<dyn CredentialProvider>,
        config: ClientConfig,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| ClientError::InvalidEndpoint(format!("{}: {}", endpoint, err)))?;
        Ok(Self {
            http: build_http_client(&config)?,
            endpoint,
            credentials,
            config,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Stream one reply through `callbacks`.
    ///
    /// Deltas already delivered are not retracted when a later error occurs.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        callbacks: StreamCallbacks<'_>,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome> {
        let StreamCallbacks {
            mut on_delta,
            on_done,
            on_error,
        } = callbacks;

        let mut failure = None;
        {
            let mut events = std::pin::pin!(self.events(messages, cancel.clone()));
            while let Some(event) = events.next().await {
                if cancel.is_cancelled() {
                    break;
                }
                match event {
                    Ok(text) => on_delta(&text),
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            debug!("Chat stream cancelled");
            return Ok(StreamOutcome::Cancelled);
        }

        match failure {
            None => {
                if let Some(on_done) = on_done {
                    on_done();
                }
                Ok(StreamOutcome::Completed)
            }
            Some(err) => match on_error {
                Some(on_error) => {
                    on_error(err);
                    Ok(StreamOutcome::Failed)
                }
                None => Err(err),
            },
        }
    }

    /// Stream of text deltas for one reply.
    ///
    /// The stream ends after `[DONE]`, at end of body, after the first error,
    /// or as soon as `cancel` fires (dropping the connection).
    pub fn events<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<String>> + Send + 'a {
        async_stream::stream! {
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                opened = self.open(messages) => opened,
            };
            let response = match opened {
                Ok(response) => response,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };

            let mut byte_stream = std::pin::pin!(response.bytes_stream());
            let mut decoder = Utf8Decoder::new();
            let mut parser = SseParser::new();

            while !parser.is_done() {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    next = tokio::time::timeout(self.config.idle_timeout, byte_stream.next()) => next,
                };
                let chunk = match next {
                    Ok(Some(Ok(chunk))) => chunk,
                    Ok(Some(Err(err))) => {
                        yield Err(ClientError::Http(err));
                        return;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        yield Err(ClientError::Timeout("next stream chunk"));
                        return;
                    }
                };

                for event in parser.push(&decoder.decode(&chunk)) {
                    if let SseEvent::Delta(text) = event {
                        yield Ok(text);
                    }
                }
            }

            let mut tail = parser.push(&decoder.finish());
            tail.extend(parser.finish());
            for event in tail {
                if let SseEvent::Delta(text) = event {
                    yield Ok(text);
                }
            }
        }
    }

    async fn open(&self, messages: &[ChatMessage]) -> Result<Response> {
        let token = self.credentials.bearer_token().await.ok_or_else(|| {
            ClientError::Authentication("no credential available".to_string())
        })?;
        let request = ChatRequest::new(messages.to_vec())?;

        let send = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(token)
            .json(&request)
            .send();
        let response = tokio::time::timeout(self.config.response_timeout, send)
            .await
            .map_err(|_| ClientError::Timeout("response headers"))??;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }
        if status == StatusCode::NO_CONTENT {
            return Err(ClientError::MissingBody);
        }
        Ok(response)
    }
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    let fallback = status.canonical_reason().unwrap_or("request failed").to_string();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|body| body.error)
        .unwrap_or(fallback);

    warn!(status = status.as_u16(), error = %message, "Chat request rejected");
    ClientError::from_status(status.as_u16(), message)
}
