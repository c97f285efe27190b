//! ChatRelay client stream consumer
//!
//! This crate provides:
//! - An authenticated streaming chat request against a relay endpoint
//! - Incremental SSE parsing that tolerates frames split across reads
//! - Per-delta callbacks or a `Stream` of deltas, with cancellation
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatrelay_client::{CancellationToken, ChatStreamClient, StaticCredentials, StreamCallbacks};
//! use chatrelay_contracts::ChatMessage;
//!
//! # async fn demo() -> chatrelay_client::Result<()> {
//! let client = ChatStreamClient::new(
//!     "http://localhost:8080/chat",
//!     Arc::new(StaticCredentials::new("token")),
//! )?;
//! let mut reply = String::new();
//! client
//!     .stream_chat(
//!         &[ChatMessage::user("Hi")],
//!         StreamCallbacks::new(|delta| reply.push_str(delta)),
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod consumer;
pub mod credentials;
pub mod decoder;
pub mod error;
mod http_client;
pub mod sse;

pub use config::ClientConfig;
pub use consumer::{ChatStreamClient, StreamCallbacks, StreamOutcome};
pub use credentials::{CredentialProvider, EnvCredentials, StaticCredentials};
pub use decoder::Utf8Decoder;
pub use error::{ClientError, Result};
pub use sse::{ParserState, SseEvent, SseParser};
pub use tokio_util::sync::CancellationToken;
