//! ChatRelay contracts
//!
//! Types shared by the edge relay and the client stream consumer:
//! - Chat messages and validated chat requests
//! - The `{ "error": ... }` envelope returned by the relay
//! - The SSE chunk shape emitted by the upstream completion API

pub mod chunk;
pub mod error;
pub mod message;
pub mod request;

pub use chunk::{ChunkChoice, ChunkDelta, CompletionChunk, DATA_PREFIX, DONE_SENTINEL};
pub use error::{ErrorBody, ValidationError};
pub use message::{ChatMessage, Role};
pub use request::{ChatRequest, MAX_CONTENT_CHARS, MAX_MESSAGES};
