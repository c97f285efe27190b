//! Streaming chat edge relay.
//!
//! Accepts `{ "messages": [...] }`, checks it against the message limits in
//! [`chatrelay_contracts`] and forwards one streaming completion upstream. The
//! upstream SSE body is relayed byte for byte.

pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod relay;
pub mod state;
pub mod upstream;

pub use config::ServerConfig;
pub use error::RelayError;
pub use relay::relay_router;
pub use state::{AppState, RelayState};
