use anyhow::Context;
use std::sync::Arc;

use crate::auth::RelayAuth;
use crate::config::ServerConfig;
use crate::cors::CorsPolicy;
use crate::upstream::UpstreamClient;

/// Read-only state shared by all relay handlers
pub struct RelayState {
    pub upstream: UpstreamClient,
    pub auth: RelayAuth,
    pub cors: Arc<CorsPolicy>,
    pub body_limit_bytes: usize,
}

impl RelayState {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let upstream =
            UpstreamClient::new(&config.upstream).context("Failed to build upstream HTTP client")?;
        let cors = CorsPolicy::new(&config.cors).context("Invalid CORS origin in config")?;

        Ok(Self {
            upstream,
            auth: RelayAuth::new(&config.auth),
            cors: Arc::new(cors),
            body_limit_bytes: config.body_limit_bytes,
        })
    }
}

pub type AppState = Arc<RelayState>;
