use std::env;
use std::time::Duration;

/// Timeouts applied by [`crate::ChatStreamClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// TCP/TLS connect
    pub connect_timeout: Duration,
    /// Request sent until response headers arrive
    pub response_timeout: Duration,
    /// Longest gap between two body chunks
    pub idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `CHATRELAY_*_TIMEOUT_SECS` variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connect_timeout: secs_from_env("CHATRELAY_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.connect_timeout),
            response_timeout: secs_from_env("CHATRELAY_RESPONSE_TIMEOUT_SECS")
                .unwrap_or(defaults.response_timeout),
            idle_timeout: secs_from_env("CHATRELAY_IDLE_TIMEOUT_SECS")
                .unwrap_or(defaults.idle_timeout),
        }
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

fn secs_from_env(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
