//! Bearer credential sources

use async_trait::async_trait;

/// Supplies the bearer token for a chat request.
///
/// Returning `None` aborts the request with an authentication error before
/// anything is sent.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, e.g. from a session established elsewhere
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn none() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn bearer_token(&self) -> Option<String> {
        non_blank(self.token.clone())
    }
}

/// Reads the token from an environment variable on every request
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new("CHATRELAY_TOKEN")
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn bearer_token(&self) -> Option<String> {
        non_blank(std::env::var(&self.var).ok())
    }
}

fn non_blank(token: Option<String>) -> Option<String> {
    token
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_credentials() {
        assert_eq!(
            StaticCredentials::new("abc").bearer_token().await.as_deref(),
            Some("abc")
        );
        assert_eq!(StaticCredentials::none().bearer_token().await, None);
        assert_eq!(StaticCredentials::new("  ").bearer_token().await, None);
    }

    #[tokio::test]
    async fn test_env_credentials_missing_var() {
        let credentials = EnvCredentials::new("CHATRELAY_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert_eq!(credentials.bearer_token().await, None);
    }
}
