use chatrelay_contracts::{MAX_CONTENT_CHARS, MAX_MESSAGES};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

const UPSTREAM_API_KEY_ENV: &str = "CHATRELAY_UPSTREAM_API_KEY";

/// Worst-case JSON bytes for one character: an astral char written as an
/// escaped surrogate pair (`\ud83e\udd80`).
const MAX_ESCAPED_CHAR_BYTES: usize = 12;

/// Role, keys and punctuation around one message.
const MESSAGE_OVERHEAD_BYTES: usize = 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
    pub upstream: UpstreamConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
}

#[derive(Clone)]
pub struct UpstreamConfig {
    pub url: String,
    pub model: String,
    /// Prepended as a system message when set
    pub system_prompt: Option<String>,
    /// Only ever read from the environment
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "<set>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .field("response_timeout", &self.response_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    /// Sent when the request origin is not in `allowed_origins`
    pub default_origin: String,
}

#[derive(Clone, Default)]
pub struct AuthConfig {
    pub api_keys: Vec<String>,
    pub jwt_secret: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_keys", &self.api_keys.len())
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    upstream: UpstreamSection,
    #[serde(default)]
    cors: CorsSection,
    #[serde(default)]
    auth: AuthSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_body_limit")]
    body_limit_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpstreamSection {
    #[serde(default = "default_upstream_url")]
    url: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    connect_timeout_secs: u64,
    #[serde(default = "default_response_timeout_secs")]
    response_timeout_secs: u64,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            model: default_model(),
            system_prompt: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            response_timeout_secs: default_response_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct CorsSection {
    #[serde(default)]
    allowed_origins: Option<Vec<String>>,
    #[serde(default)]
    default_origin: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AuthSection {
    #[serde(default)]
    api_keys: Vec<String>,
    #[serde(default)]
    jwt_secret: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Large enough for any request that passes message validation, so an
/// oversized body is never rejected before the validator has seen it.
fn default_body_limit() -> usize {
    MAX_MESSAGES * (MAX_CONTENT_CHARS * MAX_ESCAPED_CHAR_BYTES + MESSAGE_OVERHEAD_BYTES)
}

fn default_upstream_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_response_timeout_secs() -> u64 {
    30
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_file_config(FileConfig::default(), None)
    }
}

impl CorsConfig {
    fn resolve(allowed_origins: Option<Vec<String>>, default_origin: Option<String>) -> Self {
        let allowed_origins = allowed_origins
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(default_allowed_origins);
        let default_origin = default_origin
            .filter(|origin| !origin.trim().is_empty())
            .unwrap_or_else(|| allowed_origins[0].clone());
        Self {
            allowed_origins,
            default_origin,
        }
    }
}

impl ServerConfig {
    /// Load from `CHATRELAY_SERVER_CONFIG` or `./chatrelay.toml`, else from the environment.
    ///
    /// The upstream API key is always taken from `CHATRELAY_UPSTREAM_API_KEY`.
    pub fn load() -> anyhow::Result<Self> {
        let api_key = non_empty(env::var(UPSTREAM_API_KEY_ENV).ok());
        if let Some(file_config) = load_from_file()? {
            return Ok(Self::from_file_config(file_config, api_key));
        }

        Ok(Self::from_env(api_key))
    }

    /// Load a TOML file. The API key still comes from the environment.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let api_key = non_empty(env::var(UPSTREAM_API_KEY_ENV).ok());
        Ok(Self::from_file_config(read_file(path)?, api_key))
    }

    fn from_file_config(file: FileConfig, api_key: Option<String>) -> Self {
        Self {
            host: file.server.host,
            port: file.server.port,
            body_limit_bytes: file.server.body_limit_bytes,
            upstream: UpstreamConfig {
                url: file.upstream.url,
                model: file.upstream.model,
                system_prompt: non_empty(file.upstream.system_prompt),
                api_key,
                connect_timeout: Duration::from_secs(file.upstream.connect_timeout_secs),
                response_timeout: Duration::from_secs(file.upstream.response_timeout_secs),
            },
            cors: CorsConfig::resolve(file.cors.allowed_origins, file.cors.default_origin),
            auth: AuthConfig {
                api_keys: file
                    .auth
                    .api_keys
                    .into_iter()
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty())
                    .collect(),
                jwt_secret: non_empty(file.auth.jwt_secret),
            },
        }
    }

    fn from_env(api_key: Option<String>) -> Self {
        let host = env::var("CHATRELAY_HOST").unwrap_or_else(|_| default_host());
        let port = parse_env("CHATRELAY_PORT").unwrap_or_else(default_port);
        let body_limit_bytes =
            parse_env("CHATRELAY_BODY_LIMIT_BYTES").unwrap_or_else(default_body_limit);

        let upstream = UpstreamConfig {
            url: env::var("CHATRELAY_UPSTREAM_URL").unwrap_or_else(|_| default_upstream_url()),
            model: env::var("CHATRELAY_MODEL").unwrap_or_else(|_| default_model()),
            system_prompt: non_empty(env::var("CHATRELAY_SYSTEM_PROMPT").ok()),
            api_key,
            connect_timeout: Duration::from_secs(
                parse_env("CHATRELAY_UPSTREAM_CONNECT_TIMEOUT_SECS")
                    .unwrap_or_else(default_connect_timeout_secs),
            ),
            response_timeout: Duration::from_secs(
                parse_env("CHATRELAY_UPSTREAM_RESPONSE_TIMEOUT_SECS")
                    .unwrap_or_else(default_response_timeout_secs),
            ),
        };

        let cors = CorsConfig::resolve(
            env::var("CHATRELAY_ALLOWED_ORIGINS")
                .ok()
                .map(|value| split_list(&value)),
            env::var("CHATRELAY_DEFAULT_ORIGIN").ok(),
        );

        let auth = AuthConfig {
            api_keys: env::var("CHATRELAY_API_KEYS")
                .map(|value| split_list(&value))
                .unwrap_or_default(),
            jwt_secret: non_empty(env::var("CHATRELAY_JWT_SECRET").ok()),
        };

        Self {
            host,
            port,
            body_limit_bytes,
            upstream,
            cors,
            auth,
        }
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("CHATRELAY_SERVER_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("chatrelay.toml").exists() {
        Some("chatrelay.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    read_file(Path::new(&path)).map(Some)
}

fn read_file(path: &Path) -> anyhow::Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path.display(), err))?;
    parse(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), err))
}

fn parse(contents: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(contents)
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.body_limit_bytes, 50 * (10_000 * 12 + 1024));
        assert_eq!(config.upstream.response_timeout, Duration::from_secs(30));
        assert_eq!(config.cors.default_origin, "http://localhost:5173");
        assert!(config.upstream.api_key.is_none());
        assert!(config.auth.api_keys.is_empty());
    }

    #[test]
    fn test_parse_file_sections() {
        let file = parse(
            r#"
            [server]
            port = 9000

            [upstream]
            url = "http://127.0.0.1:4000/v1/chat/completions"
            model = "test-model"
            system_prompt = ""

            [cors]
            allowed_origins = ["https://app.example.com", "https://staging.example.com"]

            [auth]
            api_keys = ["k1", "  "]
            "#,
        )
        .unwrap();
        let config = ServerConfig::from_file_config(file, Some("secret".to_string()));

        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.upstream.model, "test-model");
        assert_eq!(config.upstream.system_prompt, None);
        assert_eq!(config.upstream.api_key.as_deref(), Some("secret"));
        assert_eq!(config.cors.default_origin, "https://app.example.com");
        assert_eq!(config.auth.api_keys, vec!["k1".to_string()]);
    }

    #[test]
    fn test_from_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = \"not a number\"").unwrap();
        let err = ServerConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = ServerConfig::default();
        config.upstream.api_key = Some("sk-live-123".to_string());
        config.auth.jwt_secret = Some("jwt-secret".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-live-123"));
        assert!(!rendered.contains("jwt-secret"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }
}
