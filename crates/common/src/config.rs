//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Webhook intake configuration.
    pub webhook: WebhookConfig,
    /// Push provider credentials. Absent means simulation mode.
    #[serde(default)]
    pub push: Option<PushConfig>,
    /// Dispatch behaviour.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout for inbound webhook calls, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Webhook intake configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret expected in the `X-Webhook-Secret` header.
    pub secret: String,
}

/// Service-account credentials for Firebase Cloud Messaging.
#[derive(Clone, Deserialize)]
pub struct PushConfig {
    /// Firebase project id.
    pub project_id: String,
    /// Service-account email, used as the assertion issuer.
    pub client_email: String,
    /// Service-account RSA private key (PEM, PKCS#8 or PKCS#1).
    pub private_key: String,
    /// OAuth token endpoint, also the assertion audience.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// Base URL of the FCM HTTP v1 API.
    #[serde(default = "default_fcm_api_base")]
    pub api_base_url: String,
}

impl std::fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConfig")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// What to do when one recipient of a fan-out fails with an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutFailurePolicy {
    /// Stop the batch and propagate the error.
    #[default]
    Abort,
    /// Log the error and move on to the next recipient.
    Continue,
}

/// Dispatch behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchConfig {
    /// Failure isolation for multi-recipient sends.
    #[serde(default)]
    pub fanout_failure_policy: FanoutFailurePolicy,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_fcm_api_base() -> String {
    "https://fcm.googleapis.com".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present, into the process environment)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `DEALDROP_ENV`)
    /// 4. Environment variables with `DEALDROP__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("DEALDROP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("DEALDROP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("DEALDROP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Whether push sends go to the live provider.
    #[must_use]
    pub const fn push_enabled(&self) -> bool {
        self.push.is_some()
    }
}
