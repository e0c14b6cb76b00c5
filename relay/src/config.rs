use serde::Deserialize;
use shared::config::layered;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Upstream timeout cannot be 0")]
    InvalidUpstreamTimeout,

    #[error("Shutdown timeout cannot be 0")]
    InvalidShutdownTimeout,

    #[error("Max body size cannot be 0")]
    InvalidMaxBodySize,

    #[error("Unsupported upstream scheme: {0}")]
    UnsupportedScheme(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load config: {0}")]
    Load(#[from] shared::config::ConfigError),

    #[error("invalid config: {0}")]
    Invalid(#[from] ::config::ConfigError),

    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
}

/// How a successful upstream response is shaped for the caller
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Only a 200 upstream response is accepted; its body is decoded as a JSON
    /// object and re-encoded. Bodies that are not a JSON object become `{}`.
    #[default]
    Decode,
    /// Any upstream status is accepted; the raw body is returned as
    /// `{"data": "<body>"}`.
    Raw,
}

/// Shared secret expected in the `Authorization` header
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Relay configuration
///
/// Keys match the lowercased environment variable names, so the same fields
/// can be set from a YAML file, a `.env` file or the environment.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Full URL validated requests are POSTed to
    pub drts_api: Url,
    /// Bound on the whole upstream request/response cycle
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
    /// Enables the `Authorization` check on the relay routes when non-empty
    #[serde(default)]
    pub api_key: Option<ApiKey>,
    #[serde(default)]
    pub response_mode: ResponseMode,
    /// Upper bound on draining in-flight requests after a shutdown signal
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// Larger relay request bodies are rejected as invalid
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Config {
    /// Builds the configuration from an optional YAML file overlaid with `vars`.
    ///
    /// `DRTS_API` is required; every other key falls back to its default.
    pub fn from_sources(
        file: Option<&Path>,
        vars: ::config::Map<String, String>,
    ) -> Result<Self, ConfigError> {
        let config: Config = layered(file, vars)?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// The API key, unless it is unset or empty
    pub fn enabled_api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref().filter(|key| !key.as_str().is_empty())
    }

    /// Validates the relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if !matches!(self.drts_api.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme(
                self.drts_api.scheme().to_string(),
            ));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(ValidationError::InvalidUpstreamTimeout);
        }
        if self.shutdown_timeout_secs == 0 {
            return Err(ValidationError::InvalidShutdownTimeout);
        }
        if self.max_body_bytes == 0 {
            return Err(ValidationError::InvalidMaxBodySize);
        }

        Ok(())
    }
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_upstream_timeout_secs() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_SECS
}

fn default_shutdown_timeout_secs() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}
