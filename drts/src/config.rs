use relay::config::Config as RelayConfig;
use serde::Deserialize;
use shared::config::{environment, layered, process_environment};
use shared::metrics::{DEFAULT_STATSD_PORT, MetricsConfig};
use std::path::Path;

/// Process-wide settings, read from the same sources as the relay
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CommonConfig {
    #[serde(default)]
    pub statsd_host: Option<String>,
    #[serde(default = "default_statsd_port")]
    pub statsd_port: u16,
    #[serde(default)]
    pub sentry_dsn: Option<String>,
}

fn default_statsd_port() -> u16 {
    DEFAULT_STATSD_PORT
}

impl CommonConfig {
    /// Statsd export is enabled when a host is set.
    pub fn metrics(&self) -> Option<MetricsConfig> {
        self.statsd_host
            .as_ref()
            .filter(|host| !host.is_empty())
            .map(|host| MetricsConfig {
                statsd_host: host.clone(),
                statsd_port: self.statsd_port,
            })
    }

    pub fn sentry_dsn(&self) -> Option<&str> {
        self.sentry_dsn.as_deref().filter(|dsn| !dsn.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub common: CommonConfig,
    pub relay: RelayConfig,
}

impl Config {
    /// Loads the config file if one is given, then the `.env` file and the
    /// process environment on top of it.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let vars = environment(None, process_environment())?;
        Self::from_sources(path, vars)
    }

    pub fn from_sources(
        path: Option<&Path>,
        vars: ::config::Map<String, String>,
    ) -> Result<Self, ConfigError> {
        let sources = layered(path, vars)?;

        let common: CommonConfig = sources.clone().try_deserialize()?;
        let relay_config: RelayConfig = sources.try_deserialize()?;
        relay_config
            .validate()
            .map_err(relay::config::ConfigError::from)?;

        Ok(Config {
            common,
            relay: relay_config,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config: {0}")]
    LoadError(#[from] shared::config::ConfigError),
    #[error("could not parse config: {0}")]
    ParseError(#[from] ::config::ConfigError),
    #[error("invalid relay config: {0}")]
    RelayError(#[from] relay::config::ConfigError),
}
