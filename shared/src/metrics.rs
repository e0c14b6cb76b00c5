use metrics_exporter_statsd::{StatsdBuilder, StatsdError};

pub const DEFAULT_STATSD_PORT: u16 = 8125;

#[derive(Clone, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(thiserror::Error, Debug)]
pub enum MetricsError {
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    RecorderAlreadySet,
}

/// Installs a global statsd recorder; metrics emitted before this call are dropped.
pub fn init(config: &MetricsConfig, prefix: &str) -> Result<(), MetricsError> {
    let recorder =
        StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port).build(Some(prefix))?;

    ::metrics::set_global_recorder(recorder).map_err(|_| MetricsError::RecorderAlreadySet)?;

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Statsd metrics enabled"
    );
    Ok(())
}
