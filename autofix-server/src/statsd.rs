use crate::config::MetricsConfig;
use metrics_exporter_statsd::{StatsdBuilder, StatsdError};

const METRICS_PREFIX: &str = "autofix";

/// Installs the StatsD recorder and registers every metric description.
///
/// Without this, the `metrics` macros are no-ops.
pub fn init(config: &MetricsConfig) -> Result<(), MetricsInitError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(METRICS_PREFIX))?;
    metrics::set_global_recorder(recorder)
        .map_err(|err| MetricsInitError::Install(err.to_string()))?;

    shared::metrics_defs::describe_all(autofix::metrics_defs::ALL_METRICS);
    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum MetricsInitError {
    #[error("could not build statsd recorder: {0}")]
    Build(#[from] StatsdError),
    #[error("could not install metrics recorder: {0}")]
    Install(String),
}
