use std::{net::SocketAddr, sync::Arc};

use metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{hydrate_env_file, EnvPrefix};

static SUBSCRIBER_INSTALLED: OnceCell<()> = OnceCell::new();
static METRICS_HANDLE: OnceCell<Arc<PrometheusHandle>> = OnceCell::new();

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Counter incremented once per retried storage-network operation outcome.
pub const RETRY_ATTEMPTS_METRIC: &str = "storefetch_retry_attempts_total";
/// Counter incremented once per service bootstrap outcome.
pub const BOOTSTRAP_METRIC: &str = "storefetch_bootstrap_total";

/// Observability options for a fetcher process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    log_filter: String,
    metrics_address: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            metrics_address: None,
        }
    }
}

impl TelemetryConfig {
    /// Reads `<PREFIX>_LOG_FILTER` and `<PREFIX>_METRICS_ADDRESS` with the
    /// same trimming rules as the service configs.
    pub fn from_env(prefix: &str) -> Result<Self, TelemetryError> {
        let _ = hydrate_env_file();
        let vars = EnvPrefix::new(prefix);

        let metrics_address: Option<SocketAddr> = vars
            .optional("METRICS_ADDRESS")
            .map(|raw| {
                raw.parse()
                    .map_err(|err: std::net::AddrParseError| {
                        TelemetryError::InvalidMetricsAddress(raw.clone(), err.to_string())
                    })
            })
            .transpose()?;

        Ok(Self {
            log_filter: vars
                .optional("LOG_FILTER")
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            metrics_address,
        })
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn metrics_address(&self) -> Option<SocketAddr> {
        self.metrics_address
    }
}

/// Keeps the Prometheus handle of the process-wide recorder.
#[derive(Clone)]
pub struct TelemetryGuard {
    metrics: Arc<PrometheusHandle>,
}

impl TelemetryGuard {
    pub fn render_metrics(&self) -> String {
        self.metrics.render()
    }
}

/// Installs the tracing subscriber and the metrics recorder. Later calls
/// reuse whatever the first successful call installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    SUBSCRIBER_INSTALLED.get_or_try_init(|| {
        let filter = EnvFilter::try_new(config.log_filter())
            .map_err(|err| TelemetryError::InvalidLogFilter(err.to_string()))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .map_err(|err| TelemetryError::Tracing(err.to_string()))
    })?;

    let metrics = METRICS_HANDLE
        .get_or_try_init(|| {
            let mut builder = PrometheusBuilder::new();
            if let Some(addr) = config.metrics_address() {
                builder = builder.with_http_listener(addr);
            }
            let handle = builder
                .install_recorder()
                .map_err(|err| TelemetryError::Metrics(err.to_string()))?;
            describe_metrics();
            Ok(Arc::new(handle))
        })?
        .clone();

    Ok(TelemetryGuard { metrics })
}

fn describe_metrics() {
    describe_counter!(
        RETRY_ATTEMPTS_METRIC,
        Unit::Count,
        "Storage network operation attempts by outcome"
    );
    describe_counter!(
        BOOTSTRAP_METRIC,
        Unit::Count,
        "Fetcher service bootstrap outcomes"
    );
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),
    #[error("invalid metrics address `{0}`: {1}")]
    InvalidMetricsAddress(String, String),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}
