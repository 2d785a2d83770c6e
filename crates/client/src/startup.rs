//! Process startup shared by the fetcher binaries.

use thiserror::Error;
use tracing::info;

use storefetch_domain::{
    services::telemetry::{init_telemetry, TelemetryConfig, TelemetryError, TelemetryGuard},
    ConfigError, LoadFromEnv, PoolConnector, ServiceConfig, Validate, WalletOpener,
};

use crate::handle::{BootstrapError, ServiceHandle};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}

/// What a fetcher process owns once startup succeeds.
pub struct Startup<C, P> {
    pub config: C,
    /// `None` when the service is disabled in `config`.
    pub handle: Option<ServiceHandle<P>>,
    pub telemetry: TelemetryGuard,
}

/// Installs telemetry from `<PREFIX>_LOG_FILTER` and
/// `<PREFIX>_METRICS_ADDRESS`, loads `C` from the same prefix and bootstraps
/// the service handle if the config enables it.
pub async fn start_service<C, O, K>(
    prefix: &str,
    wallets: &O,
    connector: &K,
) -> Result<Startup<C, K::Pool>, StartupError>
where
    C: LoadFromEnv + Validate + AsRef<ServiceConfig>,
    O: WalletOpener,
    K: PoolConnector,
{
    let telemetry = init_telemetry(&TelemetryConfig::from_env(prefix)?)?;
    let config = C::load_from_env(prefix)?;
    let handle = ServiceHandle::bootstrap_if_enabled(&config, wallets, connector).await?;
    if handle.is_none() {
        info!(prefix, "storage network service disabled");
    }

    Ok(Startup {
        config,
        handle,
        telemetry,
    })
}
