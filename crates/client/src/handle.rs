use std::future::Future;

use metrics::counter;
use thiserror::Error;
use tracing::{info, warn};

use storefetch_domain::{
    services::telemetry::BOOTSTRAP_METRIC, ConfigError, ContainerId, ContainerIdError, Identity,
    PoolConnector, ServiceConfig, Validate, WalletOpener,
};

use crate::{
    identity::{resolve_identity, IdentityError},
    pool::{bootstrap_pool, PoolError},
    retry::{ExecuteError, RetryExecutor, RetryPolicy},
    scope::ExecutionScope,
};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("failed to decode container ID: {0}")]
    ContainerId(#[from] ContainerIdError),
    #[error("failed to create service: {0}")]
    Pool(#[from] PoolError),
}

/// Everything a fetcher needs to talk to the storage network: the pool, the
/// signing identity, the target container and the execution scope.
///
/// Built once, then shared read-only; every method takes `&self`.
#[derive(Debug)]
pub struct ServiceHandle<P> {
    pool: P,
    identity: Identity,
    container_id: ContainerId,
    retry: RetryExecutor,
}

impl<P> ServiceHandle<P> {
    /// Validates `config`, resolves the identity, decodes the container id
    /// and builds the pool, in that order. The first failure is returned and
    /// nothing is kept.
    pub async fn new<C, O, K>(
        config: &C,
        wallets: &O,
        connector: &K,
    ) -> Result<Self, BootstrapError>
    where
        C: Validate + AsRef<ServiceConfig>,
        O: WalletOpener,
        K: PoolConnector<Pool = P>,
    {
        let result = Self::build(config, wallets, connector).await;
        match &result {
            Ok(handle) => {
                counter!(BOOTSTRAP_METRIC, "result" => "ok").increment(1);
                info!(
                    container = %handle.container_id,
                    account = %handle.identity.account(),
                    "storage network service ready"
                );
            }
            Err(err) => {
                counter!(BOOTSTRAP_METRIC, "result" => "error").increment(1);
                warn!(%err, "storage network service bootstrap failed");
            }
        }
        result
    }

    /// Like [`ServiceHandle::new`], but a disabled service yields `None`
    /// without touching the wallet or the network.
    pub async fn bootstrap_if_enabled<C, O, K>(
        config: &C,
        wallets: &O,
        connector: &K,
    ) -> Result<Option<Self>, BootstrapError>
    where
        C: Validate + AsRef<ServiceConfig>,
        O: WalletOpener,
        K: PoolConnector<Pool = P>,
    {
        if !config.as_ref().enabled {
            return Ok(None);
        }
        Self::new(config, wallets, connector).await.map(Some)
    }

    async fn build<C, O, K>(config: &C, wallets: &O, connector: &K) -> Result<Self, BootstrapError>
    where
        C: Validate + AsRef<ServiceConfig>,
        O: WalletOpener,
        K: PoolConnector<Pool = P>,
    {
        config.validate()?;
        let service = config.as_ref();

        let identity = resolve_identity(service.unlock_wallet.as_ref(), wallets)?;
        let container_id = service.decode_container_id()?;
        let pool = bootstrap_pool(connector, &identity, &service.addresses).await?;

        Ok(Self {
            pool,
            identity,
            container_id,
            retry: RetryExecutor::new(RetryPolicy::default(), ExecutionScope::new()),
        })
    }

    /// Replaces the retry policy, keeping the execution scope.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy, self.retry.scope().clone());
        self
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn container_id(&self) -> &ContainerId {
        &self.container_id
    }

    pub fn scope(&self) -> &ExecutionScope {
        self.retry.scope()
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    /// Cancels the execution scope: pending and future retry waits stop.
    pub fn cancel(&self) {
        self.retry.scope().cancel();
    }

    /// Runs a network operation under the handle's retry policy.
    pub async fn execute<F, Fut, T, E>(&self, action: F) -> Result<T, ExecuteError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.retry.execute(action).await
    }
}
