use std::time::Duration;

use thiserror::Error;
use tracing::info;

use storefetch_domain::{BoxError, Identity, PoolConnector, PoolParams, PoolTimeouts};

/// Timeout for establishing a connection with a storage node.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for stream processing. Large so that heavy SEARCH requests do
/// not time out.
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(10 * 60);
/// Timeout of the request deciding whether a storage node is alive.
pub const DEFAULT_HEALTHCHECK_TIMEOUT: Duration = Duration::from_secs(10);

pub const POOL_TIMEOUTS: PoolTimeouts = PoolTimeouts {
    dial: DEFAULT_DIAL_TIMEOUT,
    stream: DEFAULT_STREAM_TIMEOUT,
    healthcheck: DEFAULT_HEALTHCHECK_TIMEOUT,
};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("empty endpoints")]
    EmptyEndpoints,
    #[error(transparent)]
    Init(BoxError),
}

/// Builds a pool over the flat endpoint list, signing with `identity`.
/// Failures are returned as-is; there is no retry at this layer.
pub async fn bootstrap_pool<C>(
    connector: &C,
    identity: &Identity,
    addresses: &[String],
) -> Result<C::Pool, PoolError>
where
    C: PoolConnector,
{
    if addresses.is_empty() {
        return Err(PoolError::EmptyEndpoints);
    }

    let params = PoolParams {
        addresses: addresses.to_vec(),
        timeouts: POOL_TIMEOUTS,
        signer: identity.request_signer(),
    };
    let pool = connector.connect(params).await.map_err(PoolError::Init)?;
    info!(
        endpoints = addresses.len(),
        account = %identity.account(),
        "storage network pool created"
    );
    Ok(pool)
}
