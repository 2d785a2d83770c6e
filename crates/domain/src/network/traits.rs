use std::{path::Path, time::Duration};

use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use thiserror::Error;

use crate::model::RequestSigner;

/// Boxed error surfaced by external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("read wallet file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed wallet: {0}")]
    Format(String),
    #[error("decrypt account: {0}")]
    Decrypt(String),
}

/// One encrypted account stored inside a wallet.
pub trait WalletAccount {
    /// Human-readable label (usually the address) used in logs.
    fn label(&self) -> &str;
    fn decrypt(&self, password: &str) -> Result<SigningKey, WalletError>;
}

/// An opened wallet exposing its accounts in stored order.
pub trait Wallet {
    type Account: WalletAccount;

    fn accounts(&self) -> &[Self::Account];
}

/// Opens wallets by file path.
pub trait WalletOpener {
    type Wallet: Wallet;

    fn open(&self, path: &Path) -> Result<Self::Wallet, WalletError>;
}

/// Timeout classes the pool applies to its node connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolTimeouts {
    pub dial: Duration,
    pub stream: Duration,
    pub healthcheck: Duration,
}

/// Everything the pool needs to connect to a flat list of endpoints.
#[derive(Debug, Clone)]
pub struct PoolParams {
    pub addresses: Vec<String>,
    pub timeouts: PoolTimeouts,
    pub signer: RequestSigner,
}

/// Builds storage-network connection pools.
#[async_trait]
pub trait PoolConnector: Send + Sync {
    type Pool: Send + Sync;

    async fn connect(&self, params: PoolParams) -> Result<Self::Pool, BoxError>;
}
