//! Domain-level building blocks for the storage-network fetcher services:
//! configuration and its consistency checks, identifiers and key material,
//! the collaborator seams (wallet, connection pool) and telemetry wiring.

pub mod config;
pub mod model;
pub mod network;
pub mod services;

pub use config::{
    validate, BlockFetcherConfig, ConfigError, LoadFromEnv, ServiceConfig, StateFetcherConfig,
    Validate, WalletConfig,
};
pub use model::{AccountRef, ContainerId, ContainerIdError, Identity, RequestSigner};
pub use network::{
    BoxError, PoolConnector, PoolParams, PoolTimeouts, Wallet, WalletAccount, WalletError,
    WalletOpener,
};
