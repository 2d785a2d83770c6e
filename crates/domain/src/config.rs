//! Fetcher service configuration shared by the block and state fetchers.
//!
//! The structures mirror the operator-facing schema: a base
//! [`ServiceConfig`] carrying connectivity settings and two fetcher-specific
//! configs composed on top of it. Loading never validates; callers run
//! [`validate`] (or the type's own `validate`) before building a service.

use std::{env, fmt, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::model::{ContainerId, ContainerIdError};

/// Default timeout for storage network requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
/// Default number of workers downloading blocks.
pub const DEFAULT_DOWNLOADER_WORKERS_COUNT: usize = 500;
/// Default size of the object-id batch listed and searched at once.
pub const DEFAULT_OID_BATCH_SIZE: usize = 128_000;
/// Default attribute name marking block objects.
pub const DEFAULT_BLOCK_ATTRIBUTE: &str = "Block";
/// Default attribute name marking state objects.
pub const DEFAULT_STATE_ATTRIBUTE: &str = "State";
/// Default number of contract storage key-value pairs flushed in one batch.
pub const DEFAULT_KV_BATCH_SIZE: usize = 1000;

/// Configs assembled from `<PREFIX>_*` environment variables.
pub trait LoadFromEnv: Sized {
    fn load_from_env(prefix: &str) -> Result<Self, ConfigError>;
}

/// Anything that can be checked for internal consistency before startup.
pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Runs the consistency checks of `config`.
pub fn validate<C: Validate + ?Sized>(config: &C) -> Result<(), ConfigError> {
    config.validate()
}

/// Location and password of the wallet holding the service signing key.
#[derive(Clone, PartialEq, Eq)]
pub struct WalletConfig {
    pub path: PathBuf,
    pub password: String,
}

impl WalletConfig {
    pub fn new(path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConfig")
            .field("path", &self.path)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connectivity settings common to every storage-network backed service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub enabled: bool,
    pub timeout: Duration,
    pub container_id: String,
    pub addresses: Vec<String>,
    pub unlock_wallet: Option<WalletConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: DEFAULT_TIMEOUT,
            container_id: String::new(),
            addresses: Vec::new(),
            unlock_wallet: None,
        }
    }
}

impl LoadFromEnv for ServiceConfig {
    /// Loads `<PREFIX>_*` variables, hydrating `.env` first.
    fn load_from_env(prefix: &str) -> Result<Self, ConfigError> {
        hydrate_env_file()?;
        let vars = EnvPrefix::new(prefix);

        let enabled = match vars.optional("ENABLED") {
            Some(raw) => parse_bool(&vars.key("ENABLED"), &raw)?,
            None => false,
        };
        let timeout = match vars.optional("TIMEOUT") {
            Some(raw) => Duration::from_secs(parse_number(&vars.key("TIMEOUT"), &raw)?),
            None => DEFAULT_TIMEOUT,
        };
        let addresses = vars
            .optional("ADDRESSES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|addr| !addr.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let unlock_wallet = vars.optional("WALLET_PATH").map(|path| {
            WalletConfig::new(path, env::var(vars.key("WALLET_PASSWORD")).unwrap_or_default())
        });

        Ok(Self {
            enabled,
            timeout,
            container_id: vars.optional("CONTAINER_ID").unwrap_or_default(),
            addresses,
            unlock_wallet,
        })
    }
}

impl ServiceConfig {
    /// Decodes the configured container id.
    pub fn decode_container_id(&self) -> Result<ContainerId, ContainerIdError> {
        self.container_id.parse()
    }

    fn timeout_or_default(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.container_id.is_empty() {
            return Err(ConfigError::MissingContainerId);
        }
        self.decode_container_id()
            .map_err(|source| ConfigError::InvalidContainerId { source })?;
        if self.addresses.is_empty() {
            return Err(ConfigError::MissingAddresses);
        }
        Ok(())
    }
}

/// Settings of the service pulling blocks from the storage network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFetcherConfig {
    pub service: ServiceConfig,
    pub oid_batch_size: usize,
    pub block_attribute: String,
    pub downloader_workers_count: usize,
    /// Capacity of the block queue; `0` leaves it unset.
    pub bqueue_size: usize,
}

impl Default for BlockFetcherConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            oid_batch_size: DEFAULT_OID_BATCH_SIZE,
            block_attribute: DEFAULT_BLOCK_ATTRIBUTE.to_string(),
            downloader_workers_count: DEFAULT_DOWNLOADER_WORKERS_COUNT,
            bqueue_size: 0,
        }
    }
}

impl LoadFromEnv for BlockFetcherConfig {
    fn load_from_env(prefix: &str) -> Result<Self, ConfigError> {
        let service = ServiceConfig::load_from_env(prefix)?;
        let vars = EnvPrefix::new(prefix);

        Ok(Self {
            service,
            oid_batch_size: vars.number_or("OID_BATCH_SIZE", DEFAULT_OID_BATCH_SIZE)?,
            block_attribute: vars
                .optional("BLOCK_ATTRIBUTE")
                .unwrap_or_else(|| DEFAULT_BLOCK_ATTRIBUTE.to_string()),
            downloader_workers_count: vars
                .number_or("DOWNLOADER_WORKERS_COUNT", DEFAULT_DOWNLOADER_WORKERS_COUNT)?,
            bqueue_size: vars.number_or("BQUEUE_SIZE", 0)?,
        })
    }
}

impl BlockFetcherConfig {
    /// Replaces zero or empty tuning knobs with their defaults. The queue
    /// size stays as configured since `0` already means "unset".
    pub fn with_defaults(mut self) -> Self {
        self.service.timeout = self.service.timeout_or_default();
        if self.oid_batch_size == 0 {
            self.oid_batch_size = DEFAULT_OID_BATCH_SIZE;
        }
        if self.block_attribute.is_empty() {
            self.block_attribute = DEFAULT_BLOCK_ATTRIBUTE.to_string();
        }
        if self.downloader_workers_count == 0 {
            self.downloader_workers_count = DEFAULT_DOWNLOADER_WORKERS_COUNT;
        }
        self
    }
}

impl Validate for BlockFetcherConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        if self.bqueue_size > 0 && self.bqueue_size < self.oid_batch_size {
            return Err(ConfigError::QueueSmallerThanBatch {
                bqueue_size: self.bqueue_size,
                oid_batch_size: self.oid_batch_size,
            });
        }
        Ok(())
    }
}

/// Settings of the service pulling contract state from the storage network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFetcherConfig {
    pub service: ServiceConfig,
    pub state_attribute: String,
    pub key_value_batch_size: usize,
}

impl Default for StateFetcherConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            state_attribute: DEFAULT_STATE_ATTRIBUTE.to_string(),
            key_value_batch_size: DEFAULT_KV_BATCH_SIZE,
        }
    }
}

impl LoadFromEnv for StateFetcherConfig {
    fn load_from_env(prefix: &str) -> Result<Self, ConfigError> {
        let service = ServiceConfig::load_from_env(prefix)?;
        let vars = EnvPrefix::new(prefix);

        Ok(Self {
            service,
            state_attribute: vars
                .optional("STATE_ATTRIBUTE")
                .unwrap_or_else(|| DEFAULT_STATE_ATTRIBUTE.to_string()),
            key_value_batch_size: vars.number_or("KEY_VALUE_BATCH_SIZE", DEFAULT_KV_BATCH_SIZE)?,
        })
    }
}

impl StateFetcherConfig {
    pub fn with_defaults(mut self) -> Self {
        self.service.timeout = self.service.timeout_or_default();
        if self.state_attribute.is_empty() {
            self.state_attribute = DEFAULT_STATE_ATTRIBUTE.to_string();
        }
        if self.key_value_batch_size == 0 {
            self.key_value_batch_size = DEFAULT_KV_BATCH_SIZE;
        }
        self
    }
}

impl Validate for StateFetcherConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()
    }
}

impl AsRef<ServiceConfig> for ServiceConfig {
    fn as_ref(&self) -> &ServiceConfig {
        self
    }
}

impl AsRef<ServiceConfig> for BlockFetcherConfig {
    fn as_ref(&self) -> &ServiceConfig {
        &self.service
    }
}

impl AsRef<ServiceConfig> for StateFetcherConfig {
    fn as_ref(&self) -> &ServiceConfig {
        &self.service
    }
}

pub(crate) struct EnvPrefix {
    prefix: String,
}

impl EnvPrefix {
    pub(crate) fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim().to_ascii_uppercase(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }

    pub(crate) fn optional(&self, name: &str) -> Option<String> {
        get_optional_var(&self.key(name))
    }

    fn number_or(&self, name: &str, default: usize) -> Result<usize, ConfigError> {
        match self.optional(name) {
            Some(raw) => parse_number(&self.key(name), &raw),
            None => Ok(default),
        }
    }
}

fn get_optional_var(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    raw.parse().map_err(|source| ConfigError::InvalidNumber {
        key: key.to_string(),
        source,
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("STOREFETCH_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when configuration is inconsistent or cannot be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("container ID is not set")]
    MissingContainerId,
    #[error("invalid container ID: {source}")]
    InvalidContainerId {
        #[source]
        source: ContainerIdError,
    },
    #[error("addresses are not set")]
    MissingAddresses,
    #[error("BQueueSize ({bqueue_size}) is lower than OIDBatchSize ({oid_batch_size})")]
    QueueSmallerThanBatch {
        bqueue_size: usize,
        oid_batch_size: usize,
    },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("invalid boolean `{value}` in `{key}`")]
    InvalidBool { key: String, value: String },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
