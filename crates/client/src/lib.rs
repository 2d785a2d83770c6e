//! Resilient client bootstrap for the storage-network fetcher services.
//!
//! A fetcher calls [`start_service`], which installs telemetry and builds one
//! [`ServiceHandle`] (validated config, resolved signing identity, decoded
//! container id, connection pool). Every network operation then goes through
//! [`ServiceHandle::execute`], which retries with bounded exponential backoff
//! until the handle's execution scope is cancelled.

pub mod handle;
pub mod identity;
pub mod pool;
pub mod retry;
pub mod scope;
pub mod startup;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

pub use handle::{BootstrapError, ServiceHandle};
pub use identity::{resolve_identity, IdentityError};
pub use pool::{bootstrap_pool, PoolError, POOL_TIMEOUTS};
pub use retry::{
    is_cancellation, Cancelled, ExecuteError, RetryExecutor, RetryPolicy, CANCELLATION_MARKER,
    MIN_BACKOFF, MIN_BACKOFF_FACTOR,
};
pub use scope::ExecutionScope;
pub use startup::{start_service, Startup, StartupError};
pub use storefetch_domain::{validate, Validate};
