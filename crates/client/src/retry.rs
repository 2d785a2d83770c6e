//! Bounded exponential-backoff retries for storage network operations.
//!
//! Every network call made by a fetcher goes through [`RetryExecutor::execute`].
//! Attempts are strictly sequential. Between attempts the executor sleeps for
//! the current backoff, racing the timer against the execution scope so a
//! shutdown never waits out a long backoff.

use std::{error::Error as StdError, future::Future, iter, time::Duration};

use metrics::counter;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use storefetch_domain::services::telemetry::RETRY_ATTEMPTS_METRIC;

use crate::scope::ExecutionScope;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_BACKOFF_FACTOR: u32 = 2;
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(20);

/// Shortest wait the executor ever sleeps between attempts.
pub const MIN_BACKOFF: Duration = Duration::from_millis(1);
/// Smallest multiplier applied to the backoff after each failed attempt.
pub const MIN_BACKOFF_FACTOR: u32 = 2;

/// Message fragment the storage network client uses for cancelled requests.
pub const CANCELLATION_MARKER: &str = "context canceled";

/// The execution scope was cancelled while an operation was being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Error)]
#[error("execution scope cancelled: context canceled")]
pub struct Cancelled;

#[derive(Debug, Error)]
pub enum ExecuteError<E> {
    /// The action kept failing until attempts ran out; this is its last error.
    #[error(transparent)]
    Action(E),
    #[error("retry aborted: {0}")]
    Cancelled(#[from] Cancelled),
}

impl<E> ExecuteError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns the action's own error, if attempts were exhausted.
    pub fn into_action(self) -> Option<E> {
        match self {
            Self::Action(err) => Some(err),
            Self::Cancelled(_) => None,
        }
    }
}

/// Reports whether `err` means the execution scope was cancelled.
///
/// The storage network client sometimes loses the typed error on its way
/// up, leaving only the message, so both forms are recognized here.
pub fn is_cancellation(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.is::<Cancelled>() || err.to_string().contains(CANCELLATION_MARKER) {
            return true;
        }
        current = err.source();
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of invocations, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_factor: u32,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Attempts actually made; the action always runs at least once.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Raises out-of-range knobs to their floors: a factor below
    /// [`MIN_BACKOFF_FACTOR`] and zero backoffs become the minimum allowed,
    /// so waits always grow until the ceiling.
    pub fn normalized(self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            initial_backoff: self.initial_backoff.max(MIN_BACKOFF),
            backoff_factor: self.backoff_factor.max(MIN_BACKOFF_FACTOR),
            max_backoff: self.max_backoff.max(MIN_BACKOFF),
        }
    }

    pub fn first_backoff(&self) -> Duration {
        let policy = self.normalized();
        policy.initial_backoff.min(policy.max_backoff)
    }

    pub fn next_backoff(&self, current: Duration) -> Duration {
        let policy = self.normalized();
        current
            .max(MIN_BACKOFF)
            .saturating_mul(policy.backoff_factor)
            .min(policy.max_backoff)
    }

    /// Waits between consecutive attempts when every attempt fails.
    pub fn backoff_schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        iter::successors(Some(self.first_backoff()), |current| {
            Some(self.next_backoff(*current))
        })
        .take(self.attempts() as usize - 1)
    }
}

/// Runs actions under a [`RetryPolicy`], stopping early when the scope is
/// cancelled. Holds no mutable state, so one executor may serve many
/// concurrent callers.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    scope: ExecutionScope,
}

impl RetryExecutor {
    /// The policy is stored [normalized](RetryPolicy::normalized).
    pub fn new(policy: RetryPolicy, scope: ExecutionScope) -> Self {
        Self {
            policy: policy.normalized(),
            scope,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn scope(&self) -> &ExecutionScope {
        &self.scope
    }

    /// Invokes `action` until it succeeds or attempts run out.
    ///
    /// On exhaustion the last error is returned as-is in
    /// [`ExecuteError::Action`]. If the scope is cancelled while waiting
    /// between attempts, [`ExecuteError::Cancelled`] is returned and the
    /// pending error is dropped. An action already running is not
    /// interrupted.
    pub async fn execute<F, Fut, T, E>(&self, mut action: F) -> Result<T, ExecuteError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.policy.attempts();
        let mut backoff = self.policy.first_backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match action().await {
                Ok(value) => {
                    counter!(RETRY_ATTEMPTS_METRIC, "result" => "ok").increment(1);
                    return Ok(value);
                }
                Err(err) => err,
            };

            if attempt >= max_attempts {
                counter!(RETRY_ATTEMPTS_METRIC, "result" => "exhausted").increment(1);
                warn!(attempt, %err, "storage network operation failed, giving up");
                return Err(ExecuteError::Action(err));
            }

            counter!(RETRY_ATTEMPTS_METRIC, "result" => "retry").increment(1);
            warn!(
                attempt,
                max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                %err,
                "storage network operation failed, retrying"
            );

            tokio::select! {
                biased;
                _ = self.scope.cancelled() => {
                    counter!(RETRY_ATTEMPTS_METRIC, "result" => "cancelled").increment(1);
                    debug!(attempt, "retry aborted by cancelled execution scope");
                    return Err(ExecuteError::Cancelled(Cancelled));
                }
                _ = sleep(backoff) => {}
            }

            backoff = self.policy.next_backoff(backoff);
        }
    }
}
