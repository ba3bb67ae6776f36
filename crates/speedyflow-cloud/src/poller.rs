//! Bounded poll-until-condition primitive
//!
//! Every wait in the lifecycle (instance active, instance stopped, address
//! assigned) goes through [`poll_until`], so timeout and retry policy live in
//! one place.

use crate::error::{CloudError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Status checks run every 4 seconds
pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(4);

/// Address lookups: 200 attempts, 2 seconds apart
pub const ADDRESS_POLL_ATTEMPTS: u32 = 200;
pub const ADDRESS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Attempt budget and fixed interval for a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Maximum number of invocations of the operation, never 0
    attempts: u32,

    /// Delay between two invocations
    interval: Duration,
}

impl PollConfig {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }

    /// Derive the attempt budget from a total timeout: `total / interval`, at least 1
    pub fn from_timeout(total: Duration, interval: Duration) -> Self {
        let attempts = if interval.is_zero() {
            1
        } else {
            let n = total.as_nanos() / interval.as_nanos();
            u32::try_from(n).unwrap_or(u32::MAX)
        };
        Self::new(attempts, interval)
    }

    /// Budget used for status waits: `active_timeout / 4s`
    pub fn for_status(active_timeout: Duration) -> Self {
        Self::from_timeout(active_timeout, STATUS_POLL_INTERVAL)
    }

    pub fn for_address() -> Self {
        Self::new(ADDRESS_POLL_ATTEMPTS, ADDRESS_POLL_INTERVAL)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Invoke `operation` until it yields a value, fails, or the budget runs out
///
/// - `Ok(Some(value))`: done, return `value` immediately
/// - `Ok(None)`: not yet, sleep `interval` and retry
/// - `Err(_)`: abort and propagate without retrying
///
/// Exhausting the budget yields [`CloudError::Timeout`], which callers can tell
/// apart from errors raised by the operation itself.
pub async fn poll_until<T, F, Fut>(
    operation_name: &str,
    config: &PollConfig,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for attempt in 0..config.attempts {
        if let Some(value) = operation().await? {
            tracing::debug!(
                "{}: done after {} attempt(s)",
                operation_name,
                attempt + 1
            );
            return Ok(value);
        }

        tracing::debug!(
            "{}: not ready (attempt {}/{})",
            operation_name,
            attempt + 1,
            config.attempts
        );

        // no sleep after the last attempt
        if attempt + 1 < config.attempts {
            sleep(config.interval).await;
        }
    }

    Err(CloudError::Timeout {
        operation: operation_name.to_string(),
        attempts: config.attempts,
    })
}
