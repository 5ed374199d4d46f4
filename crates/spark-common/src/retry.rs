//! Bounded retry with exponential backoff
//!
//! Only failures classified as retryable by [`StoreError::is_retryable`] are
//! repeated. Once the attempt budget is spent the last error is returned as-is,
//! so callers still see a typed connectivity failure.
//!
//! # Example
//!
//! ```rust,ignore
//! use spark_common::retry::{retry, RetryPolicy};
//!
//! let exists = retry(&RetryPolicy::default(), "index_exists", || {
//!     store.index_exists("spark-jobs")
//! })
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::StoreResult;

/// Default number of attempts, including the first one
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the second attempt (in milliseconds)
pub const DEFAULT_BASE_DELAY_MS: u64 = 200;

/// Default upper bound for a single backoff delay (in milliseconds)
pub const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

/// How often and how patiently a store call is repeated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubled after each further failure
    pub base_delay: Duration,

    /// Cap applied to every individual delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt budget is exhausted.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        debug!(operation, attempt, max_attempts, "Store call attempt");

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Store call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            },
            Err(err) => return Err(err),
        }
    }
}
