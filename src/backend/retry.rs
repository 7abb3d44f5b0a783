//! Bounded exponential backoff for backend calls.
//!
//! Only failures classified as transient by [`NetworkError::is_transient`]
//! are retried. Rejections and decode failures return on the first attempt.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

/// Upper bound on a server-supplied Retry-After, in seconds.
const MAX_RETRY_AFTER_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retryable,
    NonRetryable,
}

impl RetryDecision {
    pub fn for_error(err: &NetworkError) -> Self {
        if err.is_transient() {
            RetryDecision::Retryable
        } else {
            RetryDecision::NonRetryable
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before attempt `attempt + 1`, honouring a Retry-After hint.
    pub fn delay_for(&self, attempt: u32, err: &NetworkError) -> Duration {
        if let NetworkError::RateLimited {
            retry_after_secs: Some(secs),
        } = err
        {
            return Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS));
        }

        let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
        let base = self
            .initial_backoff_ms
            .saturating_mul(exponent)
            .min(self.max_backoff_ms);
        Duration::from_millis(base.saturating_add(jitter_ms()))
    }
}

fn jitter_ms() -> u64 {
    (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0))
        % 150
}

/// Run `op` until it succeeds, fails permanently, or the policy's attempts run out.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, NetworkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NetworkError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if RetryDecision::for_error(&err) == RetryDecision::NonRetryable
                    || attempt >= attempts
                {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt, &err);
                log::warn!(
                    "{} retry {}/{} after error: {} (sleep {:?})",
                    label,
                    attempt,
                    attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
