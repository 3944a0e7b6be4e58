//! Retry policy with exponential backoff
//!
//! Only idempotent GET requests are issued by the fetch clients, so every
//! request may be retried. The policy decides *whether* and *how long* to
//! wait; the client owns the retry loop.

use crate::config::FetchConfig;
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;

/// HTTP statuses that are retried
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Upper bound applied to a server-supplied `Retry-After`
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Per-request retry policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first retry
    pub backoff_base: Duration,

    /// Stretch each delay by a random factor in [1, 2)
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base(),
            jitter: config.jitter,
        }
    }

    /// Returns true if `status` belongs to the retryable set
    pub fn is_retryable_status(status: StatusCode) -> bool {
        RETRYABLE_STATUSES.contains(&status.as_u16())
    }

    /// Returns true if another attempt is allowed after `attempts_made`
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Exponential backoff before retry number `retry` (1-based)
    ///
    /// `backoff_base * 2^(retry - 1)`: with the default base of 500ms the
    /// delays are 0.5s, 1s, 2s, ...
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }

    /// Delay to wait before retry number `retry`
    ///
    /// Applies jitter when enabled, then takes the larger of the backoff and
    /// the server's `Retry-After` (capped at [`MAX_RETRY_AFTER`]).
    pub fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let mut delay = self.backoff(retry);
        if self.jitter {
            delay = add_jitter(delay);
        }
        match retry_after {
            Some(server) => delay.max(server.min(MAX_RETRY_AFTER)),
            None => delay,
        }
    }
}

/// Reads a `Retry-After` header given in delay-seconds
///
/// HTTP-date values are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn add_jitter(delay: Duration) -> Duration {
    let factor: f64 = rand::thread_rng().gen_range(0.0..1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + factor))
}
