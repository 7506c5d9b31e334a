//! Retry delays.
//!
//! The delay doubles with every failed attempt from `base_delay_ms`, stops
//! growing at `max_delay_ms`, and gains up to a tenth of itself as jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// How long to sleep after `failed_attempts` consecutive failures.
pub fn retry_delay(retries: &RetryConfig, failed_attempts: u32) -> Duration {
    let Some(doublings) = failed_attempts.checked_sub(1) else {
        return Duration::ZERO;
    };

    let factor = 1u64.checked_shl(doublings).unwrap_or(u64::MAX);
    let delay = retries
        .base_delay_ms
        .saturating_mul(factor)
        .min(retries.max_delay_ms);

    let jitter = match delay / 10 {
        0 => 0,
        spread => rand::thread_rng().gen_range(0..spread),
    };
    Duration::from_millis(delay + jitter)
}
