//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Reconnect backoff for a downstream connection.
///
/// The delay after `n` consecutive failures is
/// `min(base * multiplier^(n-1), max)` randomized by `±jitter`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub multiplier: f64,
    pub jitter: f64,
    pub max_delay: Duration,
    /// Lower bound for a single connection attempt.
    pub min_connect_timeout: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(200),
            multiplier: 1.6,
            jitter: 0.2,
            max_delay: Duration::from_secs(3),
            min_connect_timeout: Duration::from_secs(2),
        }
    }
}

impl BackoffPolicy {
    /// Delay before reconnect attempt after `failures` consecutive failures.
    /// Zero failures means connect immediately.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }

        let capped = self.capped_delay(failures);
        if self.jitter <= 0.0 {
            return capped;
        }

        let factor = rand::thread_rng().gen_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        Duration::from_secs_f64(capped.as_secs_f64() * factor)
    }

    /// Time budget for a single attempt after `failures` consecutive failures.
    pub fn connect_timeout(&self, failures: u32) -> Duration {
        self.min_connect_timeout.max(self.capped_delay(failures.max(1)))
    }

    fn capped_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(64) as i32;
        let base_ms = self.base_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let max_ms = self.max_delay.as_millis() as f64;
        Duration::from_millis(base_ms.min(max_ms).round() as u64)
    }
}
