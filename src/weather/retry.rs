//! Retry/backoff policy for the weather fetcher (§4.3 step 3), grounded in
//! the teacher's `dlq::retry::ExponentialBackoff` shape but simplified to
//! the single exponential-with-jitter strategy the spec calls for.

use std::time::Duration;

/// `{attempts, initialDelayMs, backoffFactor, jitter}` from spec §4.3.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    /// Whether to apply up to +/-25% jitter to the computed delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay_ms: 500,
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// `initialDelayMs * backoffFactor^attempt`, plus up to +/-25% jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.backoff_factor.powi(attempt as i32);
        let delay_ms = if self.jitter {
            let jitter_frac = (rand::random::<f64>() - 0.5) * 0.5; // +/-25%
            (base * (1.0 + jitter_frac)).max(0.0)
        } else {
            base
        };
        Duration::from_millis(delay_ms.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_without_jitter() {
        let policy = RetryPolicy {
            attempts: 5,
            initial_delay_ms: 100,
            backoff_factor: 2.0,
            jitter: false,
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
    }

    #[test]
    fn jitter_stays_within_25_percent() {
        let policy = RetryPolicy {
            attempts: 5,
            initial_delay_ms: 1000,
            backoff_factor: 1.0,
            jitter: true,
        };
        for _ in 0..50 {
            let d = policy.delay_for_attempt(0).as_millis();
            assert!((750..=1250).contains(&d), "delay {d} out of jitter band");
        }
    }
}
