//! Shared token-bucket rate limiter keyed per external provider (§5
//! "external fetchers are rate-limited by a shared token bucket keyed per
//! provider").

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// `{maxRequests, windowMs}` token bucket: `maxRequests` tokens refill over
/// `windowMs`, continuously. `acquire` suspends the caller until a token is
/// available rather than rejecting the call outright.
pub struct RateLimiter {
    max_requests: f64,
    window: Duration,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests: max_requests.max(1) as f64,
            window: Duration::from_millis(window_ms.max(1)),
            state: Mutex::new(BucketState {
                tokens: max_requests.max(1) as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill);
        let refill_rate = self.max_requests / self.window.as_secs_f64();
        state.tokens = (state.tokens + elapsed.as_secs_f64() * refill_rate).min(self.max_requests);
        state.last_refill = now;
    }

    /// Waits until a token is available, then consumes it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock();
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    None
                } else {
                    let refill_rate = self.max_requests / self.window.as_secs_f64();
                    let deficit = 1.0 - state.tokens;
                    Some(Duration::from_secs_f64((deficit / refill_rate).max(0.001)))
                }
            };
            match wait {
                None => return,
                Some(d) => tokio::time::sleep(d).await,
            }
        }
    }
}
