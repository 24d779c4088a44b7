//! Outbound call rate limiting
//!
//! Enforces a minimum spacing between range queries across the whole
//! checker, not per prefix. The async mutex serializes callers; a caller
//! arriving too soon sleeps while holding the lock, so concurrent checks
//! queue up behind it in arrival order.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Process-wide minimum-spacing gate for outbound calls
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum inter-call spacing
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until the next outbound call is permitted.
    ///
    /// Returns once this caller owns the next call slot; the slot is
    /// stamped before returning so the following caller waits relative
    /// to it.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}
