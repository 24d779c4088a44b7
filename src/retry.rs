//! Backoff scheduling and adaptive timeouts
//!
//! Delays grow exponentially with jitter, and stretch by a stress
//! multiplier while the circuit breaker has recent failures. Per-attempt
//! timeouts track the p95 of recent response times so a slow service
//! widens future deadlines and a fast one narrows them.

use crate::config::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff policy with jitter and stress scaling
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: f64,
    stress_multiplier: f64,
}

impl RetryPolicy {
    /// Build a policy from configuration
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter.clamp(0.0, 1.0),
            stress_multiplier: config.stress_multiplier.max(1.0),
        }
    }

    /// Total attempt budget per check, including the first attempt
    pub fn max_attempts(&self) -> u32 {
        self.attempts
    }

    /// Backoff delay after the given zero-based failed attempt.
    ///
    /// `delay = min(max_delay, base · 2^attempt · (1 + jitter·rand) · stress)`
    /// where `stress` applies while the breaker has recent failures.
    pub fn backoff_delay(&self, attempt: u32, under_stress: bool) -> Duration {
        let exponential = self.base_delay.as_millis() as f64 * 2f64.powi(attempt.min(16) as i32);
        let jitter_factor = 1.0 + self.jitter * rand::thread_rng().gen::<f64>();
        let stress_factor = if under_stress {
            self.stress_multiplier
        } else {
            1.0
        };

        let delay_ms = exponential * jitter_factor * stress_factor;
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as f64) as u64)
    }
}

/// Per-attempt timeout adapted to recent response-time history.
///
/// `clamp(2·p95, 0.5·base, 2·base)`; without history, the base timeout.
pub fn adaptive_timeout(base: Duration, p95: Option<Duration>) -> Duration {
    match p95 {
        Some(p95) => (p95 * 2).clamp(base / 2, base * 2),
        None => base,
    }
}
