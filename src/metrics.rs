//! Request counters and response-time statistics
//!
//! Monotonic counters plus a bounded ring buffer of recent response
//! times. The p95 of the buffer feeds the adaptive per-attempt timeout;
//! snapshots go to observability layers.

use crate::breaker::BreakerState;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Number of response-time samples kept for percentile math
const RESPONSE_WINDOW: usize = 64;

#[derive(Default)]
struct MetricsInner {
    total_requests: u64,
    cache_hits: u64,
    cache_misses: u64,
    failed_requests: u64,
    cancelled_requests: u64,
    circuit_breaker_trips: u64,
    fallback_activations: u64,
    response_times: VecDeque<Duration>,
}

/// Shared counter store for one checker instance
pub struct MetricsRecorder {
    inner: Mutex<MetricsInner>,
}

impl MetricsRecorder {
    /// Create a zeroed recorder
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsInner::default()),
        }
    }

    /// Count a `check_password` invocation
    pub fn record_request(&self) {
        self.lock().total_requests += 1;
    }

    /// Count a positive-cache hit
    pub fn record_cache_hit(&self) {
        self.lock().cache_hits += 1;
    }

    /// Count a positive-cache miss
    pub fn record_cache_miss(&self) {
        self.lock().cache_misses += 1;
    }

    /// Count a check whose network path was exhausted
    pub fn record_failure(&self) {
        self.lock().failed_requests += 1;
    }

    /// Count a check resolved by cancellation
    pub fn record_cancelled(&self) {
        self.lock().cancelled_requests += 1;
    }

    /// Count a breaker trip (transition to open)
    pub fn record_breaker_trip(&self) {
        self.lock().circuit_breaker_trips += 1;
    }

    /// Count a fallback-validator verdict
    pub fn record_fallback(&self) {
        self.lock().fallback_activations += 1;
    }

    /// Add a successful response time to the ring buffer
    pub fn record_response_time(&self, elapsed: Duration) {
        let mut inner = self.lock();
        if inner.response_times.len() >= RESPONSE_WINDOW {
            inner.response_times.pop_front();
        }
        inner.response_times.push_back(elapsed);
    }

    /// p95 of recent response times, if any samples exist
    pub fn p95_response_time(&self) -> Option<Duration> {
        percentile_95(&self.lock().response_times)
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self, breaker_state: BreakerState) -> MetricsSnapshot {
        let inner = self.lock();
        let sample_count = inner.response_times.len();
        let avg_response_ms = if sample_count > 0 {
            let total: Duration = inner.response_times.iter().sum();
            Some(total.as_millis() as u64 / sample_count as u64)
        } else {
            None
        };

        MetricsSnapshot {
            total_requests: inner.total_requests,
            cache_hits: inner.cache_hits,
            cache_misses: inner.cache_misses,
            failed_requests: inner.failed_requests,
            cancelled_requests: inner.cancelled_requests,
            circuit_breaker_trips: inner.circuit_breaker_trips,
            fallback_activations: inner.fallback_activations,
            response_samples: sample_count,
            avg_response_ms,
            p95_response_ms: percentile_95(&inner.response_times).map(|d| d.as_millis() as u64),
            breaker_state: breaker_state.as_str(),
        }
    }

    /// Zero all counters and drop timing samples
    pub fn reset(&self) {
        *self.lock() = MetricsInner::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsInner> {
        self.inner.lock().expect("metrics lock poisoned")
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn percentile_95(samples: &VecDeque<Duration>) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted: Vec<Duration> = samples.iter().copied().collect();
    sorted.sort_unstable();
    let rank = ((sorted.len() as f64) * 0.95).ceil() as usize;
    Some(sorted[rank.clamp(1, sorted.len()) - 1])
}

/// Point-in-time counter values
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub failed_requests: u64,
    pub cancelled_requests: u64,
    pub circuit_breaker_trips: u64,
    pub fallback_activations: u64,
    pub response_samples: usize,
    pub avg_response_ms: Option<u64>,
    pub p95_response_ms: Option<u64>,
    pub breaker_state: &'static str,
}
