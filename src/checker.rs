//! Breach-check facade
//!
//! Orchestrates the full check: derive the k-anonymity split, consult
//! the cache tiers, gate on the circuit breaker and negative cache,
//! drive the network client through the retry scheduler, and degrade to
//! the local fallback validator whenever the corpus cannot be consulted.
//!
//! `check_password` never fails for network reasons; it returns an error
//! only for invalid input. Every other failure mode resolves, in bounded
//! time, to a `CheckResult` with `used_fallback` set.

use crate::breaker::{BreakerState, BreakerTransition, CircuitBreaker};
use crate::cache::CacheLayer;
use crate::client::{find_suffix, PwnedRangeClient, RangeClient};
use crate::config::CheckerConfig;
use crate::error::{BreachResult, CheckError};
use crate::fallback::{FallbackReason, FallbackValidator};
use crate::hash::{self, PasswordHash};
use crate::limiter::RateLimiter;
use crate::metrics::{MetricsRecorder, MetricsSnapshot};
use crate::policy::{PolicyReport, PolicyValidator};
use crate::request::{CancelToken, RequestRegistry};
use crate::retry::{adaptive_timeout, RetryPolicy};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of a single password check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Password appears in the breach corpus (or looks weak enough that
    /// the fallback validator flagged it)
    pub is_compromised: bool,

    /// Verdict came from the local heuristic, not the corpus
    pub used_fallback: bool,

    /// Why the fallback flagged the password, or why it ran at all
    pub fallback_reason: Option<FallbackReason>,

    /// Heuristic score; only set on fallback verdicts
    pub security_score: Option<i32>,

    /// Distinct-character ratio; only set on fallback verdicts
    pub entropy_ratio: Option<f64>,

    /// Character classes present; only set on fallback verdicts
    pub charset_count: Option<u32>,

    /// Occurrence count from the corpus; only set on a live hit
    pub breach_count: Option<u64>,

    /// Identity of this check in the request registry
    pub request_id: Uuid,
}

impl CheckResult {
    fn live(request_id: Uuid, breach_count: Option<u64>) -> Self {
        Self {
            is_compromised: breach_count.is_some(),
            used_fallback: false,
            fallback_reason: None,
            security_score: None,
            entropy_ratio: None,
            charset_count: None,
            breach_count,
            request_id,
        }
    }
}

/// Privacy-preserving breach checker with graceful degradation
pub struct BreachChecker {
    client: Arc<dyn RangeClient>,
    cache: CacheLayer,
    breaker: CircuitBreaker,
    limiter: RateLimiter,
    retry: RetryPolicy,
    fallback: FallbackValidator,
    policy: PolicyValidator,
    metrics: MetricsRecorder,
    requests: RequestRegistry,
    base_timeout: Duration,
}

impl BreachChecker {
    /// Create a checker backed by the real range API
    pub fn new(config: CheckerConfig) -> BreachResult<Self> {
        let client = Arc::new(PwnedRangeClient::new(&config.network)?);
        Self::with_client(config, client)
    }

    /// Create a checker with an injected range client
    pub fn with_client(
        config: CheckerConfig,
        client: Arc<dyn RangeClient>,
    ) -> BreachResult<Self> {
        config.validate()?;

        Ok(Self {
            client,
            cache: CacheLayer::new(&config.cache),
            breaker: CircuitBreaker::new(
                config.breaker.failure_threshold,
                config.breaker.reset_timeout(),
            ),
            limiter: RateLimiter::new(config.network.min_request_interval()),
            retry: RetryPolicy::new(&config.retry),
            fallback: FallbackValidator::new(),
            policy: PolicyValidator::new(&config.policy),
            metrics: MetricsRecorder::new(),
            requests: RequestRegistry::new(),
            base_timeout: config.network.base_timeout(),
        })
    }

    /// Check a password against the breach corpus.
    ///
    /// Resolves in bounded time with either a live verdict or a fallback
    /// one; errs only on invalid input.
    pub async fn check_password(&self, password: &str) -> BreachResult<CheckResult> {
        let hash = hash::derive(password)?;
        self.metrics.record_request();

        let (id, token) = self.requests.register();
        let result = self.run_check(password, &hash, id, &token).await;
        self.requests.complete(&id);
        result
    }

    /// Gate for the breach check: skip passwords below the policy's
    /// minimum length
    pub fn should_check(&self, password: &str) -> bool {
        self.policy.should_check(password)
    }

    /// Run the local complexity and personal-info policy
    pub fn validate_policy(
        &self,
        password: &str,
        username: Option<&str>,
        email: Option<&str>,
    ) -> PolicyReport {
        self.policy.validate(password, username, email)
    }

    /// Point-in-time metrics counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.breaker.state())
    }

    /// Zero metrics counters and timing samples
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Current circuit breaker state
    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    /// Force the circuit breaker closed.
    ///
    /// In-flight retry sequences notice on their next attempt.
    pub fn reset_circuit_breaker(&self) {
        self.breaker.reset();
    }

    /// Drop positive cache entries; the persistent tier only when
    /// requested
    pub fn clear_cache(&self, include_persistent: bool) {
        self.cache.clear(include_persistent);
    }

    /// Drop all negative cache entries
    pub fn clear_negative_cache(&self) {
        self.cache.clear_negative();
    }

    /// Cancel one in-flight check; it resolves with a
    /// `request_cancelled` fallback verdict
    pub fn cancel_request(&self, id: &Uuid) -> bool {
        self.requests.cancel(id)
    }

    /// Cancel every in-flight check, returning how many were signalled
    pub fn cancel_all_requests(&self) -> usize {
        self.requests.cancel_all()
    }

    /// Number of checks currently in flight
    pub fn active_requests(&self) -> usize {
        self.requests.active()
    }

    /// Ids of checks currently in flight, oldest first
    pub fn active_request_ids(&self) -> Vec<Uuid> {
        self.requests.active_ids()
    }

    async fn run_check(
        &self,
        password: &str,
        hash: &PasswordHash,
        id: Uuid,
        token: &CancelToken,
    ) -> BreachResult<CheckResult> {
        if let Some(payload) = self.cache.get(&hash.prefix) {
            self.metrics.record_cache_hit();
            debug!(prefix = %hash.prefix, "cache hit");
            return Ok(CheckResult::live(id, find_suffix(&payload, &hash.suffix)));
        }
        self.metrics.record_cache_miss();

        if !self.breaker.is_call_allowed() {
            debug!(prefix = %hash.prefix, "circuit breaker open, using fallback");
            return Ok(self.fallback_result(password, id, None));
        }

        if let Some(kind) = self.cache.negative_get(&hash.prefix) {
            debug!(
                prefix = %hash.prefix,
                kind = kind.as_str(),
                "negative cache hit, using fallback"
            );
            return Ok(self.fallback_result(password, id, None));
        }

        match self.query_with_retries(&hash.prefix, token).await {
            Ok(payload) => {
                let breach_count = find_suffix(&payload, &hash.suffix);
                self.cache.put(&hash.prefix, &payload);
                if let Some(count) = breach_count {
                    info!(prefix = %hash.prefix, count, "password found in breach corpus");
                }
                Ok(CheckResult::live(id, breach_count))
            }
            Err(CheckError::Cancelled) => {
                self.metrics.record_cancelled();
                debug!(prefix = %hash.prefix, "check cancelled");
                Ok(self.fallback_result(password, id, Some(FallbackReason::RequestCancelled)))
            }
            Err(err) => {
                self.metrics.record_failure();
                if err.is_negative_cacheable() {
                    self.cache.negative_put(&hash.prefix, err.kind());
                }
                warn!(
                    prefix = %hash.prefix,
                    error = %err,
                    "breach corpus unavailable, using fallback"
                );
                Ok(self.fallback_result(password, id, None))
            }
        }
    }

    /// Drive the range client until success, exhaustion, cancellation,
    /// or a non-retryable error
    async fn query_with_retries(
        &self,
        prefix: &str,
        token: &CancelToken,
    ) -> BreachResult<String> {
        let mut last_error: Option<CheckError> = None;

        for attempt in 0..self.retry.max_attempts() {
            if token.is_cancelled() {
                return Err(CheckError::Cancelled);
            }
            // The breaker may have tripped mid-sequence, possibly from
            // another call's failures.
            if !self.breaker.is_call_allowed() {
                break;
            }

            if attempt > 0 {
                let delay = self
                    .retry
                    .backoff_delay(attempt - 1, self.breaker.has_recent_failures());
                debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
                tokio::select! {
                    _ = token.cancelled() => return Err(CheckError::Cancelled),
                    _ = sleep(delay) => {}
                }
            }

            self.limiter.acquire().await;

            let timeout = adaptive_timeout(self.base_timeout, self.metrics.p95_response_time());
            let started = Instant::now();

            match self.client.query_range(prefix, timeout, token).await {
                Ok(payload) => {
                    self.metrics.record_response_time(started.elapsed());
                    self.breaker.record_success();
                    return Ok(payload);
                }
                Err(CheckError::Cancelled) => return Err(CheckError::Cancelled),
                Err(err) => {
                    warn!(prefix, attempt, error = %err, "range query failed");
                    if self.breaker.record_failure() == BreakerTransition::Opened {
                        self.metrics.record_breaker_trip();
                    }
                    let retryable = err.is_retryable();
                    last_error = Some(err);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| CheckError::Network("circuit opened before first attempt".into())))
    }

    fn fallback_result(
        &self,
        password: &str,
        id: Uuid,
        forced_reason: Option<FallbackReason>,
    ) -> CheckResult {
        self.metrics.record_fallback();
        let verdict = self.fallback.evaluate(password);

        CheckResult {
            is_compromised: verdict.is_compromised,
            used_fallback: true,
            fallback_reason: forced_reason.or(verdict.reason),
            security_score: Some(verdict.security_score),
            entropy_ratio: Some(verdict.entropy_ratio),
            charset_count: Some(verdict.charset_count),
            breach_count: None,
            request_id: id,
        }
    }
}
