//! Circuit breaker for the breach-range dependency
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - HalfOpen: cooldown elapsed, a trial call probes recovery
//!
//! # Transitions
//! ```text
//! Closed   → Open:     consecutive_failures >= threshold
//! Open     → HalfOpen: reset_timeout elapsed since last failure
//! HalfOpen → Closed:   trial call succeeds
//! HalfOpen → Open:     trial call fails (cooldown clock restarts)
//! ```
//!
//! Every network attempt reports its outcome here; any success while
//! Closed resets the failure count. State transitions are returned to the
//! caller so the facade can count breaker trips in its metrics.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Breaker state visible to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    /// Stable lowercase name for log fields and snapshots
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// State change produced by reporting a call outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerTransition {
    /// No state change
    None,
    /// Breaker tripped open
    Opened,
    /// Breaker closed after a successful trial
    Closed,
}

struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

/// CLOSED/OPEN/HALF_OPEN failure gate shared by all in-flight checks
pub struct CircuitBreaker {
    threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            threshold,
            reset_timeout,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
            }),
        }
    }

    /// Check whether a network call may be attempted.
    ///
    /// While Open, returns false until the cooldown elapses; the first
    /// check after the cooldown moves the breaker to HalfOpen and admits
    /// a single caller's trial.
    pub fn is_call_allowed(&self) -> bool {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        match inner.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let cooled_down = inner
                    .last_failure_at
                    .is_none_or(|at| at.elapsed() >= self.reset_timeout);
                if cooled_down {
                    debug!("circuit breaker cooldown elapsed, admitting trial call");
                    inner.state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Report a successful call
    pub fn record_success(&self) -> BreakerTransition {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.consecutive_failures = 0;
        match inner.state {
            BreakerState::Closed => BreakerTransition::None,
            // A success while Open comes from a call that was already in
            // flight when the breaker tripped; either way the dependency
            // answered, so close.
            BreakerState::HalfOpen | BreakerState::Open => {
                inner.state = BreakerState::Closed;
                inner.last_failure_at = None;
                debug!("circuit breaker closed");
                BreakerTransition::Closed
            }
        }
    }

    /// Report a failed call
    pub fn record_failure(&self) -> BreakerTransition {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.consecutive_failures += 1;
        inner.last_failure_at = Some(Instant::now());

        match inner.state {
            BreakerState::Closed => {
                if inner.consecutive_failures >= self.threshold {
                    inner.state = BreakerState::Open;
                    warn!(
                        failures = inner.consecutive_failures,
                        "circuit breaker opened"
                    );
                    BreakerTransition::Opened
                } else {
                    BreakerTransition::None
                }
            }
            BreakerState::HalfOpen => {
                // Failed trial: back to Open with a fresh cooldown clock.
                inner.state = BreakerState::Open;
                warn!("circuit breaker trial failed, reopening");
                BreakerTransition::Opened
            }
            BreakerState::Open => BreakerTransition::None,
        }
    }

    /// Current state, without side effects
    pub fn state(&self) -> BreakerState {
        self.inner.lock().expect("breaker lock poisoned").state
    }

    /// Consecutive failure count
    pub fn consecutive_failures(&self) -> u32 {
        self.inner
            .lock()
            .expect("breaker lock poisoned")
            .consecutive_failures
    }

    /// Check if the breaker has seen failures since the last success
    pub fn has_recent_failures(&self) -> bool {
        self.consecutive_failures() > 0
    }

    /// Force the breaker back to Closed, clearing failure history
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("breaker lock poisoned");
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.last_failure_at = None;
        debug!("circuit breaker manually reset");
    }
}
