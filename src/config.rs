//! Configuration schema for the breach checker
//!
//! The crate reads no files itself; callers deserialize `CheckerConfig`
//! from their own configuration source or use the defaults. All durations
//! are stored as integer milliseconds/seconds so the structs stay plain
//! serde types.

use crate::error::{BreachResult, CheckError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Remote range endpoint settings
    pub network: NetworkConfig,

    /// Retry and backoff settings
    pub retry: RetryConfig,

    /// Circuit breaker settings
    pub breaker: BreakerConfig,

    /// Cache tier settings
    pub cache: CacheConfig,

    /// Local policy settings
    pub policy: PolicyConfig,
}

impl CheckerConfig {
    /// Validate cross-field constraints.
    ///
    /// Non-HTTPS endpoints are refused outright; sending even a 5-char
    /// hash prefix in cleartext defeats the privacy model.
    pub fn validate(&self) -> BreachResult<()> {
        if !self.network.base_url.starts_with("https://") {
            tracing::warn!(
                endpoint = %self.network.base_url,
                "rejecting non-HTTPS breach endpoint"
            );
            return Err(CheckError::InsecureEndpoint(self.network.base_url.clone()));
        }
        Ok(())
    }
}

/// Remote range endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Base URL of the range API (must be HTTPS)
    pub base_url: String,

    /// User-Agent header sent with every range query
    pub user_agent: String,

    /// Base per-attempt timeout in milliseconds; the adaptive timeout
    /// stays within [0.5x, 2x] of this value
    pub base_timeout_ms: u64,

    /// Minimum spacing between outbound calls in milliseconds
    pub min_request_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.pwnedpasswords.com".to_string(),
            user_agent: format!("breachgate/{}", env!("CARGO_PKG_VERSION")),
            base_timeout_ms: 5_000,
            min_request_interval_ms: 100,
        }
    }
}

impl NetworkConfig {
    /// Base per-attempt timeout
    pub fn base_timeout(&self) -> Duration {
        Duration::from_millis(self.base_timeout_ms)
    }

    /// Minimum spacing between outbound calls
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

/// Retry and backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempt budget per check, including the first attempt
    pub attempts: u32,

    /// Base backoff delay in milliseconds
    pub base_delay_ms: u64,

    /// Upper bound on a single backoff delay in milliseconds
    pub max_delay_ms: u64,

    /// Random jitter fraction added to each delay (0.0 disables jitter)
    pub jitter: f64,

    /// Backoff multiplier applied while the breaker has recent failures
    pub stress_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter: 0.25,
            stress_multiplier: 1.5,
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens
    pub failure_threshold: u32,

    /// Cooldown before an open breaker admits a trial call, in milliseconds
    pub reset_timeout_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
        }
    }
}

impl BreakerConfig {
    /// Cooldown before an open breaker admits a trial call
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

/// Cache tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Regular tier TTL in seconds
    pub regular_ttl_secs: u64,

    /// Persistent tier TTL in seconds
    pub persistent_ttl_secs: u64,

    /// Negative tier TTL in seconds
    pub negative_ttl_secs: u64,

    /// Maximum entries in the regular tier
    pub regular_capacity: usize,

    /// Maximum entries in the persistent tier
    pub persistent_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            regular_ttl_secs: 1_800,
            persistent_ttl_secs: 86_400,
            negative_ttl_secs: 600,
            regular_capacity: 500,
            persistent_capacity: 1_000,
        }
    }
}

impl CacheConfig {
    /// Regular tier TTL
    pub fn regular_ttl(&self) -> Duration {
        Duration::from_secs(self.regular_ttl_secs)
    }

    /// Persistent tier TTL
    pub fn persistent_ttl(&self) -> Duration {
        Duration::from_secs(self.persistent_ttl_secs)
    }

    /// Negative tier TTL
    pub fn negative_ttl(&self) -> Duration {
        Duration::from_secs(self.negative_ttl_secs)
    }
}

/// Local policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Minimum password length; also gates `should_check`
    pub min_length: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self { min_length: 10 }
    }
}
