//! Error types for breachgate
//!
//! All modules use `BreachResult<T>` as their return type. Only
//! `InvalidInput` and `InsecureEndpoint` ever reach callers of the public
//! API; every network-shaped failure is absorbed into a fallback verdict.

use thiserror::Error;

/// Result type alias for breachgate operations
pub type BreachResult<T> = Result<T, CheckError>;

/// All errors that can occur while checking a password
#[derive(Error, Debug, Clone)]
pub enum CheckError {
    // Input errors
    #[error("Password must be a non-empty string")]
    InvalidInput,

    #[error("Breach endpoint must use HTTPS: {0}")]
    InsecureEndpoint(String),

    // Network errors
    #[error("Range query timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Breach service rate limit exceeded")]
    RateLimited,

    #[error("Breach service unavailable (HTTP {status})")]
    ServiceUnavailable { status: u16 },

    #[error("Malformed range response: {0}")]
    Parse(String),

    // Cancellation
    #[error("Request cancelled")]
    Cancelled,
}

impl CheckError {
    /// Check if another network attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Network(_) | Self::ServiceUnavailable { .. }
        )
    }

    /// Check if the error should poison its hash prefix in the negative
    /// cache. Transient errors (timeout, connectivity) never qualify.
    pub fn is_negative_cacheable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServiceUnavailable { .. } | Self::Parse(_)
        )
    }

    /// Payload-free classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput => ErrorKind::InvalidInput,
            Self::InsecureEndpoint(_) => ErrorKind::InsecureEndpoint,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Network(_) => ErrorKind::Network,
            Self::RateLimited => ErrorKind::RateLimited,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Error classification without payload, used as the negative-cache value
/// and in log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    InsecureEndpoint,
    Timeout,
    Network,
    RateLimited,
    ServiceUnavailable,
    Parse,
    Cancelled,
}

impl ErrorKind {
    /// Stable lowercase name for log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::InsecureEndpoint => "insecure_endpoint",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::RateLimited => "rate_limited",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Parse => "parse",
            Self::Cancelled => "cancelled",
        }
    }
}
