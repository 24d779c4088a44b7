//! breachgate - Privacy-Preserving Password Breach Checking
//!
//! Checks candidate passwords against a public breach corpus using
//! k-anonymity range queries, and keeps answering when the remote
//! service is slow, rate-limiting, or unreachable: circuit breaking,
//! tiered caching, adaptive retries, and a zero-network heuristic
//! fallback.
//!
//! ```no_run
//! use breachgate::{BreachChecker, CheckerConfig};
//!
//! # async fn example() -> breachgate::BreachResult<()> {
//! let checker = BreachChecker::new(CheckerConfig::default())?;
//!
//! if checker.should_check("correct horse battery staple") {
//!     let result = checker.check_password("correct horse battery staple").await?;
//!     if result.is_compromised {
//!         // reject or warn, noting result.used_fallback for confidence
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod breaker;
pub mod cache;
pub mod checker;
pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod hash;
pub mod limiter;
pub mod metrics;
pub mod policy;
pub mod request;
pub mod retry;

pub use breaker::BreakerState;
pub use checker::{BreachChecker, CheckResult};
pub use client::RangeClient;
pub use config::CheckerConfig;
pub use error::{BreachResult, CheckError, ErrorKind};
pub use fallback::{FallbackReason, FallbackValidator, FallbackVerdict};
pub use metrics::MetricsSnapshot;
pub use policy::PolicyReport;
pub use request::CancelToken;
