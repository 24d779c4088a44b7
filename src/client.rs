//! Breach-range network client
//!
//! One HTTPS `GET {base_url}/range/{prefix}` per call, timeout- and
//! cancel-bounded, with no retries at this layer. The trait seam lets
//! tests inject a scripted client with zero real network.
//!
//! Only the 5-character hash prefix appears in URLs and log fields; the
//! response is the full anonymity set for that prefix, matched against
//! the local suffix by the caller.

use crate::config::NetworkConfig;
use crate::error::{BreachResult, CheckError};
use crate::request::CancelToken;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Length of the hash suffix in every response line
const SUFFIX_LEN: usize = 35;

/// Abstract range-query interface
///
/// Implementations perform exactly one query per call and map every
/// outcome onto a `CheckError`; retry policy lives with the caller.
#[async_trait]
pub trait RangeClient: Send + Sync {
    /// Fetch the `SUFFIX:COUNT` lines for a hash prefix.
    ///
    /// Must resolve within `timeout` or when `cancel` fires, whichever
    /// comes first.
    async fn query_range(
        &self,
        prefix: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> BreachResult<String>;
}

/// HTTPS client for the k-anonymity range API
pub struct PwnedRangeClient {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl PwnedRangeClient {
    /// Create a client, refusing non-HTTPS endpoints
    pub fn new(config: &NetworkConfig) -> BreachResult<Self> {
        if !config.base_url.starts_with("https://") {
            tracing::warn!(
                endpoint = %config.base_url,
                "rejecting non-HTTPS breach endpoint"
            );
            return Err(CheckError::InsecureEndpoint(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CheckError::Network(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        })
    }
}

#[async_trait]
impl RangeClient for PwnedRangeClient {
    async fn query_range(
        &self,
        prefix: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> BreachResult<String> {
        let url = format!("{}/range/{}", self.base_url, prefix);
        debug!(prefix, timeout_ms = timeout.as_millis() as u64, "range query");

        let request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/plain")
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(timeout);

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(CheckError::Cancelled),
            result = request.send() => result.map_err(|e| classify_transport_error(e, timeout))?,
        };

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CheckError::RateLimited);
        }
        if !status.is_success() {
            return Err(CheckError::ServiceUnavailable {
                status: status.as_u16(),
            });
        }

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(CheckError::Cancelled),
            result = response.text() => result.map_err(|e| classify_transport_error(e, timeout))?,
        };

        validate_range_body(&body)?;
        Ok(body)
    }
}

fn classify_transport_error(error: reqwest::Error, timeout: Duration) -> CheckError {
    if error.is_timeout() {
        CheckError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        // reqwest errors carry the URL, which holds only the prefix.
        CheckError::Network(error.to_string())
    }
}

/// Validate a raw range response.
///
/// Every non-empty line must be `SUFFIX:COUNT` with a 35-character hex
/// suffix and a numeric count. An empty body is a valid no-match
/// response.
pub fn validate_range_body(body: &str) -> BreachResult<()> {
    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let (suffix, count) = line
            .split_once(':')
            .ok_or_else(|| CheckError::Parse("line missing ':' separator".to_string()))?;

        if suffix.len() != SUFFIX_LEN || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CheckError::Parse(format!(
                "expected {SUFFIX_LEN}-char hex suffix, got {} chars",
                suffix.len()
            )));
        }
        if count.trim().parse::<u64>().is_err() {
            return Err(CheckError::Parse("non-numeric occurrence count".to_string()));
        }
    }
    Ok(())
}

/// Match a local hash suffix against a range response, returning the
/// breach count on a hit.
///
/// The comparison is exact (case-insensitive hex); assumes the body
/// already passed `validate_range_body`.
pub fn find_suffix(body: &str, suffix: &str) -> Option<u64> {
    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if let Some((candidate, count)) = line.split_once(':') {
            if candidate.eq_ignore_ascii_case(suffix) {
                return count.trim().parse::<u64>().ok();
            }
        }
    }
    None
}
