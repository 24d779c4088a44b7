//! Integration tests for breachgate
//!
//! Every test drives the public facade against a scripted range client;
//! no real network is involved. Timing-sensitive flows run under tokio's
//! paused clock so backoff and cooldown windows elapse instantly.

mod mock {
    use async_trait::async_trait;
    use breachgate::{BreachResult, CancelToken, CheckError, RangeClient};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// One scripted response from the mock range client
    #[derive(Clone)]
    pub enum Outcome {
        Reply(String),
        Fail(CheckError),
        HangUntilCancelled,
    }

    /// Scripted `RangeClient` that counts calls
    pub struct MockRangeClient {
        script: Mutex<VecDeque<Outcome>>,
        default: Outcome,
        calls: AtomicUsize,
    }

    impl MockRangeClient {
        pub fn with_default(default: Outcome) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                default,
                calls: AtomicUsize::new(0),
            }
        }

        /// Consume `outcomes` in order, then fall back to `default`
        pub fn scripted(outcomes: Vec<Outcome>, default: Outcome) -> Self {
            Self {
                script: Mutex::new(outcomes.into()),
                default,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RangeClient for MockRangeClient {
        async fn query_range(
            &self,
            _prefix: &str,
            _timeout: Duration,
            cancel: &CancelToken,
        ) -> BreachResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let outcome = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default.clone());

            match outcome {
                Outcome::Reply(body) => Ok(body),
                Outcome::Fail(err) => Err(err),
                Outcome::HangUntilCancelled => {
                    cancel.cancelled().await;
                    Err(CheckError::Cancelled)
                }
            }
        }
    }
}

mod checker_tests {
    use super::mock::{MockRangeClient, Outcome};
    use breachgate::{
        hash, BreachChecker, BreakerState, CheckError, CheckerConfig, FallbackReason,
    };
    use std::sync::Arc;
    use std::time::Duration;

    /// Config with jitter disabled so paused-clock assertions are exact
    fn test_config() -> CheckerConfig {
        let mut config = CheckerConfig::default();
        config.retry.jitter = 0.0;
        config
    }

    fn checker_with(client: Arc<MockRangeClient>) -> BreachChecker {
        BreachChecker::with_client(test_config(), client).unwrap()
    }

    /// Range body that lists the given password's own suffix
    fn body_listing(password: &str, count: u64) -> String {
        let split = hash::derive(password).unwrap();
        format!(
            "0123456789ABCDEF0123456789ABCDEF012:1\r\n{}:{}",
            split.suffix, count
        )
    }

    /// Range body with no matching suffix
    fn body_without_match() -> String {
        "0123456789ABCDEF0123456789ABCDEF012:1".to_string()
    }

    #[tokio::test]
    async fn compromised_when_suffix_listed() {
        let password = "N0t-A-G00d-Cho1ce!";
        let client = Arc::new(MockRangeClient::with_default(Outcome::Reply(body_listing(
            password, 1337,
        ))));
        let checker = checker_with(Arc::clone(&client));

        let result = checker.check_password(password).await.unwrap();
        assert!(result.is_compromised);
        assert!(!result.used_fallback);
        assert_eq!(result.breach_count, Some(1337));
    }

    #[tokio::test]
    async fn clean_when_suffix_absent() {
        let client = Arc::new(MockRangeClient::with_default(Outcome::Reply(
            body_without_match(),
        )));
        let checker = checker_with(Arc::clone(&client));

        let result = checker.check_password("G3nu1nely-Un!que-Phr4se").await.unwrap();
        assert!(!result.is_compromised);
        assert!(!result.used_fallback);
        assert!(result.breach_count.is_none());
    }

    #[tokio::test]
    async fn second_check_served_from_cache() {
        let password = "C4ched-F0rever!Xy";
        let client = Arc::new(MockRangeClient::with_default(Outcome::Reply(body_listing(
            password, 3,
        ))));
        let checker = checker_with(Arc::clone(&client));

        let first = checker.check_password(password).await.unwrap();
        let second = checker.check_password(password).await.unwrap();

        assert_eq!(client.calls(), 1);
        assert_eq!(first.is_compromised, second.is_compromised);

        let metrics = checker.metrics();
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.cache_misses, 1);
    }

    #[tokio::test]
    async fn clear_cache_forces_requery() {
        let password = "C4ched-F0rever!Xy";
        let client = Arc::new(MockRangeClient::with_default(Outcome::Reply(body_listing(
            password, 3,
        ))));
        let checker = checker_with(Arc::clone(&client));

        checker.check_password(password).await.unwrap();
        checker.clear_cache(true);
        checker.check_password(password).await.unwrap();

        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn regular_clear_still_serves_from_persistent_tier() {
        let password = "C4ched-F0rever!Xy";
        let client = Arc::new(MockRangeClient::with_default(Outcome::Reply(body_listing(
            password, 3,
        ))));
        let checker = checker_with(Arc::clone(&client));

        checker.check_password(password).await.unwrap();
        checker.clear_cache(false);
        checker.check_password(password).await.unwrap();

        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn breaker_opens_after_consecutive_failures() {
        let client = Arc::new(MockRangeClient::with_default(Outcome::Fail(
            CheckError::Network("connection refused".into()),
        )));
        let checker = checker_with(Arc::clone(&client));

        // One check burns the full attempt budget: 5 failures, breaker opens.
        let result = checker.check_password("F1rst-Attempt!Xyz").await.unwrap();
        assert!(result.used_fallback);
        assert_eq!(client.calls(), 5);
        assert_eq!(checker.breaker_state(), BreakerState::Open);

        // Next check fails fast with zero network calls.
        let result = checker.check_password("Sec0nd-Attempt!Xyz").await.unwrap();
        assert!(result.used_fallback);
        assert_eq!(client.calls(), 5);

        let metrics = checker.metrics();
        assert_eq!(metrics.circuit_breaker_trips, 1);
        assert_eq!(metrics.fallback_activations, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_admits_exactly_one_trial() {
        let password = "Th1rd-Attempt!Xyz";
        let client = Arc::new(MockRangeClient::scripted(
            vec![
                Outcome::Fail(CheckError::Network("down".into())),
                Outcome::Fail(CheckError::Network("down".into())),
                Outcome::Fail(CheckError::Network("down".into())),
                Outcome::Fail(CheckError::Network("down".into())),
                Outcome::Fail(CheckError::Network("down".into())),
            ],
            Outcome::Reply(body_without_match()),
        ));
        let checker = checker_with(Arc::clone(&client));

        checker.check_password("F1rst-Attempt!Xyz").await.unwrap();
        assert_eq!(checker.breaker_state(), BreakerState::Open);
        let calls_when_open = client.calls();

        tokio::time::advance(Duration::from_secs(30)).await;

        // The trial call succeeds and closes the breaker.
        let result = checker.check_password(password).await.unwrap();
        assert!(!result.used_fallback);
        assert_eq!(client.calls(), calls_when_open + 1);
        assert_eq!(checker.breaker_state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_trial_reopens_breaker() {
        let client = Arc::new(MockRangeClient::with_default(Outcome::Fail(
            CheckError::Network("still down".into()),
        )));
        let checker = checker_with(Arc::clone(&client));

        checker.check_password("F1rst-Attempt!Xyz").await.unwrap();
        assert_eq!(checker.breaker_state(), BreakerState::Open);
        let calls_when_open = client.calls();

        tokio::time::advance(Duration::from_secs(30)).await;

        // Trial fails on the first attempt; the reopened breaker stops
        // the rest of the retry sequence.
        checker.check_password("Sec0nd-Attempt!Xyz").await.unwrap();
        assert_eq!(client.calls(), calls_when_open + 1);
        assert_eq!(checker.breaker_state(), BreakerState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_circuit_breaker_reenables_network() {
        let client = Arc::new(MockRangeClient::scripted(
            vec![
                Outcome::Fail(CheckError::Network("down".into())),
                Outcome::Fail(CheckError::Network("down".into())),
                Outcome::Fail(CheckError::Network("down".into())),
                Outcome::Fail(CheckError::Network("down".into())),
                Outcome::Fail(CheckError::Network("down".into())),
            ],
            Outcome::Reply(body_without_match()),
        ));
        let checker = checker_with(Arc::clone(&client));

        checker.check_password("F1rst-Attempt!Xyz").await.unwrap();
        assert_eq!(checker.breaker_state(), BreakerState::Open);

        checker.reset_circuit_breaker();
        let result = checker.check_password("Sec0nd-Attempt!Xyz").await.unwrap();
        assert!(!result.used_fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_error_stops_retries_immediately() {
        let client = Arc::new(MockRangeClient::with_default(Outcome::Fail(
            CheckError::RateLimited,
        )));
        let checker = checker_with(Arc::clone(&client));

        let result = checker.check_password("R4te-L1mited!Xyz").await.unwrap();
        assert!(result.used_fallback);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn parse_error_negative_caches_prefix() {
        let password = "P4rse-F4ilure!Xyz";
        let client = Arc::new(MockRangeClient::scripted(
            vec![Outcome::Fail(CheckError::Parse("garbage body".into()))],
            Outcome::Reply(body_without_match()),
        ));
        let checker = checker_with(Arc::clone(&client));

        let first = checker.check_password(password).await.unwrap();
        assert!(first.used_fallback);
        assert_eq!(client.calls(), 1);

        // Same prefix again: the negative cache short-circuits before
        // any network attempt.
        let second = checker.check_password(password).await.unwrap();
        assert!(second.used_fallback);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_negative_cache_reenables_prefix() {
        let password = "P4rse-F4ilure!Xyz";
        let client = Arc::new(MockRangeClient::scripted(
            vec![Outcome::Fail(CheckError::Parse("garbage body".into()))],
            Outcome::Reply(body_without_match()),
        ));
        let checker = checker_with(Arc::clone(&client));

        checker.check_password(password).await.unwrap();
        checker.clear_negative_cache();

        let result = checker.check_password(password).await.unwrap();
        assert!(!result.used_fallback);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_errors_are_not_negative_cached() {
        let password = "T1me0ut-Err0r!Xyz";
        let client = Arc::new(MockRangeClient::scripted(
            vec![
                Outcome::Fail(CheckError::Timeout { timeout_ms: 5000 }),
                Outcome::Fail(CheckError::Timeout { timeout_ms: 5000 }),
                Outcome::Fail(CheckError::Timeout { timeout_ms: 5000 }),
                Outcome::Fail(CheckError::Timeout { timeout_ms: 5000 }),
                Outcome::Fail(CheckError::Timeout { timeout_ms: 5000 }),
            ],
            Outcome::Reply(body_without_match()),
        ));
        let checker = checker_with(Arc::clone(&client));

        let first = checker.check_password(password).await.unwrap();
        assert!(first.used_fallback);

        // Breaker is open after five timeouts; reset it to prove the
        // prefix itself was never poisoned.
        checker.reset_circuit_breaker();
        let second = checker.check_password(password).await.unwrap();
        assert!(!second.used_fallback);
    }

    #[tokio::test]
    async fn fallback_verdicts_carry_heuristics() {
        let client = Arc::new(MockRangeClient::with_default(Outcome::Fail(
            CheckError::RateLimited,
        )));
        let checker = checker_with(Arc::clone(&client));

        let result = checker.check_password("password123").await.unwrap();
        assert!(result.used_fallback);
        assert!(result.is_compromised);
        assert_eq!(result.fallback_reason, Some(FallbackReason::CommonPattern));
        assert!(result.security_score.is_some());
        assert!(result.entropy_ratio.is_some());
        assert!(result.charset_count.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn strong_password_survives_outage() {
        let client = Arc::new(MockRangeClient::with_default(Outcome::Fail(
            CheckError::Network("total outage".into()),
        )));
        let checker = checker_with(Arc::clone(&client));

        let result = checker
            .check_password("Tr3m3nd0us!y$3cur3P@ss")
            .await
            .unwrap();
        assert!(result.used_fallback);
        assert!(!result.is_compromised);
        assert!(result.fallback_reason.is_none());
    }

    #[tokio::test]
    async fn cancel_all_resolves_in_flight_checks() {
        let client = Arc::new(MockRangeClient::with_default(Outcome::HangUntilCancelled));
        let checker = Arc::new(checker_with(Arc::clone(&client)));

        let mut handles = Vec::new();
        for password in ["H4nging-0ne!Xyzw", "H4nging-Tw0!Xyzw"] {
            let checker = Arc::clone(&checker);
            handles.push(tokio::spawn(async move {
                checker.check_password(password).await.unwrap()
            }));
        }

        // Let both checks reach the hanging network call.
        while checker.active_requests() < 2 {
            tokio::task::yield_now().await;
        }

        assert_eq!(checker.cancel_all_requests(), 2);

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.used_fallback);
            assert_eq!(result.fallback_reason, Some(FallbackReason::RequestCancelled));
        }

        assert_eq!(checker.active_requests(), 0);
        assert_eq!(checker.metrics().cancelled_requests, 2);
    }

    #[tokio::test]
    async fn cancel_single_request_by_id() {
        let client = Arc::new(MockRangeClient::with_default(Outcome::HangUntilCancelled));
        let checker = Arc::new(checker_with(Arc::clone(&client)));

        let task = {
            let checker = Arc::clone(&checker);
            tokio::spawn(async move { checker.check_password("H4nging-0ne!Xyzw").await.unwrap() })
        };

        while checker.active_requests() < 1 {
            tokio::task::yield_now().await;
        }
        let id = checker.active_request_ids()[0];

        assert!(checker.cancel_request(&id));
        let result = task.await.unwrap();
        assert_eq!(result.fallback_reason, Some(FallbackReason::RequestCancelled));

        // The id is gone once the call resolves.
        assert!(!checker.cancel_request(&id));
    }

    #[tokio::test]
    async fn metrics_reset() {
        let client = Arc::new(MockRangeClient::with_default(Outcome::Reply(
            body_without_match(),
        )));
        let checker = checker_with(Arc::clone(&client));

        checker.check_password("S0me-Passw0rd!Xy").await.unwrap();
        assert_eq!(checker.metrics().total_requests, 1);

        checker.reset_metrics();
        let metrics = checker.metrics();
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.cache_misses, 0);
        assert_eq!(metrics.response_samples, 0);
    }

    #[tokio::test]
    async fn check_result_serializes_for_ui_layers() {
        let client = Arc::new(MockRangeClient::with_default(Outcome::Fail(
            CheckError::RateLimited,
        )));
        let checker = checker_with(Arc::clone(&client));

        let result = checker.check_password("password123").await.unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["used_fallback"], true);
        assert_eq!(json["fallback_reason"], "common_pattern");
    }

    #[tokio::test]
    async fn policy_report_through_facade() {
        let client = Arc::new(MockRangeClient::with_default(Outcome::Reply(
            body_without_match(),
        )));
        let checker = checker_with(client);

        let report = checker.validate_policy("weak", None, None);
        assert!(!report.is_valid);

        let report = checker.validate_policy("Str0ng&Secure", Some("dean"), None);
        assert!(report.is_valid);
    }
}
