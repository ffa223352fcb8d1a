//! The limiter engine (C6): ordered-conjunction rule evaluation plus the
//! primary→fallback→fail-open→raise failover state machine (§4.6).

use std::sync::Arc;
use std::time::Instant;

use crate::config::RateLimiterConfig;
use crate::decision::Decision;
use crate::error::StorageError;
use crate::observability::{NoopSink, ObservabilitySink};
use crate::rule::Rule;
use crate::store::local::LocalStore;
use crate::store::remote::RemoteStore;
use crate::store::Store;

/// Outcome of [`Limiter::check`]: whether the request is admitted, which
/// rule blocked it (if any), and how long the caller should wait.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Whether every rule admitted the request.
    pub allowed: bool,
    /// The rule that blocked the request, if any.
    pub violated_rule: Option<Rule>,
    /// Seconds to wait before retrying; `0` when `allowed` is `true`.
    pub retry_after_seconds: u32,
}

impl CheckResult {
    fn allow() -> Self {
        Self {
            allowed: true,
            violated_rule: None,
            retry_after_seconds: 0,
        }
    }

    fn deny(rule: Rule, retry_after_seconds: u32) -> Self {
        Self {
            allowed: false,
            violated_rule: Some(rule),
            retry_after_seconds,
        }
    }
}

/// The rate-limiting engine: a primary store, an optional fallback, and a
/// sink, wired together per the configuration flags in §6.
pub struct Limiter {
    primary: Arc<dyn Store>,
    fallback: Option<Arc<dyn Store>>,
    sink: Arc<dyn ObservabilitySink>,
    fail_open: bool,
    graceful_degradation: bool,
    enabled: bool,
}

impl Limiter {
    /// Build a limiter over the given primary store. Use the builder-style
    /// [`Limiter::with_fallback`] and [`Limiter::with_sink`] to customize
    /// failover and observability before use.
    pub fn new(primary: Arc<dyn Store>) -> Self {
        Self {
            primary,
            fallback: None,
            sink: Arc::new(NoopSink),
            fail_open: true,
            graceful_degradation: true,
            enabled: true,
        }
    }

    /// Build a limiter from a [`RateLimiterConfig`] (§6): constructs a
    /// [`RemoteStore`] from `config.remote`, attaches a [`LocalStore`]
    /// fallback when `config.in_memory_fallback` is set, and carries over
    /// `enabled`/`fail_open`/`graceful_degradation` verbatim.
    ///
    /// `global_rules` is not consumed here — callers combine it with any
    /// per-request rules before calling [`Limiter::check`], since the engine
    /// itself has no notion of "global" versus "local" rules, only an
    /// ordered list (§4.6).
    pub fn from_config(config: &RateLimiterConfig) -> Self {
        let mut limiter = Self::new(Arc::new(RemoteStore::new(config.remote.clone())))
            .fail_open(config.fail_open)
            .graceful_degradation(config.graceful_degradation)
            .enabled(config.enabled);

        if config.in_memory_fallback {
            limiter = limiter.with_fallback(Arc::new(LocalStore::new()));
        }

        limiter
    }

    /// Attach a fallback store, consulted when the primary raises and
    /// `graceful_degradation` is enabled.
    pub fn with_fallback(mut self, fallback: Arc<dyn Store>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Attach an observability sink. Defaults to [`NoopSink`].
    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Whether to admit a request when no store can answer. Default `true`.
    pub fn fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    /// Whether to attempt the fallback store on primary failure. Default
    /// `true`; has no effect if no fallback was attached.
    pub fn graceful_degradation(mut self, graceful_degradation: bool) -> Self {
        self.graceful_degradation = graceful_degradation;
        self
    }

    /// Master switch (§6 `enabled`). When `false`, [`Limiter::check`]
    /// short-circuits to allow without touching any store (§8 invariant 5).
    /// Default `true`.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Evaluate `rules` in order for `identity`. Returns on the first
    /// blocking rule without evaluating the rest (§8, invariant 6). When
    /// [`Limiter::enabled`] is `false`, returns an unconditional allow
    /// without issuing a single storage call.
    pub async fn check(
        &self,
        identity: &str,
        rules: &[Rule],
    ) -> Result<CheckResult, StorageError> {
        if !self.enabled {
            return Ok(CheckResult::allow());
        }

        for rule in rules {
            let key = rule.composite_key(identity);
            let decision = self.evaluate_rule(&key, rule).await?;

            if decision.allowed {
                self.sink.log_allowed(identity, rule, &decision);
            } else {
                self.sink.log_violation(identity, rule, &decision);
                return Ok(CheckResult::deny(rule.clone(), decision.retry_after_seconds));
            }
        }

        Ok(CheckResult::allow())
    }

    async fn evaluate_rule(&self, key: &str, rule: &Rule) -> Result<Decision, StorageError> {
        let started = Instant::now();
        let primary_result = self
            .primary
            .check_and_increment(
                key,
                rule.requests,
                rule.window_seconds,
                rule.strategy,
                rule.capacity,
                1,
            )
            .await;
        self.sink.observe_latency(rule, started.elapsed());

        match primary_result {
            Ok(decision) => Ok(decision),
            Err(primary_err) => {
                // §7: a primary failure is never silent, but it is also
                // never an error by itself — only the raise path at the
                // bottom of this function is.
                tracing::warn!(limit = %rule.limit_text, error = %primary_err, "primary store failed");

                if self.graceful_degradation {
                    if let Some(fallback) = &self.fallback {
                        return match fallback
                            .check_and_increment(
                                key,
                                rule.requests,
                                rule.window_seconds,
                                rule.strategy,
                                rule.capacity,
                                1,
                            )
                            .await
                        {
                            Ok(decision) => {
                                tracing::info!(limit = %rule.limit_text, "fallback store activated");
                                Ok(decision)
                            }
                            Err(_fallback_err) if self.fail_open => Ok(Decision::allow(0)),
                            Err(fallback_err) => {
                                tracing::error!(limit = %rule.limit_text, error = %fallback_err, "fallback store failed, raising");
                                Err(fallback_err)
                            }
                        };
                    }
                }

                if self.fail_open {
                    Ok(Decision::allow(0))
                } else {
                    tracing::error!(limit = %rule.limit_text, error = %primary_err, "no fallback available, raising");
                    Err(primary_err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Strategy;
    use crate::store::local::LocalStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingStore {
        calls: AtomicUsize,
    }

    impl FailingStore {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Store for FailingStore {
        async fn check_and_increment(
            &self,
            _key: &str,
            _limit: u32,
            _window_seconds: u32,
            _strategy: Strategy,
            _capacity: u32,
            _increment: u32,
        ) -> Result<Decision, StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::Connection("unreachable".to_string()))
        }

        async fn close(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn allows_up_to_limit_then_blocks_on_local_store() {
        let limiter = Limiter::new(Arc::new(LocalStore::new()));
        let rule = Rule::builder("2/10s").unwrap().build().unwrap();

        let first = limiter.check("user:1", &[rule.clone()]).await.unwrap();
        assert!(first.allowed);
        let second = limiter.check("user:1", &[rule.clone()]).await.unwrap();
        assert!(second.allowed);
        let third = limiter.check("user:1", &[rule.clone()]).await.unwrap();
        assert!(!third.allowed);
        assert_eq!(third.violated_rule.unwrap().limit_text, "2/10s");
    }

    #[tokio::test]
    async fn short_circuits_on_first_blocking_rule() {
        let generous = Rule::builder("100/60s").unwrap().build().unwrap();
        let strict = Rule::builder("1/60s").unwrap().build().unwrap();

        let limiter = Limiter::new(Arc::new(LocalStore::new()));
        limiter.check("user:1", &[strict.clone()]).await.unwrap();

        let result = limiter
            .check("user:1", &[generous, strict.clone()])
            .await
            .unwrap();

        assert!(!result.allowed);
        assert_eq!(result.violated_rule.unwrap().limit_text, "1/60s");
    }

    #[tokio::test]
    async fn falls_back_to_local_store_when_primary_fails() {
        let rule = Rule::builder("1/10s").unwrap().build().unwrap();
        let limiter = Limiter::new(Arc::new(FailingStore::new()))
            .with_fallback(Arc::new(LocalStore::new()));

        let result = limiter.check("user:1", &[rule]).await.unwrap();
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn fails_open_when_no_fallback_available() {
        let rule = Rule::builder("1/10s").unwrap().build().unwrap();
        let limiter = Limiter::new(Arc::new(FailingStore::new())).fail_open(true);

        let result = limiter.check("user:1", &[rule]).await.unwrap();
        assert!(result.allowed);
    }

    #[tokio::test]
    async fn raises_when_fail_open_disabled_and_no_fallback() {
        let rule = Rule::builder("1/10s").unwrap().build().unwrap();
        let limiter = Limiter::new(Arc::new(FailingStore::new()))
            .fail_open(false)
            .graceful_degradation(false);

        let result = limiter.check("user:1", &[rule]).await;
        assert!(matches!(result, Err(StorageError::Connection(_))));
    }

    #[tokio::test]
    async fn disabled_limiter_allows_without_touching_storage() {
        let failing = Arc::new(FailingStore::new());
        let limiter = Limiter::new(failing.clone()).enabled(false);
        let rule = Rule::builder("1/10s").unwrap().build().unwrap();

        let result = limiter.check("user:1", &[rule]).await.unwrap();

        assert!(result.allowed);
        assert!(result.violated_rule.is_none());
        assert_eq!(result.retry_after_seconds, 0);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn from_config_carries_over_flags_and_fallback() {
        use crate::config::RateLimiterConfig;

        let mut config = RateLimiterConfig::default();
        config.fail_open = false;
        config.graceful_degradation = false;
        config.in_memory_fallback = true;
        config.enabled = false;

        let limiter = Limiter::from_config(&config);

        assert!(!limiter.enabled);
        assert!(!limiter.fail_open);
        assert!(!limiter.graceful_degradation);
        assert!(limiter.fallback.is_some());
    }
}
