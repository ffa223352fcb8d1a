//! Observability sink (C7): side-effect-free from the engine's perspective,
//! pluggable by the embedding application (§4.7).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::decision::Decision;
use crate::rule::Rule;

/// Receives notifications of engine activity. Implementations must not
/// block or panic — they run inline on the request path.
pub trait ObservabilitySink: Send + Sync {
    /// Called once per `check` call that resulted in an allowed decision.
    fn log_allowed(&self, identity: &str, rule: &Rule, decision: &Decision) {
        let _ = (identity, rule, decision);
    }

    /// Called once per `check` call that resulted in a denial.
    fn log_violation(&self, identity: &str, rule: &Rule, decision: &Decision) {
        let _ = (identity, rule, decision);
    }

    /// Called with the wall-clock time spent in the primary store call,
    /// regardless of outcome (§4.6 "latency timing around only the primary
    /// call").
    fn observe_latency(&self, rule: &Rule, elapsed: Duration) {
        let _ = (rule, elapsed);
    }
}

/// Default sink: discards every notification. Used when the embedding
/// application has not configured one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ObservabilitySink for NoopSink {}

/// Sink that emits structured [`tracing`] events and keeps a running count
/// of each event kind, queryable via [`TracingSink::allowed_count`],
/// [`TracingSink::violation_count`], and [`TracingSink::latency_sample_count`].
///
/// Allowed requests log at `debug`, violations at `info`, and latency
/// samples at `warn` — mirroring the level split the teacher crate uses
/// between routine traffic and capacity pressure (routine admits stay quiet,
/// pressure signals rise in severity).
#[derive(Debug, Default)]
pub struct TracingSink {
    allowed: AtomicU64,
    violations: AtomicU64,
    latency_samples: AtomicU64,
}

impl TracingSink {
    /// Create a sink with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `log_allowed` calls observed so far.
    pub fn allowed_count(&self) -> u64 {
        self.allowed.load(Ordering::Acquire)
    }

    /// Number of `log_violation` calls observed so far.
    pub fn violation_count(&self) -> u64 {
        self.violations.load(Ordering::Acquire)
    }

    /// Number of `observe_latency` calls observed so far.
    pub fn latency_sample_count(&self) -> u64 {
        self.latency_samples.load(Ordering::Acquire)
    }
}

impl ObservabilitySink for TracingSink {
    fn log_allowed(&self, identity: &str, rule: &Rule, decision: &Decision) {
        self.allowed.fetch_add(1, Ordering::Release);
        tracing::debug!(
            identity,
            strategy = ?rule.strategy,
            limit = %rule.limit_text,
            remaining = decision.remaining,
            "request allowed"
        );
    }

    fn log_violation(&self, identity: &str, rule: &Rule, decision: &Decision) {
        self.violations.fetch_add(1, Ordering::Release);
        tracing::info!(
            identity,
            strategy = ?rule.strategy,
            limit = %rule.limit_text,
            retry_after = decision.retry_after_seconds,
            "rate limit exceeded"
        );
    }

    fn observe_latency(&self, rule: &Rule, elapsed: Duration) {
        self.latency_samples.fetch_add(1, Ordering::Release);
        tracing::warn!(
            limit = %rule.limit_text,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "store round-trip"
        );
    }
}
