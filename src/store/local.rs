//! The in-process fallback store (C3): sliding-window only, used when the
//! remote store is unreachable and `graceful_degradation` is enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::decision::Decision;
use crate::error::StorageError;
use crate::rule::Strategy;

use super::Store;

/// Process-local sliding-window counter, keyed by composite key.
///
/// Per §4.3, every strategy served from the fallback is approximated by the
/// sliding-window algorithm with the rule's own `(requests, window)` — the
/// fallback does not attempt to reproduce token/leaky/fixed-window semantics,
/// since exact cross-host fairness is already lost the moment a caller falls
/// back to a single process.
///
/// Each key gets its own entry in a [`DashMap`], which internally shards
/// across a fixed number of locks; this gives fine-grained per-key
/// concurrency without a single mutex serializing unrelated keys, the
/// optimization called out as acceptable in the design notes.
pub struct LocalStore {
    counters: DashMap<String, Vec<f64>>,
    closed: AtomicBool,
}

impl LocalStore {
    /// Create an empty local store.
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn now_secs() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the epoch")
            .as_secs_f64()
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn check_and_increment(
        &self,
        key: &str,
        limit: u32,
        window_seconds: u32,
        _strategy: Strategy,
        _capacity: u32,
        increment: u32,
    ) -> Result<Decision, StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }

        let now = Self::now_secs();
        let window = window_seconds as f64;

        let mut entry = self.counters.entry(key.to_string()).or_default();
        entry.retain(|&t| t > now - window);

        let current_len = entry.len() as u32;
        if current_len + increment <= limit {
            for _ in 0..increment {
                entry.push(now);
            }
            let remaining = limit - (current_len + increment);
            Ok(Decision::allow(remaining))
        } else {
            let oldest = entry.first().copied().unwrap_or(now);
            let retry_after = ((oldest + window - now).ceil().max(0.0)) as u32;
            Ok(Decision::deny(retry_after))
        }
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::Release);
        self.counters.clear();
        Ok(())
    }
}
