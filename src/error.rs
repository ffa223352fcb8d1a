//! Error taxonomy for the rate limiting core.
//!
//! Mirrors the teacher crate's convention of one `thiserror`-derived enum per
//! failure domain rather than a single catch-all error type.

use thiserror::Error;

/// Raised at construction time for malformed configuration: an unparseable
/// limit spec, or a strategy/capacity combination that cannot be satisfied.
///
/// Never raised from [`crate::engine::Limiter::check`] — configuration is
/// validated up front.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The `"<N>/<period>"` spec string did not match any supported shape.
    #[error("invalid limit spec `{0}`: expected `<N>/<period>`, e.g. `100/minute` or `10/30s`")]
    InvalidLimitSpec(String),

    /// `N` in `"<N>/<period>"` was zero or failed to parse as a positive integer.
    #[error("invalid request count in limit spec `{0}`")]
    InvalidRequestCount(String),

    /// The unit portion of the period did not resolve to a known multiplier.
    #[error("unknown time unit `{0}` in limit spec")]
    UnknownUnit(String),

    /// A rule was constructed with a zero window or zero request count.
    #[error("rule fields must be non-zero: requests={requests}, window_seconds={window_seconds}")]
    ZeroField {
        /// Configured request count.
        requests: u32,
        /// Configured window, in seconds.
        window_seconds: u32,
    },
}

/// Raised by a [`crate::store::Store`] implementation on transport,
/// encoding, or server-side script failure.
///
/// Handled internally by the engine's failover state machine (see
/// `engine.rs`); surfaced to callers of `check` only when `fail_open` is
/// false and no fallback store is available or it also failed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The connection to the remote store could not be established or was lost.
    #[error("remote store connection error: {0}")]
    Connection(String),

    /// A script invocation failed on the server side (includes `NOSCRIPT`
    /// retries that themselves failed, and Lua runtime errors).
    #[error("remote store script error: {0}")]
    Script(String),

    /// The requested strategy is not implemented by this store.
    #[error("unsupported strategy `{0}` for this store")]
    UnsupportedStrategy(&'static str),

    /// The store was closed via [`crate::store::Store::close`] and can no
    /// longer be used.
    #[error("store is closed")]
    Closed,
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() {
            StorageError::Connection(err.to_string())
        } else {
            StorageError::Script(err.to_string())
        }
    }
}

/// Carrier type for a rate limit violation. The engine's decision tuple is
/// always authoritative (§4.6/§7 of the design); this exists for callers who
/// prefer the `?`-propagation idiom over matching on the tuple.
#[derive(Debug, Error)]
#[error("rate limit exceeded for rule `{limit_text}`: retry after {retry_after_secs}s")]
pub struct RateLimitExceeded {
    /// Original limit text of the violated rule, e.g. `"10/second"`.
    pub limit_text: String,
    /// Seconds the caller should wait before retrying.
    pub retry_after_secs: u32,
}
