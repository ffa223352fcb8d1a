//! The ternary rate-limit decision returned by every storage backend and by
//! the engine itself (§3 "Decision").

/// Outcome of a single `check_and_increment` or `Limiter::check` call.
///
/// Invariant: when `allowed` is `true`, `retry_after_seconds` is always `0`;
/// when `false`, `remaining` is always `0`. Construct via [`Decision::allow`]
/// or [`Decision::deny`] rather than the struct literal to keep that
/// invariant in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request is admitted.
    pub allowed: bool,
    /// Remaining budget after this call, `0` when denied.
    pub remaining: u32,
    /// Seconds the caller should wait before retrying, `0` when allowed.
    pub retry_after_seconds: u32,
}

impl Decision {
    /// Build an allowed decision with the given remaining budget.
    pub fn allow(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining,
            retry_after_seconds: 0,
        }
    }

    /// Build a denied decision with the given retry hint.
    pub fn deny(retry_after_seconds: u32) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            retry_after_seconds,
        }
    }
}
