//! Storage contract (C2) and its two implementations: the in-process
//! [`local::LocalStore`] and the Redis-backed [`remote::RemoteStore`].

pub mod local;
pub mod remote;
mod scripts;

use async_trait::async_trait;

use crate::decision::Decision;
use crate::error::StorageError;
use crate::rule::Strategy;

/// The one operation every counter backend must provide: atomically check
/// and, if admitted, increment the counter addressed by `key` (§4.2).
///
/// Implementations must be linearizable per key: from any other caller's
/// perspective the call is either entirely observed or entirely not.
#[async_trait]
pub trait Store: Send + Sync {
    /// Atomically evaluate and (if allowed) consume `increment` units of
    /// budget against `key` under `strategy`.
    ///
    /// `capacity` is only meaningful for [`Strategy::TokenBucket`] and
    /// [`Strategy::LeakyBucket`]; other strategies ignore it.
    async fn check_and_increment(
        &self,
        key: &str,
        limit: u32,
        window_seconds: u32,
        strategy: Strategy,
        capacity: u32,
        increment: u32,
    ) -> Result<Decision, StorageError>;

    /// Drain any pooled connections / clear in-process state. Subsequent
    /// calls to [`Store::check_and_increment`] must fail with
    /// [`StorageError::Closed`].
    async fn close(&self) -> Result<(), StorageError>;
}
