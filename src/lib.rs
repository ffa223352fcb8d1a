//! # throttlecore
//!
//! The rate-limiting core of a distributed request-throttling library: four
//! counter algorithms (sliding window, fixed window, token bucket, leaky
//! bucket) evaluated atomically against a Redis-backed remote store, with
//! transparent failover to an in-process fallback when the remote store is
//! unreachable.
//!
//! ## Architecture
//!
//! - [`rule`]: the `"<N>/<period>"` limit spec parser and the immutable
//!   [`rule::Rule`] value.
//! - [`decision`]: the ternary [`decision::Decision`] returned by every
//!   storage backend and by the engine.
//! - [`store`]: the storage contract ([`store::Store`]) and its two
//!   implementations, [`store::local::LocalStore`] and
//!   [`store::remote::RemoteStore`].
//! - [`engine`]: [`engine::Limiter`], which orchestrates ordered rule
//!   evaluation and the primary→fallback→fail-open→raise failover state
//!   machine.
//! - [`config`]: the configuration record consumed by embedding
//!   applications to construct a [`engine::Limiter`].
//! - [`observability`]: the pluggable sink contract, with a no-op and a
//!   `tracing`-backed implementation.
//! - [`resolver`]: the `Resolver` contract adapters implement to turn a
//!   framework request object into an identity string.
//! - [`error`]: the `ConfigError` / `StorageError` / `RateLimitExceeded`
//!   taxonomy.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use throttlecore::config::{RemoteConfig, Topology};
//! use throttlecore::engine::Limiter;
//! use throttlecore::rule::Rule;
//! use throttlecore::store::local::LocalStore;
//! use throttlecore::store::remote::RemoteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let remote = Arc::new(RemoteStore::new(RemoteConfig {
//!     host: "127.0.0.1".to_string(),
//!     topology: Topology::Single,
//!     ..RemoteConfig::default()
//! }));
//!
//! let limiter = Limiter::new(remote).with_fallback(Arc::new(LocalStore::new()));
//!
//! let rule = Rule::parse("100/minute")?;
//! let result = limiter.check("user:42", &[rule]).await?;
//! if result.allowed {
//!     println!("admitted");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Configuration record for the engine and its remote store (§6).
pub mod config;

/// The ternary rate-limit decision (§3).
pub mod decision;

/// The limiter engine: rule evaluation and failover (C6).
pub mod engine;

/// Error taxonomy: `ConfigError`, `StorageError`, `RateLimitExceeded`.
pub mod error;

/// Observability sink contract and implementations (C7).
pub mod observability;

/// Identity resolution contract for adapters (§9).
pub mod resolver;

/// Limit rules: the textual spec parser and the `Rule` value (C1).
pub mod rule;

/// Storage contract and its local/remote implementations (C2-C5).
pub mod store;

pub use config::{RateLimiterConfig, RemoteConfig, Topology};
pub use decision::Decision;
pub use engine::{CheckResult, Limiter};
pub use error::{ConfigError, RateLimitExceeded, StorageError};
pub use observability::{NoopSink, ObservabilitySink, TracingSink};
pub use resolver::{Resolver, StaticResolver};
pub use rule::{Rule, Strategy};
pub use store::{local::LocalStore, remote::RemoteStore, Store};

/// Crate version, re-exported for diagnostics and the CLI harness.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name, re-exported for diagnostics and the CLI harness.
pub const NAME: &str = env!("CARGO_PKG_NAME");
