//! Configuration record (§6) for the engine and its remote store.

use serde::{Deserialize, Serialize};

use crate::rule::Rule;

/// Which deployment shape [`RemoteConfig`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// One primary, addressed directly.
    Single,
    /// Primary discovered through a sentinel quorum.
    Sentinel,
    /// Sharded cluster; `host`/`port` is used only as the seed node that the
    /// client discovers the rest of the topology from.
    Cluster,
}

/// Connection parameters for the remote store (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Seed host. For `Topology::Single` this is the primary; for
    /// `Topology::Cluster` it is any one cluster node.
    pub host: String,
    /// Seed port.
    pub port: u16,
    /// Logical database index. Ignored for sentinel and cluster topologies.
    pub db: u8,
    /// Password, if the server requires `AUTH`.
    pub password: Option<String>,
    /// Connect over TLS (`rediss://`) rather than plaintext.
    pub tls: bool,
    /// Deployment topology.
    pub topology: Topology,
    /// Sentinel node addresses (`host:port`), used only when `topology` is
    /// [`Topology::Sentinel`].
    pub sentinel_nodes: Vec<String>,
    /// The sentinel master name, required when `topology` is
    /// [`Topology::Sentinel`].
    pub primary_name: Option<String>,
    /// Connection pool size hint.
    pub pool_size: u32,
    /// Per-call timeout, in seconds.
    pub timeout_s: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            db: 0,
            password: None,
            tls: false,
            topology: Topology::Single,
            sentinel_nodes: Vec::new(),
            primary_name: None,
            pool_size: 10,
            timeout_s: 1,
        }
    }
}

/// Top-level configuration for a [`crate::engine::Limiter`] (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// Master switch. When `false`, [`crate::engine::Limiter::check`]
    /// short-circuits to allow every request without touching any store.
    pub enabled: bool,
    /// Remote store connection parameters.
    pub remote: RemoteConfig,
    /// On remote failure with no usable fallback, allow the request rather
    /// than raising (§4.6 `RAISE` vs. allow-through).
    pub fail_open: bool,
    /// Fall back to an in-process store when the remote store is
    /// unreachable, rather than going straight to `fail_open`/raise.
    pub graceful_degradation: bool,
    /// Whether the in-memory fallback store is constructed at all. Has no
    /// effect unless `graceful_degradation` is `true`.
    pub in_memory_fallback: bool,
    /// Whether callers should attach `X-RateLimit-*`-style headers derived
    /// from the decision. The core never generates headers itself; this
    /// only threads the flag to the application layer.
    pub emit_headers: bool,
    /// Rules evaluated for every identity, in order, before any per-request
    /// rules supplied to `check` (§4.6 "ordered conjunction").
    pub global_rules: Vec<Rule>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            remote: RemoteConfig::default(),
            fail_open: true,
            graceful_degradation: true,
            in_memory_fallback: false,
            emit_headers: true,
            global_rules: Vec::new(),
        }
    }
}
