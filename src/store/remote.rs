//! The Redis-backed remote store (C4): the primary counter backend, reached
//! over one of three deployment topologies (§4.4).

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;
use tokio::sync::OnceCell;

use crate::config::{RemoteConfig, Topology};
use crate::decision::Decision;
use crate::error::StorageError;
use crate::rule::Strategy;

use super::scripts;
use super::Store;

/// A lazily-established connection to the remote counter server.
///
/// Resolved once per [`RemoteStore`] (§5 "Opening the remote connection
/// (once, lazy)") and reused for every subsequent call; `ConnectionManager`
/// and the cluster-async connection both transparently reconnect on
/// transport failure, so we never tear this down ourselves except on
/// [`Store::close`].
#[derive(Clone)]
enum RemoteConnection {
    /// Single primary, or a sentinel-resolved primary — both addressed
    /// through `ConnectionManager`, which handles reconnection identically
    /// either way once the initial master has been resolved.
    Direct(ConnectionManager),
    /// Sharded cluster; each composite key routes to exactly one shard
    /// (§4.4), which is all the atomicity guarantee requires.
    Cluster(redis::cluster_async::ClusterConnection),
}

/// Remote, Redis-backed implementation of the storage contract.
///
/// Holds configuration and a lazily-initialized connection; does not retry
/// failed script invocations itself (§4.4 "Retry policy") — every transport
/// or script failure surfaces as [`StorageError`] for the engine's failover
/// state machine to handle.
pub struct RemoteStore {
    config: RemoteConfig,
    connection: OnceCell<RemoteConnection>,
    closed: std::sync::atomic::AtomicBool,
}

impl RemoteStore {
    /// Create a remote store for the given configuration. No network I/O
    /// happens until the first [`Store::check_and_increment`] call.
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            connection: OnceCell::new(),
            closed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn build_url(&self) -> String {
        let scheme = if self.config.tls { "rediss" } else { "redis" };
        match &self.config.password {
            Some(password) => format!(
                "{scheme}://:{password}@{host}:{port}/{db}",
                scheme = scheme,
                password = password,
                host = self.config.host,
                port = self.config.port,
                db = self.config.db,
            ),
            None => format!(
                "{scheme}://{host}:{port}/{db}",
                scheme = scheme,
                host = self.config.host,
                port = self.config.port,
                db = self.config.db,
            ),
        }
    }

    async fn connect(&self) -> Result<RemoteConnection, StorageError> {
        let mut connection = match self.config.topology {
            Topology::Single => {
                let client = redis::Client::open(self.build_url())?;
                let manager = ConnectionManager::new(client).await?;
                RemoteConnection::Direct(manager)
            }
            Topology::Sentinel => {
                let primary_name = self.config.primary_name.as_deref().ok_or_else(|| {
                    StorageError::Connection(
                        "sentinel topology requires `primary_name`".to_string(),
                    )
                })?;
                let mut sentinel = redis::sentinel::SentinelClient::build(
                    self.config.sentinel_nodes.clone(),
                    primary_name.to_string(),
                    None,
                    redis::sentinel::SentinelServerType::Master,
                )
                .map_err(StorageError::from)?;
                let client = sentinel
                    .async_get_client()
                    .await
                    .map_err(StorageError::from)?;
                let manager = ConnectionManager::new(client).await?;
                RemoteConnection::Direct(manager)
            }
            Topology::Cluster => {
                let client = redis::cluster::ClusterClient::new(vec![self.build_url()])
                    .map_err(StorageError::from)?;
                let conn = client
                    .get_async_connection()
                    .await
                    .map_err(StorageError::from)?;
                RemoteConnection::Cluster(conn)
            }
        };

        Self::register_scripts(&mut connection).await?;
        Ok(connection)
    }

    /// Load all four scripts (§4.5) by `SCRIPT LOAD` once, at connection
    /// time, so the first `check_and_increment` per strategy does not pay an
    /// extra `NOSCRIPT`→`EVAL` round trip (§4.4 "registered and cached by
    /// content hash... at connection time").
    async fn register_scripts(connection: &mut RemoteConnection) -> Result<(), StorageError> {
        match connection {
            RemoteConnection::Direct(manager) => {
                scripts::SLIDING_WINDOW.load_async(manager).await?;
                scripts::FIXED_WINDOW.load_async(manager).await?;
                scripts::TOKEN_BUCKET.load_async(manager).await?;
                scripts::LEAKY_BUCKET.load_async(manager).await?;
            }
            RemoteConnection::Cluster(conn) => {
                scripts::SLIDING_WINDOW.load_async(conn).await?;
                scripts::FIXED_WINDOW.load_async(conn).await?;
                scripts::TOKEN_BUCKET.load_async(conn).await?;
                scripts::LEAKY_BUCKET.load_async(conn).await?;
            }
        }
        Ok(())
    }

    async fn connection(&self) -> Result<RemoteConnection, StorageError> {
        if self.closed.load(std::sync::atomic::Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        self.connection
            .get_or_try_init(|| self.connect())
            .await
            .cloned()
    }

    async fn eval(
        &self,
        script: &Script,
        key: &str,
        args: &[String],
    ) -> Result<(i64, i64, i64), StorageError> {
        let mut invocation = script.key(key);
        for arg in args {
            invocation = invocation.arg(arg);
        }

        match self.connection().await? {
            RemoteConnection::Direct(mut manager) => invocation
                .invoke_async(&mut manager)
                .await
                .map_err(StorageError::from),
            RemoteConnection::Cluster(mut conn) => invocation
                .invoke_async(&mut conn)
                .await
                .map_err(StorageError::from),
        }
    }

    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the epoch")
            .as_millis() as i64
    }

    fn now_s() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the epoch")
            .as_secs() as i64
    }
}

#[async_trait]
impl Store for RemoteStore {
    async fn check_and_increment(
        &self,
        key: &str,
        limit: u32,
        window_seconds: u32,
        strategy: Strategy,
        capacity: u32,
        increment: u32,
    ) -> Result<Decision, StorageError> {
        let (allowed, remaining, retry_after) = match strategy {
            Strategy::SlidingWindow => {
                let now_ms = Self::now_ms();
                let window_ms = window_seconds as i64 * 1000;
                self.eval(
                    &scripts::SLIDING_WINDOW,
                    key,
                    &[
                        now_ms.to_string(),
                        window_ms.to_string(),
                        limit.to_string(),
                        increment.to_string(),
                    ],
                )
                .await?
            }
            Strategy::FixedWindow => {
                self.eval(
                    &scripts::FIXED_WINDOW,
                    key,
                    &[
                        window_seconds.to_string(),
                        limit.to_string(),
                        increment.to_string(),
                    ],
                )
                .await?
            }
            Strategy::TokenBucket => {
                let fill_rate = limit as f64 / window_seconds as f64;
                self.eval(
                    &scripts::TOKEN_BUCKET,
                    key,
                    &[
                        Self::now_s().to_string(),
                        fill_rate.to_string(),
                        capacity.to_string(),
                        increment.to_string(),
                    ],
                )
                .await?
            }
            Strategy::LeakyBucket => {
                let leak_rate = limit as f64 / window_seconds as f64;
                self.eval(
                    &scripts::LEAKY_BUCKET,
                    key,
                    &[
                        Self::now_s().to_string(),
                        leak_rate.to_string(),
                        capacity.to_string(),
                        increment.to_string(),
                    ],
                )
                .await?
            }
        };

        if allowed == 1 {
            Ok(Decision::allow(remaining.max(0) as u32))
        } else {
            Ok(Decision::deny(retry_after.max(0) as u32))
        }
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }
}
