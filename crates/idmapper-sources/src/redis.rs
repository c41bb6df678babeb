//! Redis hash source.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::{self, ErrorKind, IntoConnectionInfo, RedisError};
use deadpool_redis::{Config, Pool, PoolConfig, PoolError, Runtime, Timeouts};
use idmapper_core::{Snapshot, SnapshotSource, SourceError};
use tracing::debug;

const POOL_SIZE: usize = 2;

/// Reads a whole Redis hash with `HGETALL`: fields are IDs, values are names.
///
/// Like [`PgSource`](crate::PgSource), connections are opened lazily on the
/// first fetch.
pub struct RedisSource {
    name: String,
    hash: String,
    pool: Pool,
}

impl RedisSource {
    /// Creates a source for `hash` on the server at `addr` (`host:port` or a
    /// `redis://` URL).
    ///
    /// # Errors
    ///
    /// Returns `SourceError::InvalidConfig` if `addr` or `hash` is empty or
    /// the address cannot be parsed.
    pub fn new(
        name: impl Into<String>,
        addr: &str,
        password: Option<&str>,
        hash: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, SourceError> {
        let name = name.into();
        let hash = hash.into();

        if addr.trim().is_empty() {
            return Err(SourceError::invalid_config(format!(
                "missing address for Redis source '{}'",
                name
            )));
        }
        if hash.is_empty() {
            return Err(SourceError::invalid_config(format!(
                "missing hash name for Redis source '{}'",
                name
            )));
        }

        let url = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("redis://{}", addr)
        };
        let mut info = url.as_str().into_connection_info().map_err(|e| {
            SourceError::invalid_config(format!("invalid Redis address '{}': {}", addr, e))
        })?;
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            info.redis.password = Some(password.to_string());
        }

        let mut cfg = Config::from_connection_info(info);
        let mut pool_config = PoolConfig::new(POOL_SIZE);
        if let Some(timeout) = timeout {
            let mut timeouts = Timeouts::default();
            timeouts.wait = Some(timeout);
            timeouts.create = Some(timeout);
            timeouts.recycle = Some(timeout);
            pool_config.timeouts = timeouts;
        }
        cfg.pool = Some(pool_config);

        let pool = cfg.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            SourceError::invalid_config(format!("failed to create pool for '{}': {}", name, e))
        })?;

        Ok(Self { name, hash, pool })
    }

    /// Returns the hash read on every fetch.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    fn command_error(&self, err: RedisError) -> SourceError {
        if err.kind() == ErrorKind::TypeError {
            SourceError::decode(&self.name, format!("invalid hash {}: {}", self.hash, err))
        } else if err.is_io_error() || err.is_connection_refusal() || err.is_timeout() {
            SourceError::unavailable(&self.name, err.to_string())
        } else {
            SourceError::database(
                &self.name,
                format!("failed to HGETALL hash {}: {}", self.hash, err),
            )
        }
    }

    fn pool_error(&self, err: PoolError) -> SourceError {
        SourceError::unavailable(&self.name, format!("failed to get connection: {}", err))
    }
}

#[async_trait]
impl SnapshotSource for RedisSource {
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        debug!(source = %self.name, hash = %self.hash, "Fetching mapping from Redis");

        let mut conn = self.pool.get().await.map_err(|e| self.pool_error(e))?;

        let values: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(&self.hash)
            .query_async(&mut conn)
            .await
            .map_err(|e| self.command_error(e))?;

        Ok(Snapshot::from(values))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for RedisSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSource")
            .field("name", &self.name)
            .field("hash", &self.hash)
            .field("pool_size", &self.pool.status().size)
            .finish()
    }
}
