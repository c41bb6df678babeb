//! Snapshot caches.
//!
//! Two interchangeable designs share the [`MappingCache`] contract:
//!
//! - [`SnapshotCache`] swaps an `Arc<Snapshot>` behind a read/write lock.
//! - [`ActorCache`] keeps the snapshot inside a single worker task that is
//!   only reachable through message passing.
//!
//! Both load once on construction, serve lookups from the current snapshot,
//! and replace the whole snapshot on a successful reload. A failed reload
//! leaves the previous snapshot in place.

mod actor;
mod locked;

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

pub use actor::ActorCache;
pub use locked::SnapshotCache;

use crate::error::{CacheError, SourceError};
use crate::snapshot::Snapshot;
use crate::source::SnapshotSource;
use crate::state::ReloadStatus;

/// Common contract of the cache designs.
#[async_trait]
pub trait MappingCache: Send + Sync {
    /// Looks up `key` in the current snapshot.
    async fn get(&self, key: &str) -> Option<String>;

    /// Fetches a fresh snapshot and installs it.
    ///
    /// # Errors
    ///
    /// The source error when the fetch fails (the current snapshot is kept),
    /// or [`CacheError::Closed`] for a cache that was shut down.
    async fn reload(&self) -> Result<(), CacheError>;

    /// Returns the cache name (the name of its source).
    fn name(&self) -> &str;

    /// Returns the reload status.
    fn status(&self) -> ReloadStatus;

    /// Releases background resources. No-op for caches that have none.
    fn shutdown(&self) {}
}

/// Runs one fetch, bounded by `timeout` when set.
pub(crate) async fn fetch_snapshot<S>(
    source: &S,
    timeout: Option<Duration>,
) -> Result<Snapshot, SourceError>
where
    S: SnapshotSource + ?Sized,
{
    debug!(source = source.name(), "Fetching snapshot");

    match timeout {
        Some(limit) => tokio::time::timeout(limit, source.fetch())
            .await
            .map_err(|_| SourceError::Timeout {
                source_name: source.name().to_string(),
                millis: limit.as_millis() as u64,
            })?,
        None => source.fetch().await,
    }
}
