//! Lock-based snapshot cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{MappingCache, fetch_snapshot};
use crate::error::CacheError;
use crate::snapshot::Snapshot;
use crate::source::SnapshotSource;
use crate::state::{ReloadState, ReloadStatus};

/// A cache that swaps a shared snapshot reference on reload.
///
/// Readers clone the current `Arc<Snapshot>` under a short read lock and
/// look the key up outside of it. Reload fetches without holding that lock
/// and only takes the write lock to swap the reference, so a lookup sees
/// either the old or the new snapshot, never a mix.
///
/// # Example
///
/// ```
/// use idmapper_core::{MemorySource, Snapshot, SnapshotCache};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), idmapper_core::CacheError> {
/// let source = MemorySource::new("letters", Snapshot::from_iter([("a", "A"), ("b", "B")]));
/// let cache = SnapshotCache::new(source).await?;
///
/// assert_eq!(cache.get("a").as_deref(), Some("A"));
/// assert_eq!(cache.get("z"), None);
/// # Ok(())
/// # }
/// ```
pub struct SnapshotCache<S> {
    name: String,
    source: S,
    current: RwLock<Arc<Snapshot>>,
    /// Keeps at most one fetch in flight per instance.
    reload_gate: Mutex<()>,
    fetch_timeout: Option<Duration>,
    state: ReloadState,
}

impl<S: SnapshotSource> SnapshotCache<S> {
    /// Creates a cache and performs the initial load.
    ///
    /// # Errors
    ///
    /// Returns the source error if the initial fetch fails.
    pub async fn new(source: S) -> Result<Self, CacheError> {
        Self::build(source, None).await
    }

    /// Creates a cache whose fetches (the initial one included) are bounded
    /// by `timeout`.
    pub async fn with_fetch_timeout(source: S, timeout: Duration) -> Result<Self, CacheError> {
        Self::build(source, Some(timeout)).await
    }

    async fn build(source: S, fetch_timeout: Option<Duration>) -> Result<Self, CacheError> {
        let snapshot = fetch_snapshot(&source, fetch_timeout).await?;
        let name = source.name().to_string();

        let state = ReloadState::new();
        state.record_success(snapshot.len());

        info!(cache = %name, entries = snapshot.len(), "Cache loaded");

        Ok(Self {
            name,
            source,
            current: RwLock::new(Arc::new(snapshot)),
            reload_gate: Mutex::new(()),
            fetch_timeout,
            state,
        })
    }

    /// Looks up `key` in the current snapshot.
    pub fn get(&self, key: &str) -> Option<String> {
        let snapshot = self.snapshot();
        snapshot.get(key).map(str::to_owned)
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Fetches a fresh snapshot and swaps it in.
    ///
    /// # Errors
    ///
    /// Returns the source error; the current snapshot is left untouched.
    pub async fn reload(&self) -> Result<(), CacheError> {
        let _gate = self.reload_gate.lock().await;
        let start = Instant::now();

        match fetch_snapshot(&self.source, self.fetch_timeout).await {
            Ok(snapshot) => {
                let entries = snapshot.len();
                *self.current.write() = Arc::new(snapshot);
                self.state.record_success(entries);

                debug!(
                    cache = %self.name,
                    entries,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Cache reloaded"
                );
                Ok(())
            },
            Err(e) => {
                self.state.record_failure(e.to_string());
                debug!(cache = %self.name, error = %e, "Cache reload failed");
                Err(e.into())
            },
        }
    }

    /// Number of entries in the current snapshot.
    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    /// Returns true if the current snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    /// Returns the cache name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the reload state.
    pub fn state(&self) -> &ReloadState {
        &self.state
    }

    /// Returns the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: SnapshotSource> MappingCache for SnapshotCache<S> {
    async fn get(&self, key: &str) -> Option<String> {
        SnapshotCache::get(self, key)
    }

    async fn reload(&self) -> Result<(), CacheError> {
        SnapshotCache::reload(self).await
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> ReloadStatus {
        self.state.status(&self.name)
    }
}

impl<S> std::fmt::Debug for SnapshotCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("name", &self.name)
            .field("entries", &self.current.read().len())
            .field("generation", &self.state.generation())
            .finish()
    }
}
