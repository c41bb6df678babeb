//! # idmapper core
//!
//! Periodically refreshed, in-memory ID to name mappings.
//!
//! A cache loads a complete [`Snapshot`] from a [`SnapshotSource`] when it is
//! created and replaces it wholesale on every successful reload. Lookups are
//! served from the current snapshot and stay available while a reload is
//! running; a failed reload keeps serving the previous data.
//!
//! ## Example
//!
//! ```
//! use idmapper_core::{MemorySource, Snapshot, SnapshotCache};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), idmapper_core::CacheError> {
//! let source = std::sync::Arc::new(MemorySource::new(
//!     "countries",
//!     Snapshot::from_iter([("sk", "Slovakia"), ("us", "USA")]),
//! ));
//! let cache = SnapshotCache::new(source.clone()).await?;
//! assert_eq!(cache.get("sk").as_deref(), Some("Slovakia"));
//!
//! source.set(Snapshot::from_iter([("sk", "Slovak Republic")]));
//! cache.reload().await?;
//! assert_eq!(cache.get("sk").as_deref(), Some("Slovak Republic"));
//! assert_eq!(cache.get("us"), None);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod snapshot;
pub mod source;
pub mod state;

// Re-exports
pub use cache::{ActorCache, MappingCache, SnapshotCache};
pub use error::{CacheError, SourceError};
pub use snapshot::Snapshot;
pub use source::{FnSource, MemorySource, SnapshotSource};
pub use state::{ReloadState, ReloadStatus};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
