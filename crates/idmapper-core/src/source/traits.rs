//! Snapshot source trait definition.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::snapshot::Snapshot;

/// A source of complete snapshots.
///
/// This trait abstracts over the backends that populate a cache (HTTP
/// endpoints, relational databases, files, ...). The cache treats it as
/// opaque: every call returns either the full mapping or an error.
///
/// A cache never runs two fetches concurrently on the same instance. A
/// source shared between several caches must handle concurrent calls itself.
///
/// # Example
///
/// ```no_run
/// use async_trait::async_trait;
/// use idmapper_core::{Snapshot, SnapshotSource, SourceError};
///
/// struct Countries;
///
/// #[async_trait]
/// impl SnapshotSource for Countries {
///     async fn fetch(&self) -> Result<Snapshot, SourceError> {
///         Ok([("sk", "Slovakia")].into_iter().collect())
///     }
///
///     fn name(&self) -> &str {
///         "countries"
///     }
/// }
/// ```
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetches a complete snapshot.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`] describing why the data could not be read. The
    /// caller keeps its previous snapshot.
    async fn fetch(&self) -> Result<Snapshot, SourceError>;

    /// Returns the name of this source.
    ///
    /// This is used for logging and identification purposes.
    fn name(&self) -> &str;
}

#[async_trait]
impl<S: SnapshotSource + ?Sized> SnapshotSource for Arc<S> {
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        (**self).fetch().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<S: SnapshotSource + ?Sized> SnapshotSource for Box<S> {
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        (**self).fetch().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
