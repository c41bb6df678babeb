//! Closure-backed source.

use std::future::Future;

use async_trait::async_trait;

use super::SnapshotSource;
use crate::error::SourceError;
use crate::snapshot::Snapshot;

/// Adapter that turns an async closure into a [`SnapshotSource`].
///
/// ```
/// use idmapper_core::{FnSource, Snapshot, SourceError};
///
/// let source = FnSource::new("static", || async {
///     Ok::<_, SourceError>([("en", "English")].into_iter().collect::<Snapshot>())
/// });
/// ```
pub struct FnSource<F> {
    name: String,
    func: F,
}

impl<F> FnSource<F> {
    /// Creates a new closure-backed source.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> SnapshotSource for FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Snapshot, SourceError>> + Send,
{
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        (self.func)().await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> std::fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSource").field("name", &self.name).finish()
    }
}
