//! In-process source with replaceable content.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::SnapshotSource;
use crate::error::SourceError;
use crate::snapshot::Snapshot;

/// A source backed by an in-memory snapshot.
///
/// The content can be replaced at any time and the source can be told to
/// fail, which makes it handy for tests and for statically configured
/// mappers.
#[derive(Debug)]
pub struct MemorySource {
    name: String,
    snapshot: Mutex<Snapshot>,
    failure: Mutex<Option<String>>,
    fetches: AtomicUsize,
}

impl MemorySource {
    /// Creates a source that returns `snapshot` on every fetch.
    pub fn new(name: impl Into<String>, snapshot: impl Into<Snapshot>) -> Self {
        Self {
            name: name.into(),
            snapshot: Mutex::new(snapshot.into()),
            failure: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Replaces the snapshot returned by subsequent fetches.
    pub fn set(&self, snapshot: impl Into<Snapshot>) {
        *self.snapshot.lock() = snapshot.into();
    }

    /// Makes every subsequent fetch fail with `reason` until [`Self::recover`].
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock() = Some(reason.into());
    }

    /// Clears a failure set by [`Self::fail_with`].
    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Returns how many times `fetch` has been called.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for MemorySource {
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let failure = self.failure.lock().clone();
        if let Some(reason) = failure {
            return Err(SourceError::unavailable(&self.name, reason));
        }

        Ok(self.snapshot.lock().clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
