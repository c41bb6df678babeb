//! Reload state tracking.

use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

#[derive(Debug, Default)]
struct Inner {
    generation: u64,
    entries: usize,
    last_reload: Option<Instant>,
    last_error: Option<String>,
    failure_count: u32,
}

/// Tracks the outcome of a cache's reloads.
///
/// Every cache owns one of these; the scheduled reload jobs and the health
/// endpoint read it.
#[derive(Debug, Default)]
pub struct ReloadState {
    inner: RwLock<Inner>,
}

impl ReloadState {
    /// Creates a new, uninitialized state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful load of `entries` values.
    pub fn record_success(&self, entries: usize) {
        let mut inner = self.inner.write();
        inner.generation += 1;
        inner.entries = entries;
        inner.last_reload = Some(Instant::now());
        inner.last_error = None;
        inner.failure_count = 0;
    }

    /// Records a failed reload. The previous snapshot stays in place.
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.last_error = Some(error.into());
        inner.failure_count += 1;
    }

    /// Number of successful loads, the initial one included.
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Number of entries in the current snapshot.
    pub fn entries(&self) -> usize {
        self.inner.read().entries
    }

    /// Returns the time of the last successful load.
    pub fn last_reload(&self) -> Option<Instant> {
        self.inner.read().last_reload
    }

    /// Returns the duration since the last successful load.
    pub fn time_since_reload(&self) -> Option<Duration> {
        self.inner.read().last_reload.map(|t| t.elapsed())
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.inner.read().last_error.clone()
    }

    /// Returns the number of consecutive failures.
    pub fn failure_count(&self) -> u32 {
        self.inner.read().failure_count
    }

    /// Returns true once at least one load succeeded.
    pub fn is_initialized(&self) -> bool {
        self.inner.read().generation > 0
    }

    /// Returns true if initialized and the last reload succeeded.
    pub fn is_healthy(&self) -> bool {
        let inner = self.inner.read();
        inner.generation > 0 && inner.last_error.is_none()
    }

    /// Captures the current state under `name`.
    pub fn status(&self, name: &str) -> ReloadStatus {
        let age = self.time_since_reload();
        let inner = self.inner.read();
        ReloadStatus {
            name: name.to_string(),
            entries: inner.entries,
            generation: inner.generation,
            last_reload_age_secs: age.map(|age| age.as_secs()),
            failure_count: inner.failure_count,
            last_error: inner.last_error.clone(),
            healthy: inner.generation > 0 && inner.last_error.is_none(),
        }
    }
}

/// Point-in-time view of a [`ReloadState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadStatus {
    pub name: String,
    pub entries: usize,
    pub generation: u64,
    pub last_reload_age_secs: Option<u64>,
    pub failure_count: u32,
    pub last_error: Option<String>,
    pub healthy: bool,
}
