//! Single-owner snapshot cache.
//!
//! One worker task owns the snapshot. Lookups and replacements are messages
//! on a channel, so reads and writes are serialized by construction and no
//! lock guards the data.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use super::{MappingCache, fetch_snapshot};
use crate::error::CacheError;
use crate::snapshot::Snapshot;
use crate::source::SnapshotSource;
use crate::state::{ReloadState, ReloadStatus};

const COMMAND_BUFFER: usize = 64;

enum Command {
    Get {
        key: String,
        reply: oneshot::Sender<Option<String>>,
    },
    Replace {
        snapshot: Snapshot,
        ack: oneshot::Sender<()>,
    },
}

/// A cache whose snapshot lives inside a dedicated worker task.
///
/// `get` sends the key and waits for the worker's answer; `reload` fetches
/// in the caller's task and hands the new snapshot to the worker. The
/// worker runs until [`ActorCache::shutdown`] is called or the cache is
/// dropped. After that, `get` returns `None` and `reload` returns
/// [`CacheError::Closed`].
pub struct ActorCache<S> {
    name: String,
    source: S,
    commands: mpsc::Sender<Command>,
    shutdown_tx: watch::Sender<bool>,
    reload_gate: Mutex<()>,
    fetch_timeout: Option<Duration>,
    state: ReloadState,
}

impl<S: SnapshotSource> ActorCache<S> {
    /// Loads the initial snapshot and spawns the worker that owns it.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the source error if the initial fetch fails; no worker is
    /// left running in that case.
    pub async fn spawn(source: S) -> Result<Self, CacheError> {
        Self::build(source, None).await
    }

    /// Like [`ActorCache::spawn`], with every fetch bounded by `timeout`.
    pub async fn with_fetch_timeout(source: S, timeout: Duration) -> Result<Self, CacheError> {
        Self::build(source, Some(timeout)).await
    }

    async fn build(source: S, fetch_timeout: Option<Duration>) -> Result<Self, CacheError> {
        let snapshot = fetch_snapshot(&source, fetch_timeout).await?;
        let name = source.name().to_string();

        let state = ReloadState::new();
        state.record_success(snapshot.len());

        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(cache = %name, entries = snapshot.len(), "Cache worker starting");
        tokio::spawn(serve(name.clone(), snapshot, receiver, shutdown_rx));

        Ok(Self {
            name,
            source,
            commands,
            shutdown_tx,
            reload_gate: Mutex::new(()),
            fetch_timeout,
            state,
        })
    }

    /// Asks the worker for the value of `key`.
    pub async fn get(&self, key: &str) -> Option<String> {
        let (reply, response) = oneshot::channel();
        let request = Command::Get {
            key: key.to_string(),
            reply,
        };

        if self.commands.send(request).await.is_err() {
            warn!(cache = %self.name, "Lookup on a closed cache");
            return None;
        }

        response.await.unwrap_or_else(|_| {
            warn!(cache = %self.name, "Cache worker stopped before answering");
            None
        })
    }

    /// Fetches a fresh snapshot and hands it to the worker.
    ///
    /// # Errors
    ///
    /// Returns the source error (the worker keeps its snapshot), or
    /// [`CacheError::Closed`] once the worker has been shut down.
    pub async fn reload(&self) -> Result<(), CacheError> {
        let _gate = self.reload_gate.lock().await;

        if self.is_closed() {
            return Err(CacheError::closed(&self.name));
        }

        let start = Instant::now();
        let snapshot = match fetch_snapshot(&self.source, self.fetch_timeout).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.state.record_failure(e.to_string());
                debug!(cache = %self.name, error = %e, "Cache reload failed");
                return Err(e.into());
            },
        };

        let entries = snapshot.len();
        let (ack, accepted) = oneshot::channel();
        self.commands
            .send(Command::Replace { snapshot, ack })
            .await
            .map_err(|_| CacheError::closed(&self.name))?;
        accepted.await.map_err(|_| CacheError::closed(&self.name))?;

        self.state.record_success(entries);
        debug!(
            cache = %self.name,
            entries,
            duration_ms = start.elapsed().as_millis() as u64,
            "Cache reloaded"
        );

        Ok(())
    }

    /// Returns the cache name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the reload state.
    pub fn state(&self) -> &ReloadState {
        &self.state
    }
}

impl<S> ActorCache<S> {
    /// Stops the worker. Calling it more than once has no further effect.
    pub fn shutdown(&self) {
        if !self.shutdown_tx.send_replace(true) {
            debug!(cache = %self.name, "Cache worker shutdown requested");
        }
    }

    /// Returns true once the worker has been told to stop or has exited.
    pub fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow() || self.commands.is_closed()
    }
}

/// Worker loop owning the current snapshot.
async fn serve(
    name: String,
    mut values: Snapshot,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;

            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            command = commands.recv() => match command {
                Some(Command::Get { key, reply }) => {
                    let _ = reply.send(values.get(&key).map(str::to_owned));
                },
                Some(Command::Replace { snapshot, ack }) => {
                    values = snapshot;
                    let _ = ack.send(());
                },
                None => break,
            },
        }
    }

    info!(cache = %name, "Cache worker stopped");
}

#[async_trait]
impl<S: SnapshotSource> MappingCache for ActorCache<S> {
    async fn get(&self, key: &str) -> Option<String> {
        ActorCache::get(self, key).await
    }

    async fn reload(&self) -> Result<(), CacheError> {
        ActorCache::reload(self).await
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> ReloadStatus {
        self.state.status(&self.name)
    }

    fn shutdown(&self) {
        ActorCache::shutdown(self)
    }
}

impl<S> Drop for ActorCache<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S> std::fmt::Debug for ActorCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorCache")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .field("generation", &self.state.generation())
            .finish()
    }
}
