//! Error types for data sources and caches.

/// Errors that can occur while fetching a snapshot from a data source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source could not be reached.
    #[error("source '{source_name}' unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    /// An HTTP request failed or returned an unexpected status.
    #[error("http error from '{source_name}': {reason}")]
    Http { source_name: String, reason: String },

    /// A database query failed.
    #[error("database error from '{source_name}': {reason}")]
    Database { source_name: String, reason: String },

    /// The fetched payload could not be decoded into a snapshot.
    #[error("failed to decode data from '{source_name}': {reason}")]
    Decode { source_name: String, reason: String },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The fetch did not complete in time.
    #[error("fetch from '{source_name}' timed out after {millis}ms")]
    Timeout { source_name: String, millis: u64 },

    /// The source is misconfigured.
    #[error("invalid source configuration: {0}")]
    InvalidConfig(String),
}

impl SourceError {
    /// Creates a new unavailable error.
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new HTTP error.
    pub fn http(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Http {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new database error.
    pub fn database(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Database {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new decode error.
    pub fn decode(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Returns true if this is a transient error that might succeed on the next reload.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::Http { .. } | Self::Database { .. }
        )
    }
}

/// Errors returned by cache construction and reload.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The data source failed; the previous snapshot (if any) is kept.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The cache worker has been shut down.
    #[error("cache '{cache}' is closed")]
    Closed { cache: String },
}

impl CacheError {
    /// Creates a new closed error.
    pub fn closed(cache: impl Into<String>) -> Self {
        Self::Closed {
            cache: cache.into(),
        }
    }
}
