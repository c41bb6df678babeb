//! HTTP JSON source.

use std::time::Duration;

use async_trait::async_trait;
use idmapper_core::{Snapshot, SnapshotSource, SourceError};
use tracing::debug;

use crate::record::IdName;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches a JSON array of [`IdName`] records with `GET url`.
///
/// Duplicate IDs keep the last record. Any status outside `2xx` fails the
/// fetch.
pub struct HttpSource {
    name: String,
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpSource {
    /// Creates a source for `url`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::InvalidConfig` if `url` is empty or the HTTP
    /// client cannot be built.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let name = name.into();
        let url = url.into();

        if url.trim().is_empty() {
            return Err(SourceError::invalid_config(format!(
                "empty url set for HTTP source '{}'",
                name
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                SourceError::invalid_config(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            name,
            url,
            timeout,
            client,
        })
    }

    /// Returns the configured URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_error(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout {
                source_name: self.name.clone(),
                millis: self.timeout.as_millis() as u64,
            }
        } else if err.is_connect() {
            SourceError::unavailable(&self.name, format!("failed to get url {}: {}", self.url, err))
        } else {
            SourceError::http(&self.name, format!("failed to get url {}: {}", self.url, err))
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        debug!(source = %self.name, url = %self.url, "Fetching mapping over HTTP");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::http(
                &self.name,
                format!("unexpected status {} from {}", status, self.url),
            ));
        }

        let body = response.bytes().await.map_err(|e| self.request_error(e))?;

        let records: Vec<IdName> = serde_json::from_slice(&body).map_err(|e| {
            SourceError::decode(
                &self.name,
                format!("failed to decode json from url {}: {}", self.url, e),
            )
        })?;

        Ok(records.into_iter().map(<(String, String)>::from).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSource")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
