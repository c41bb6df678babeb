//! Local file source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use idmapper_core::{Snapshot, SnapshotSource, SourceError};
use serde::Deserialize;
use tracing::debug;

use crate::record::IdName;

/// Formats understood by [`FileSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// JSON (.json)
    Json,
    /// YAML (.yml, .yaml)
    Yaml,
}

impl FileFormat {
    /// Detects the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(Self::Json),
                "yml" | "yaml" => Some(Self::Yaml),
                _ => None,
            })
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "JSON"),
            Self::Yaml => write!(f, "YAML"),
        }
    }
}

/// Either shape a mapping file may take.
#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Map(HashMap<String, String>),
    Records(Vec<IdName>),
}

impl From<Document> for Snapshot {
    fn from(doc: Document) -> Self {
        match doc {
            Document::Map(values) => Snapshot::from(values),
            Document::Records(records) => records.into_iter().map(<(String, String)>::from).collect(),
        }
    }
}

/// Reads the whole mapping from a local JSON or YAML file on every fetch.
///
/// The document is either an object of `id: name` pairs or a list of
/// `{id, name}` records.
#[derive(Debug)]
pub struct FileSource {
    name: String,
    path: PathBuf,
    format: FileFormat,
}

impl FileSource {
    /// Creates a source for `path`. The file itself is read on fetch.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::InvalidConfig` if the extension is not one of
    /// `.json`, `.yml` or `.yaml`.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let path = path.into();
        let format = FileFormat::from_path(&path).ok_or_else(|| {
            SourceError::invalid_config(format!(
                "unsupported mapping file '{}': expected .json, .yml or .yaml",
                path.display()
            ))
        })?;

        Ok(Self {
            name: name.into(),
            path,
            format,
        })
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the detected format.
    pub fn format(&self) -> FileFormat {
        self.format
    }

    fn parse(&self, content: &[u8]) -> Result<Snapshot, SourceError> {
        let doc: Document = match self.format {
            FileFormat::Json => serde_json::from_slice(content).map_err(|e| e.to_string()),
            FileFormat::Yaml => serde_yaml::from_slice(content).map_err(|e| e.to_string()),
        }
        .map_err(|reason| {
            SourceError::decode(
                &self.name,
                format!("invalid {} in {}: {}", self.format, self.path.display(), reason),
            )
        })?;

        Ok(doc.into())
    }
}

#[async_trait]
impl SnapshotSource for FileSource {
    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        debug!(source = %self.name, path = %self.path.display(), "Reading mapping file");

        let content = tokio::fs::read(&self.path).await?;
        self.parse(&content)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
