//! Service configuration.
//!
//! Layered in this order, later layers winning:
//! 1. built-in defaults
//! 2. an optional config file (TOML, YAML or JSON, by extension)
//! 3. `IDMAPPER__*` environment variables (`IDMAPPER__LOGGER__LEVEL=debug`)

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

const ENV_PREFIX: &str = "IDMAPPER";
const ENV_SEPARATOR: &str = "__";

/// One day.
const DEFAULT_INTERVAL_SECS: u64 = 86_400;
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_REDIS_ADDR: &str = "localhost:6379";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Listen address.
    pub addr: String,
    /// Prefix of the mapping routes.
    pub api_prefix: String,
    pub logger: LoggerSettings,
    #[serde(default)]
    pub mappers: Vec<MapperSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Emit JSON lines instead of plain text.
    pub json: bool,
    /// Default filter, overridden by `RUST_LOG`.
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperSettings {
    pub name: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound for a whole fetch, initial load included.
    #[serde(default)]
    pub fetch_timeout_ms: Option<u64>,
    #[serde(default)]
    pub cache: CacheKind,
    pub source: SourceSettings,
}

impl MapperSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

/// Which cache design backs a mapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    #[default]
    Locked,
    Actor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceSettings {
    Http {
        url: String,
        #[serde(default = "default_http_timeout_ms")]
        timeout_ms: u64,
    },
    Pgsql {
        connection_string: String,
        /// Defaults to `select id, name from <table>`.
        #[serde(default)]
        query: Option<String>,
        /// Defaults to the mapper name.
        #[serde(default)]
        table: Option<String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    Redis {
        #[serde(default = "default_redis_addr")]
        addr: String,
        #[serde(default)]
        password: Option<String>,
        /// Defaults to the mapper name.
        #[serde(default)]
        hash: Option<String>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    File {
        path: PathBuf,
    },
    Static {
        #[serde(default)]
        values: HashMap<String, String>,
    },
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_redis_addr() -> String {
    DEFAULT_REDIS_ADDR.to_string()
}

fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

impl Settings {
    /// Loads and validates the settings.
    ///
    /// A missing `path` means defaults plus environment only; a given path
    /// must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Self::defaults()?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Self::environment());

        Self::finish(builder)
    }

    /// Loads settings from an in-memory document, without environment.
    pub fn from_str(content: &str, format: FileFormat) -> Result<Self, SettingsError> {
        let builder = Self::defaults()?.add_source(File::from_str(content, format));
        Self::finish(builder)
    }

    /// Like [`Settings::from_str`] with `env` standing in for the process
    /// environment.
    pub fn from_str_with_env(
        content: &str,
        format: FileFormat,
        env: HashMap<String, String>,
    ) -> Result<Self, SettingsError> {
        let builder = Self::defaults()?
            .add_source(File::from_str(content, format))
            .add_source(Self::environment().source(Some(env)));
        Self::finish(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, SettingsError> {
        Ok(Config::builder()
            .set_default("addr", "0.0.0.0:8080")?
            .set_default("api_prefix", "/v1")?
            .set_default("logger.json", false)?
            .set_default("logger.level", "info")?)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.socket_addr()?;

        if !self.api_prefix.starts_with('/') {
            return Err(SettingsError::Invalid(format!(
                "api_prefix '{}' must start with '/'",
                self.api_prefix
            )));
        }

        let mut names = HashSet::new();
        for mapper in &self.mappers {
            if mapper.name.is_empty() || mapper.name.contains('/') {
                return Err(SettingsError::Invalid(format!(
                    "invalid mapper name '{}'",
                    mapper.name
                )));
            }
            if !names.insert(mapper.name.as_str()) {
                return Err(SettingsError::Invalid(format!(
                    "duplicate mapper '{}'",
                    mapper.name
                )));
            }
            if mapper.interval_secs == 0 {
                return Err(SettingsError::Invalid(format!(
                    "mapper '{}': interval_secs must be greater than zero",
                    mapper.name
                )));
            }
            if mapper.fetch_timeout_ms == Some(0) {
                return Err(SettingsError::Invalid(format!(
                    "mapper '{}': fetch_timeout_ms must be greater than zero",
                    mapper.name
                )));
            }
        }

        Ok(())
    }

    /// Parses the listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.addr
            .parse()
            .map_err(|e| SettingsError::Invalid(format!("invalid addr '{}': {}", self.addr, e)))
    }
}
