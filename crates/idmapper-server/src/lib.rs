//! # idmapper server
//!
//! HTTP service exposing the configured mappers:
//!
//! - `GET {api_prefix}/{mapper}/{id}`: name of `id`
//! - `GET {api_prefix}/{mapper}`: reload status of the mapper
//! - `POST {api_prefix}/{mapper}/reload`: reload now
//! - `GET /health`, `GET /version`, `GET /metrics`

pub mod cli;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod mappers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod settings;
pub mod state;

// Re-exports
pub use error::{AppError, RegistryError, SettingsError};
pub use handlers::health::HealthResponse;
pub use handlers::version::VersionResponse;
pub use mappers::{Mapper, MapperRegistry, MapperStatus};
pub use server::{create_router, run_server};
pub use settings::Settings;
pub use state::AppState;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
