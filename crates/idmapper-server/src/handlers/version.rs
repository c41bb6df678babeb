use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub build: &'static str,
}

impl Default for VersionResponse {
    /// Commit y build vienen del entorno de compilacion.
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            commit: option_env!("IDMAPPER_COMMIT").unwrap_or(""),
            build: option_env!("IDMAPPER_BUILD").unwrap_or(""),
        }
    }
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse::default())
}
