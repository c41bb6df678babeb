//! Errores del servidor.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use idmapper_core::{CacheError, SourceError};
use idmapper_scheduler::SchedulerError;
use serde::Serialize;

/// Errores al cargar o validar la configuracion.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Fallo al leer o deserializar las fuentes de configuracion
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Configuracion leida pero invalida
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errores al construir los mappers.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// La fuente del mapper esta mal configurada
    #[error("failed to create source for mapper '{mapper}': {source}")]
    Source {
        mapper: String,
        #[source]
        source: SourceError,
    },

    /// La carga inicial del mapper fallo
    #[error("failed to create mapper '{mapper}': {source}")]
    Cache {
        mapper: String,
        #[source]
        source: CacheError,
    },

    /// Dos mappers con el mismo nombre
    #[error("duplicate mapper '{0}'")]
    Duplicate(String),

    /// No se pudo registrar el reload periodico
    #[error("failed to set up reloading: {0}")]
    Scheduler(#[from] SchedulerError),
}

#[derive(Debug)]
pub enum AppError {
    /// Mapper inexistente
    MapperNotFound(String),

    /// ID inexistente en el mapper
    IdNotFound { mapper: String, id: String },

    /// Parametros invalidos
    BadRequest(String),

    /// La fuente de datos fallo durante un reload
    BadGateway(String),

    /// Error interno
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::MapperNotFound(mapper) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("Mapper '{}' not found", mapper),
            ),
            AppError::IdNotFound { mapper, id } => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("ID '{}' not found in mapper '{}'", id, mapper),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "Bad Gateway", msg),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                msg,
            ),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Source(e) => AppError::BadGateway(e.to_string()),
            CacheError::Closed { .. } => AppError::Internal(err.to_string()),
        }
    }
}
