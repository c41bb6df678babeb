//! Lookup, status and reload of a mapper.

use axum::{
    Json,
    extract::{Path, State},
};
use idmapper_sources::IdName;
use tracing::info;

use crate::error::AppError;
use crate::mappers::{Mapper, MapperStatus};
use crate::state::AppState;

fn mapper<'a>(state: &'a AppState, name: &str) -> Result<&'a Mapper, AppError> {
    state
        .registry()
        .get(name)
        .map(|m| m.as_ref())
        .ok_or_else(|| AppError::MapperNotFound(name.to_string()))
}

/// GET {prefix}/{mapper}/{id}
pub async fn get_name(
    State(state): State<AppState>,
    Path((mapper_name, id)): Path<(String, String)>,
) -> Result<Json<IdName>, AppError> {
    let mapper = mapper(&state, &mapper_name)?;

    match mapper.get(&id).await {
        Some(name) => Ok(Json(IdName { id, name })),
        None => Err(AppError::IdNotFound {
            mapper: mapper_name,
            id,
        }),
    }
}

/// GET {prefix}/{mapper}
pub async fn get_status(
    State(state): State<AppState>,
    Path(mapper_name): Path<String>,
) -> Result<Json<MapperStatus>, AppError> {
    let mapper = mapper(&state, &mapper_name)?;
    Ok(Json(mapper.status()))
}

/// POST {prefix}/{mapper}/{action}
///
/// `reload` is the only action.
pub async fn run_action(
    State(state): State<AppState>,
    Path((mapper_name, action)): Path<(String, String)>,
) -> Result<Json<MapperStatus>, AppError> {
    let mapper = mapper(&state, &mapper_name)?;

    if action != "reload" {
        return Err(AppError::BadRequest(format!("unknown action '{}'", action)));
    }

    info!(mapper = %mapper_name, "Reload requested");
    mapper.reload().await?;

    Ok(Json(mapper.status()))
}
