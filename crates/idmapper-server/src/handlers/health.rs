use std::collections::BTreeMap;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::mappers::MapperStatus;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `UP`, o `DEGRADED` si algun mapper sirve datos viejos por un reload
    /// fallido.
    pub status: String,
    pub mappers: BTreeMap<String, MapperStatus>,
}

impl HealthResponse {
    pub fn from_state(state: &AppState) -> Self {
        let registry = state.registry();
        let status = if registry.is_healthy() { "UP" } else { "DEGRADED" };

        Self {
            status: status.to_string(),
            mappers: registry.statuses(),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_state(&state))
}
