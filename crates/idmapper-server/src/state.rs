//! Application state.

use std::sync::Arc;

use crate::mappers::MapperRegistry;

/// Estado compartido por todos los handlers.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<MapperRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<MapperRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the mapper registry.
    pub fn registry(&self) -> &MapperRegistry {
        &self.registry
    }
}
