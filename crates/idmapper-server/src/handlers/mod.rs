//! HTTP handlers.

pub mod health;
pub mod mapping;
pub mod metrics;
pub mod version;
