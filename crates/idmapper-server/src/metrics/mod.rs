//! Metricas Prometheus del servicio.

pub mod http;
pub mod mapper;
pub mod setup;

pub use mapper::MapperMetrics;
pub use setup::{build_recorder_handle, init_metrics};
