//! Metrics setup and initialization.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Buckets de histograma en segundos, de 100us a 30s.
const BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    30.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets(BUCKETS)
}

/// Instala el recorder global y retorna el handle para el endpoint.
///
/// Solo debe llamarse una vez por proceso.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = builder()?.install_recorder()?;

    super::mapper::register_mapper_metrics();
    super::http::register_http_metrics();

    info!("Metrics system initialized");
    Ok(handle)
}

/// Crea un recorder sin instalarlo globalmente (tests y benchmarks).
pub fn build_recorder_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
