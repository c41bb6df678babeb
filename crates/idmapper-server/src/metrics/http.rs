//! HTTP metrics middleware.

use axum::{body::Body, extract::MatchedPath, http::Request, middleware::Next, response::Response};
use metrics::{counter, histogram};
use std::time::Instant;

/// Registra contador y latencia de cada request, etiquetados por la ruta
/// (el patron, no la URI) para acotar la cardinalidad.
pub async fn http_metrics_middleware(
    matched_path: Option<MatchedPath>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = matched_path
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();

    counter!(
        "idmapper_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "idmapper_http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}

/// Describe las metricas HTTP
pub fn register_http_metrics() {
    metrics::describe_counter!(
        "idmapper_http_requests_total",
        "Total number of HTTP requests"
    );
    metrics::describe_histogram!(
        "idmapper_http_request_duration_seconds",
        metrics::Unit::Seconds,
        "HTTP request duration in seconds"
    );
}
