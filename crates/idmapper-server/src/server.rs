use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;

use crate::handlers::{
    health::health_check,
    mapping::{get_name, get_status, run_action},
    metrics::metrics_handler,
    version::version,
};
use crate::middleware::{LoggingLayer, RequestIdLayer};
use crate::state::AppState;

/// Builds the router: mapping routes under `api_prefix`, plus `/health`,
/// `/version` and `/metrics` at the root.
pub fn create_router(state: AppState, api_prefix: &str, prometheus_handle: PrometheusHandle) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(RequestIdLayer)
        .layer(LoggingLayer);

    // /metrics usa otro estado
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    let mapping_router = Router::new()
        .route("/{mapper}", get(get_status))
        .route("/{mapper}/{id}", get(get_name).post(run_action));

    let prefix = api_prefix.trim_end_matches('/');
    let app_router = Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version));

    // axum no permite nest en la raiz
    let app_router = if prefix.is_empty() {
        app_router.merge(mapping_router)
    } else {
        app_router.nest(prefix, mapping_router)
    };

    Router::new()
        .merge(app_router.with_state(state))
        .merge(metrics_router)
        .layer(middleware::from_fn(
            crate::metrics::http::http_metrics_middleware,
        ))
        .layer(middleware_stack)
}

/// Serves `app` on `addr` until SIGINT or SIGTERM.
pub async fn run_server(addr: SocketAddr, app: Router) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
