//! idmapper binary.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use idmapper_server::cli::Cli;
use idmapper_server::logging::init_tracing;
use idmapper_server::metrics::init_metrics;
use idmapper_server::{AppState, MapperRegistry, Settings, create_router, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("failed to read configuration")?;
    if let Some(addr) = cli.addr {
        settings.addr = addr;
        settings.validate()?;
    }

    init_tracing(&settings.logger).context("failed to initialize logging")?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    }

    tracing::info!("Starting idmapper v{}", env!("CARGO_PKG_VERSION"));

    let prometheus = init_metrics().context("failed to initialize metrics")?;

    let registry = MapperRegistry::build(&settings.mappers)
        .await
        .context("failed to create mappers")?;

    if cli.config_check {
        tracing::info!(mappers = registry.len(), "Configuration is valid");
        registry.shutdown().await;
        return Ok(());
    }

    let addr = settings.socket_addr()?;

    let registry = Arc::new(registry);
    registry.start_reloader();

    let app = create_router(
        AppState::new(Arc::clone(&registry)),
        &settings.api_prefix,
        prometheus,
    );
    let served = run_server(addr, app).await;

    registry.shutdown().await;
    tracing::info!("Server stopped");

    served.context("server error")
}
