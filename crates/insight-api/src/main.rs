//! Learning insight API server
//!
//! Loads the clustering artifacts and the clustered dataset snapshot once,
//! then serves insight lookups and predictions over HTTP.

use anyhow::{Context, Result};
use insight_api::{api, config::ServiceConfig};
use insight_lib::{InsightService, StructuredLogger};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting learning insight service");

    let config = ServiceConfig::load().context("Failed to load configuration")?;
    info!(
        artifact_dir = %config.artifact_dir.display(),
        model = %config.model_path,
        dataset = %config.dataset_path,
        "Service configured"
    );

    let logger = StructuredLogger::new(&config.service_name);
    let service = InsightService::load(&config.artifact_paths(), &config.dataset_path(), logger.clone())
        .context("Failed to build insight templates")?;

    logger.log_startup(SERVICE_VERSION, service.model_loaded(), service.dataset_records());

    let app_state = Arc::new(api::AppState::new(Arc::new(service)));

    let shutdown_logger = logger.clone();
    let shutdown = async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown_logger.log_shutdown("SIGINT received"),
            Err(e) => {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        }
    };

    api::serve(config.api_port, app_state, shutdown).await?;
    info!("Shutting down");

    Ok(())
}
