//! Warden Identity Service

use anyhow::Context;
use tracing::info;
use warden_config::AppConfig;
use warden_identity::api::router;
use warden_identity::bootstrap::{self, Repositories};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load("config").context("failed to load configuration")?;
    warden_telemetry::init(&config.telemetry.log_level, config.telemetry.json);
    let metrics = warden_telemetry::init_metrics()?;

    info!(
        app = %config.app_name,
        env = %config.app_env,
        backend = ?config.storage.backend,
        "Starting identity service"
    );

    let repositories = Repositories::from_config(&config).await?;
    let notifier = bootstrap::build_notifier(&config)?;
    let state = bootstrap::build_state(&config, repositories, notifier, Some(metrics))?;
    bootstrap::seed_admin(&config, &state.accounts).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "Identity service listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Identity service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
