//! Uptime Warden - cloud resource lifecycle monitor
//!
//! Runs an escalation pass on a fixed interval: enumerate resources, classify
//! their uptime, notify owners and optionally remediate, while serving
//! health and metrics over HTTP.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uptime_warden::{api, config::WardenConfig};
use warden_lib::{
    AlertComposer, Dispatcher, DryRunRemediator, Engine, HealthRegistry, LogNotifier,
    PassLoopBuilder, RemediationDriver, SnapshotSource, StructuredLogger, WardenMetrics,
};

const WARDEN_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = WardenConfig::load()?;
    let engine_config = config.engine_config()?;
    let alert_settings = config.alert_settings()?;
    let snapshot_path = config
        .snapshot_path
        .clone()
        .context("snapshot_path is required (WARDEN_SNAPSHOT_PATH)")?;

    let logger = StructuredLogger::new(&config.account);
    logger.log_startup(WARDEN_VERSION);
    info!(
        account = %config.account,
        warning_hours = engine_config.thresholds.warning_hours(),
        critical_hours = engine_config.thresholds.critical_hours(),
        notify = config.notify,
        remediate = config.remediate,
        snapshot = %snapshot_path.display(),
        "Warden configured"
    );
    if config.remediate {
        warn!("No provider remediation backend linked; critical buckets are logged, not applied");
    }

    let health_registry = HealthRegistry::with_pass_components().await;
    let metrics = WardenMetrics::new();

    let pass_loop = PassLoopBuilder::new()
        .source(Arc::new(SnapshotSource::new(snapshot_path)))
        .engine(Engine::new(engine_config, logger.clone()))
        .dispatcher(Dispatcher::new(
            Arc::new(LogNotifier::new(AlertComposer::new(alert_settings))),
            logger.clone(),
        ))
        .driver(RemediationDriver::new(Arc::new(DryRunRemediator), logger.clone()))
        .health(health_registry.clone())
        .interval(Duration::from_secs(config.interval_secs))
        .build()?;

    let app_state = Arc::new(api::AppState::new(
        health_registry,
        metrics,
        pass_loop.last_report(),
    ));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(pass_loop.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    // Receiver may already be gone if the loop exited
    let _ = shutdown_tx.send(());
    if let Err(e) = loop_handle.await {
        warn!(error = %e, "Pass loop task failed");
    }
    api_handle.abort();

    Ok(())
}
