//! Vigilant -- real-time threat incident lifecycle and alert filtering.
//!
//! This crate provides the incident store and state machine, the pure
//! query/filter and statistics functions, a cancellable simulated detection
//! feed, and an HTTP API exposing them to a dashboard.

pub mod api;
pub mod config;
pub mod incident;
pub mod monitor;

use anyhow::{Context, Result};

use crate::config::VigilantConfig;
use crate::incident::IncidentStore;
use crate::monitor::{Monitor, SimulatedSource};

/// Build the store and a monitor fed by the simulated source, per `config`.
pub async fn build_monitor(config: &VigilantConfig) -> Result<Monitor> {
    let store = IncidentStore::new(config.monitor.live_window);

    if config.monitor.seed_demo_incidents {
        let seeded = incident::seed::populate(&store)
            .await
            .context("failed to seed demo incidents")?;
        tracing::info!(count = seeded.len(), "seeded demo incidents");
    }

    let probability = config.monitor.incident_probability;
    let source = match config.monitor.seed {
        Some(seed) => SimulatedSource::seeded(seed, probability),
        None => SimulatedSource::new(probability),
    };

    Ok(Monitor::new(
        store,
        Box::new(source),
        config.monitor.tick_interval(),
    ))
}

/// Start the Vigilant daemon: incident store, monitoring feed, and API server.
/// Runs until ctrl-c, then stops the feed before returning.
pub async fn serve(config: VigilantConfig) -> Result<()> {
    config.validate()?;

    let monitor = build_monitor(&config).await?;
    if config.monitor.autostart {
        monitor.start().await?;
    }

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind))?;
    let app = api::router(api::state::AppState::new(monitor.clone()));

    tracing::info!(%addr, "Vigilant listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.stop().await?;
    tracing::info!("Vigilant stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
