use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sweep_reaper::{Reaper, ReaperConfig};
use sweep_store::{JobStore, SqliteJobStore, SystemClock};
use sweep_types::CoordinatorConfig;
use tracing::info;

#[derive(Parser)]
#[command(name = "sweep-coordinator")]
#[command(about = "Coordinator: job store, reaper, and HTTP API for a parameter sweep")]
struct Cli {
    /// Path to the coordinator's JSON configuration file.
    #[arg(long)]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading coordinator config at {}", cli.config))?;
    let config: CoordinatorConfig =
        serde_json::from_str(&raw).with_context(|| "parsing coordinator config")?;

    info!(exp_id = %config.exp_id, db = %config.job_db, "starting coordinator");

    let store = SqliteJobStore::connect(&config.job_db)
        .await
        .context("opening job store")?;

    if config.fresh_start {
        let points = config.parameters.expand();
        let count = store
            .create_jobs(points, true)
            .await
            .context("creating jobs for fresh start")?;
        info!(count, "fresh_start: repopulated job queue");
    }

    let store: Arc<dyn JobStore> = Arc::new(store);

    let reaper = Reaper::new(
        store.clone(),
        Arc::new(SystemClock),
        ReaperConfig {
            poll_interval: config.polling_interval as i64,
            idle_timeout: config.idle_timeout as i64,
            aborted_age: config.aborted_job_reset_timeout as i64,
        },
    );
    let reaper_handle = reaper.spawn();

    let state = sweep_api::AppState::new(store, config.status_change_pin.clone());
    let app = sweep_api::build_router(state);

    let addr = format!("{}:{}", config.host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding coordinator HTTP listener to {addr}"))?;
    info!(%addr, "coordinator listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("coordinator HTTP server failed")?;

    reaper_handle.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
