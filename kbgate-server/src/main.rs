use anyhow::{Context, Result};
use clap::Parser;
use kbgate_client::WorkerClient;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod gate;
mod service;

use api::AppState;
use config::Config;
use gate::ExecutionGate;
use service::{HttpHealthProbe, JobRunner, Supervisor};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kbgate_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting kbgate...");

    let settings = Config::parse().resolve()?;
    tracing::info!(
        work_dir = %settings.work_dir.display(),
        python = %settings.python,
        worker = %settings.worker_url,
        "Configuration loaded"
    );

    let worker = WorkerClient::new(&settings.worker_url).with_timeout(settings.proxy_timeout);

    // Launch the worker; readiness is checked in the background
    let supervisor = Supervisor::start(
        settings.supervisor.clone(),
        HttpHealthProbe::new(worker.clone(), settings.supervisor.health_path.clone()),
    );

    let state = AppState {
        runner: JobRunner::new(ExecutionGate::new(), settings.job_buffer),
        worker,
        settings: Arc::new(settings),
    };
    let addr = state.settings.bind_addr.clone();

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(supervisor.fatal()))
        .await
        .context("Server error")?;

    let fatal = supervisor.is_fatal();
    tracing::info!(worker = ?supervisor.status().health, "Shutting down");
    supervisor.stop().await;

    if fatal {
        anyhow::bail!("worker never became healthy");
    }

    Ok(())
}

/// Resolves on Ctrl-C or when the supervisor gives up on the worker
async fn shutdown_signal(fatal: impl Future<Output = ()>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
        }
        _ = fatal => {
            tracing::error!("Worker failed its health checks, shutting down");
        }
    }
}
