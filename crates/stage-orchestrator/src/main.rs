//! stagehand orchestrator daemon
//!
//! Locates or launches the controlled application, waits for its control
//! endpoint, starts a work session, and keeps watching until the process
//! exits or the daemon is told to shut down.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stage_core::{load_config, OrchestratorConfig};
use stage_orchestrator::resource::LogSink;
use stage_orchestrator::{ResourceDriver, SystemProcessManager};

#[derive(Parser)]
#[command(name = "stage-orchestrator")]
#[command(about = "stagehand orchestrator daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Work directory of the controlled application (overrides config)
    #[arg(short, long)]
    work_directory: Option<PathBuf>,

    /// Control-plane port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Session to start (scene index or name; overrides config)
    #[arg(short, long)]
    session: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("stagehand orchestrator starting...");

    let mut config = if let Some(config_path) = &args.config {
        load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        tracing::info!("Using default configuration");
        OrchestratorConfig::default()
    };

    if let Some(work_directory) = args.work_directory {
        config.work_directory = work_directory;
    }
    if let Some(port) = args.port {
        config.endpoint.port = port;
    }
    if let Some(session) = args.session {
        config.session = session;
    }

    tracing::info!(
        work_directory = %config.work_directory.display(),
        endpoint = %config.endpoint.base_url(),
        "Driving resource"
    );

    // Resource lifetime vs. operator-requested shutdown
    let resource_done = CancellationToken::new();
    let shutdown = CancellationToken::new();

    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        shutdown_clone.cancel();
    });

    // An explicit executable narrows which processes locate() may attach to
    let manager = match config.executable.as_deref().and_then(|p| p.file_name()) {
        Some(name) => SystemProcessManager::with_executable_names(vec![name
            .to_string_lossy()
            .into_owned()]),
        None => SystemProcessManager::new(),
    };

    let driver = Arc::new(ResourceDriver::new(
        config,
        Arc::new(manager),
        Arc::new(LogSink),
        resource_done.clone(),
    ));

    driver.start_resource().await.context("Failed to start resource")?;

    tokio::select! {
        _ = resource_done.cancelled() => {
            tracing::info!("Resource terminated on its own");
        }
        _ = shutdown.cancelled() => {
            driver.stop_resource().await;
        }
    }

    tracing::info!("Orchestrator shutdown complete");
    Ok(())
}
