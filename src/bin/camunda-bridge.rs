//! # Camunda Bridge Server
//!
//! Runs the topic pollers until SIGINT or SIGTERM, then shuts down gracefully.
//!
//! ## Usage
//!
//! ```bash
//! # Built-in defaults (local Camunda and RabbitMQ)
//! cargo run --bin camunda-bridge
//!
//! # Explicit configuration file
//! cargo run --bin camunda-bridge -- --config config/camunda-bridge.toml
//!
//! # Route into an in-memory broker instead of RabbitMQ
//! cargo run --bin camunda-bridge -- --dry-run
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use camunda_bridge::camunda::CamundaClient;
use camunda_bridge::config::ConfigLoader;
use camunda_bridge::logging;
use camunda_bridge::messaging::{InMemoryQueuePublisher, QueuePublisher, RabbitMqQueuePublisher};
use camunda_bridge::worker::WorkerSupervisor;

#[derive(Parser, Debug)]
#[command(name = "camunda-bridge")]
#[command(about = "Fetch Camunda external tasks and route them onto RabbitMQ queues")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (overrides CAMUNDA_BRIDGE_CONFIG_PATH)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Publish into an in-memory broker instead of RabbitMQ
    #[arg(long)]
    dry_run: bool,

    /// Print the effective configuration with secrets masked and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let config = ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config.masked())?);
        return Ok(());
    }

    info!("🚀 Starting Camunda Bridge...");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));
    info!("   Engine: {}", config.camunda.base_url);
    info!("   Worker ID: {}", config.camunda.worker_id);
    info!(
        "   Broker: {}",
        if cli.dry_run {
            "in-memory (dry run)".to_string()
        } else {
            config.rabbitmq.url_redacted()
        }
    );
    info!(
        "   Lock duration: {:.1} minutes",
        config.camunda.lock_duration_minutes()
    );

    let engine = Arc::new(
        CamundaClient::new(config.camunda.clone()).context("Failed to create engine client")?,
    );
    let publisher: Arc<dyn QueuePublisher> = if cli.dry_run {
        Arc::new(InMemoryQueuePublisher::new(config.rabbitmq.clone()))
    } else {
        Arc::new(RabbitMqQueuePublisher::new(config.rabbitmq.clone()))
    };

    let supervisor = Arc::new(WorkerSupervisor::new(config, engine, publisher));

    if let Err(e) = supervisor.initialize().await {
        error!("Initialization failed: {}", e);
        supervisor.shutdown().await;
        return Err(e).context("Camunda Bridge could not start");
    }

    let status = supervisor.status().await;
    info!(status = %serde_json::to_string(&status)?, "Initial status");

    let token = supervisor.cancellation_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("🛑 Shutdown signal received, initiating graceful shutdown...");
        token.cancel();
    });

    info!("   Press Ctrl+C to shutdown gracefully");
    supervisor.start().await?;

    if let Some(report) = supervisor.shutdown().await {
        if report.abandoned > 0 {
            error!(
                abandoned = report.abandoned,
                "Some tasks did not stop within the join timeout"
            );
        }
    }

    info!("👋 Camunda Bridge shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
