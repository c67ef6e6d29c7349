//! # Queue Check
//!
//! Read-only diagnostic: connects to RabbitMQ, prints message and consumer
//! counts for every routed topic queue and the error queue, then disconnects.
//! Exits with status 1 when the broker cannot be reached.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use camunda_bridge::config::ConfigLoader;
use camunda_bridge::logging;
use camunda_bridge::messaging::{QueuePublisher, RabbitMqQueuePublisher};
use camunda_bridge::routing::RoutingTable;

#[derive(Parser, Debug)]
#[command(name = "check-queues")]
#[command(about = "Show RabbitMQ queue depth and consumers for the bridge topology")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (overrides CAMUNDA_BRIDGE_CONFIG_PATH)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing();

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let routing = RoutingTable::from_config(&config.routing);
    let topics: Vec<String> = routing.topics().map(str::to_string).collect();
    let publisher = RabbitMqQueuePublisher::with_topics(config.rabbitmq.clone(), topics);

    println!("Checking RabbitMQ at {}", publisher.connection_url_redacted());

    if let Err(e) = publisher.connect().await {
        eprintln!("✗ Could not connect to RabbitMQ: {}", e);
        return ExitCode::FAILURE;
    }

    let exit = match publisher.queues_info().await {
        Ok(queues) => {
            println!("✓ {} queues:", queues.len());
            for (name, info) in &queues {
                let marker = if !info.exists {
                    "✗ missing"
                } else if info.is_stalled() {
                    "⚠️  no consumers"
                } else if info.message_count > 0 {
                    "📬 pending"
                } else {
                    "✓"
                };
                println!(
                    "  {:<40} messages: {:>6}  consumers: {:>3}  {}",
                    name, info.message_count, info.consumer_count, marker
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to inspect queues: {}", e);
            ExitCode::FAILURE
        }
    };

    publisher.disconnect().await;
    exit
}
