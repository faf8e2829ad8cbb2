//! # Distill Receiver
//!
//! Long-running consumer process. Pulls messages from the broker, dispatches
//! them to the processors and sweeps monitors for staleness until Ctrl-C.
//!
//! ```bash
//! distill-receiver                      # every routing key, configured worker counts
//! distill-receiver watchdogs 4          # only the watchdogs queue, four workers
//! distill-receiver --config-dir ./config --environment production
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use distill_core::config::{BrokerProvider, BrokerConfig, ConfigManager};
use distill_core::logging::{get_environment, init_structured_logging};
use distill_core::messaging::{InMemoryQueueService, QueueService, RoutingKey};
use distill_core::{Runtime, ShutdownSignal};

#[derive(Parser, Debug)]
#[command(name = "distill-receiver")]
#[command(about = "Consume queued documents and monitor data-source health")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Consume only this routing key (logchutes, datachutes, watchdogs, monitors)
    routing_key: Option<String>,

    /// Worker count for the single routing key
    #[arg(default_value_t = 1)]
    workers: usize,

    /// Configuration directory (default: ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Environment name (default: DISTILL_ENV, APP_ENV, then development)
    #[arg(short, long)]
    environment: Option<String>,

    /// Do not run the monitor sweep in this process
    #[arg(long)]
    no_sweep: bool,
}

async fn connect_queue(broker: &BrokerConfig) -> Result<Arc<dyn QueueService>> {
    match broker.provider {
        BrokerProvider::InMemory => {
            warn!("Using the in-memory broker; messages are not shared between processes");
            Ok(Arc::new(InMemoryQueueService::new()))
        }
        #[cfg(feature = "rabbitmq")]
        BrokerProvider::Rabbitmq => {
            let service = distill_core::messaging::service::RabbitMqQueueService::connect(broker)
                .await
                .context("connecting to RabbitMQ")?;
            Ok(Arc::new(service))
        }
        #[cfg(not(feature = "rabbitmq"))]
        BrokerProvider::Rabbitmq => {
            bail!("broker.provider is rabbitmq but this build lacks the `rabbitmq` feature")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let environment = cli.environment.clone().unwrap_or_else(get_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .context("loading configuration")?;
    let mut config = manager.config().clone();
    if cli.no_sweep {
        config.sweep.enabled = false;
    }

    init_structured_logging(&config.logging);
    info!(
        environment = %manager.environment(),
        config_dir = %manager.config_directory().display(),
        "Starting distill receiver"
    );

    let catalog = manager.load_catalog().context("loading catalog")?;
    let queue = connect_queue(&config.broker).await?;
    let shutdown = ShutdownSignal::new();

    let handles = match &cli.routing_key {
        Some(key) => {
            let routing_key = RoutingKey::parse(key);
            if !routing_key.is_known() {
                bail!("unknown routing key '{key}'");
            }
            if cli.workers == 0 {
                bail!("worker count must be at least 1");
            }
            config.sweep.enabled = false;
            let runtime = Runtime::build(&config, catalog, queue);
            runtime
                .consumer
                .create_consumers(routing_key.as_str(), cli.workers, &shutdown)
                .await
                .context("starting consumers")?
        }
        None => {
            let runtime = Runtime::build(&config, catalog, queue);
            runtime.start(&shutdown).await.context("starting receiver")?
        }
    };

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("Ctrl-C received, shutting down");
    shutdown.trigger();

    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "Task ended abnormally");
        }
    }

    info!("Distill receiver stopped");
    Ok(())
}
