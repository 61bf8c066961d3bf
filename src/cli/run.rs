//! Handler for the `run` command.

use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tracing::info;

use crate::app::Orchestrator;
use crate::cli::RunArgs;
use crate::config::Config;
use crate::domain::EventRegistry;
use crate::error::Result;
use crate::runtime::{LogSubscriber, Subscriber};

/// Load configuration, falling back to defaults when the default path is absent.
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path)
    } else {
        Ok(Config::default())
    }
}

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;

    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }
    if let Some(capacity) = args.queue_capacity {
        config.orchestrator.queue_capacity = capacity;
    }
    if let Some(interval) = args.health_interval_ms {
        config.orchestrator.health_check_interval_ms = interval;
    }

    config.init_logging();

    let orchestrator = Orchestrator::new(config.orchestrator.clone(), EventRegistry::builtin())?;
    let logger: Arc<dyn Subscriber> = Arc::new(LogSubscriber);
    for definition in orchestrator.event_definitions() {
        orchestrator
            .subscribe_arc(definition.name(), Arc::clone(&logger))
            .await?;
    }

    orchestrator.start().await?;
    info!(
        event_types = orchestrator.registry().len(),
        queue_capacity = config.orchestrator.queue_capacity,
        "event-orchestrator running, press Ctrl-C to stop"
    );

    signal::ctrl_c().await?;
    info!("Shutdown signal received");

    orchestrator.stop().await?;
    let metrics = orchestrator.metrics().await?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    orchestrator.shutdown().await?;

    info!("event-orchestrator stopped");
    Ok(())
}
