//! Configuration validation command.

use std::path::Path;

use crate::config::Config;
use crate::error::Result;

/// Validate a configuration file without starting the orchestrator.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());
    println!();

    let config = Config::load(path)?;
    let orchestrator = &config.orchestrator;

    println!("✓ Configuration file is valid");
    println!();
    println!("Summary:");
    println!("  Queue capacity: {}", orchestrator.queue_capacity);
    println!("  Max listeners: {}", orchestrator.max_listeners);
    println!(
        "  Health check interval: {}ms",
        orchestrator.health_check_interval_ms
    );
    match orchestrator.default_timeout() {
        Some(timeout) => println!("  Default timeout: {}ms", timeout.as_millis()),
        None => println!("  Default timeout: disabled"),
    }
    println!("  Logging: {} ({})", config.logging.level, config.logging.format);
    println!("  Metrics: {}", if orchestrator.enable_metrics { "enabled" } else { "disabled" });

    Ok(())
}
