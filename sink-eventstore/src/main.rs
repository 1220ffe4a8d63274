//! Event Store Sink Connector - Main Entry Point
//!
//! Loads the connector configuration, validates it, and prints the resulting
//! operator invocations as JSON for the job packaging step.

use danube_sink_eventstore::{EventStoreSinkConfig, OperatorInvocation, ToolkitLocation};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize logging first
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,danube_sink_eventstore=debug")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .ok(); // Ignore error if already initialized

    tracing::info!("Starting Event Store Sink Connector");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load unified configuration from single file (TOML + ENV overrides)
    let config = EventStoreSinkConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    config.validate()?;

    let insert = config.insert_config()?;
    tracing::info!("Configuration loaded and validated successfully");
    tracing::info!("Connector: {}", config.core.connector_name);
    tracing::info!("Event Store endpoints: {}", insert.connection_string());
    tracing::info!("Database: {}", insert.database());
    tracing::info!(
        "Table: {}{}",
        insert
            .schema_name()
            .map(|s| format!("{}.", s))
            .unwrap_or_default(),
        insert.table()
    );

    let setup = config
        .setup_config()?
        .map(|statement| OperatorInvocation::statements(&statement))
        .unwrap_or_default();
    for (idx, op) in setup.iter().enumerate() {
        tracing::debug!("Setup statement {}: {:?}", idx + 1, op);
    }

    let toolkit = match config.toolkit_location() {
        Ok(ToolkitLocation::Local(path)) => {
            tracing::info!("Toolkit: {}", path.display());
            Some(path.display().to_string())
        }
        Ok(ToolkitLocation::Remote(url)) => {
            tracing::info!("Toolkit will be fetched from {}", url);
            Some(url.to_string())
        }
        Err(e) => {
            tracing::warn!("Toolkit location unresolved: {}", e);
            None
        }
    };

    let invocation = OperatorInvocation::insert(&insert);
    tracing::debug!("Insert operator: {:?}", invocation);

    let output = json!({
        "connector": config.core.connector_name,
        "toolkit": toolkit,
        "setup": setup,
        "insert": invocation,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    tracing::info!("Event Store Sink Connector configuration emitted");
    Ok(())
}
