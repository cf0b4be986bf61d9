//! Liquid-Check command line host
//!
//! - `run` polls every configured device until Ctrl-C
//! - `status` fetches one device once and prints its sensor states
//! - `action` sends a command to a configured device

use liquid_check::{
    config::AppConfig,
    error::ErrorReporter,
    logging::{init_logging, LogConfig},
    services::{build_sensors, DeviceAction, DeviceIdentity, PollingCoordinator, SensorState},
    HttpClientFactory, LiquidCheckIntegration,
};

use clap::{Parser, Subcommand};
use liquid_check::client::ClientFactory;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Liquid-Check integration host
#[derive(Parser, Debug)]
#[command(name = "liquid-check")]
#[command(about = "Poll Liquid-Check tank level monitors and send them commands")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to ~/.config/liquid-check/config.toml)
    #[arg(long, global = true, env = "LIQUID_CHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll all configured devices until interrupted
    Run,
    /// Fetch one device once and print its sensor states as JSON
    Status {
        /// IP address or hostname of the device
        #[arg(long)]
        host: String,

        /// Display name
        #[arg(long, default_value = "Liquid-Check")]
        name: String,
    },
    /// Send a command to a configured device
    Action {
        /// start-measure or restart
        action: DeviceAction,

        /// Device id from the configuration
        #[arg(long)]
        device: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run => {
            let config = AppConfig::discover(cli.config.as_deref())?;
            init_logging(LogConfig::from_config(&config.logging).with_debug(cli.debug))?;
            run(&config).await
        }
        Command::Status { ref host, ref name } => {
            init_logging(LogConfig::from_env().with_debug(cli.debug))?;
            status(host, name).await
        }
        Command::Action { action, ref device } => {
            let config = AppConfig::discover(cli.config.as_deref())?;
            init_logging(LogConfig::from_config(&config.logging).with_debug(cli.debug))?;
            let integration = LiquidCheckIntegration::from_config(&config)?;
            integration.actions().execute(device, action).await;
            Ok(())
        }
    }
}

fn log_states(device_id: &str, states: &[SensorState]) {
    for state in states {
        let value = state
            .state
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown".to_string());
        info!(
            device_id,
            entity = %state.unique_id,
            value = %value,
            unit = state.unit.unwrap_or(""),
            available = state.available,
            "{}",
            state.name
        );
    }
}

async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let integration = LiquidCheckIntegration::from_config(config)?;
    let results = integration.setup_all().await;
    let loaded = results.iter().filter(|(_, result)| result.is_ok()).count();
    info!(loaded, configured = results.len(), "Devices set up");

    if loaded == 0 {
        anyhow::bail!("No device could be set up");
    }

    let mut watchers = Vec::new();
    for device_id in integration.loaded_ids().await {
        let Some(device) = integration.device(&device_id).await else {
            continue;
        };
        let mut changes = device.coordinator.subscribe();
        watchers.push(tokio::spawn(async move {
            loop {
                let states: Vec<SensorState> =
                    device.sensors.iter().map(|sensor| sensor.render()).collect();
                log_states(&device_id, &states);
                if changes.changed().await.is_err() {
                    break;
                }
            }
        }));
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    for watcher in watchers {
        watcher.abort();
    }
    integration.unload_all().await;
    Ok(())
}

async fn status(host: &str, name: &str) -> anyhow::Result<()> {
    let client = HttpClientFactory::new().create_client(host)?;
    let coordinator = PollingCoordinator::new(DeviceIdentity::new("status", host, name), client, 0)?;

    if let Err(err) = coordinator.refresh().await {
        error!(host, "Status fetch failed");
        println!("{}", serde_json::to_string_pretty(&ErrorReporter::format_api_error(&err))?);
        return Err(err.into());
    }

    let states: Vec<SensorState> = build_sensors(&coordinator)
        .iter()
        .map(|sensor| sensor.render())
        .collect();
    if states.iter().all(|state| state.state.is_none()) {
        warn!(host, "Device reported none of the known metrics");
    }
    println!("{}", serde_json::to_string_pretty(&states)?);
    Ok(())
}
