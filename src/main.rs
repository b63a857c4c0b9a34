use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hydromet_acquire::{Acquirer, Coordinate};
use hydromet_core::{AppError, Config, ConfigError};

#[derive(Parser, Debug)]
#[command(name = "hydromet", about = "Resilient weather and river discharge acquisition")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rainfall, soil moisture and current conditions
    Weather(Location),
    /// River discharge series and aggregates
    Discharge(Location),
    /// Weather and discharge together, with an overall status
    Conditions(Location),
    /// Conditions for every location in a JSON file (array of {lat, lon})
    Bulk { file: PathBuf },
}

#[derive(Args, Debug)]
struct Location {
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    hydromet_core::init()?;

    let config = load_config(&cli)?;
    let acquirer = Acquirer::from_config(&config).context("Failed to set up upstream client")?;

    let output = match cli.command {
        Command::Weather(loc) => {
            serde_json::to_value(acquirer.acquire_weather(loc.lat, loc.lon).await)?
        }
        Command::Discharge(loc) => {
            serde_json::to_value(acquirer.acquire_discharge(loc.lat, loc.lon).await)?
        }
        Command::Conditions(loc) => {
            serde_json::to_value(acquirer.acquire_conditions(loc.lat, loc.lon).await)?
        }
        Command::Bulk { file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let locations: Vec<Coordinate> =
                serde_json::from_str(&contents).context("Failed to parse locations file")?;
            serde_json::to_value(acquirer.acquire_bulk(&locations).await)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    match Config::load_validated(cli.config.as_deref()) {
        Ok((config, _)) => Ok(config),
        Err(e) => {
            let err = match e.downcast::<ConfigError>() {
                Ok(config_err) => AppError::Config(config_err),
                Err(other) => AppError::Other(other),
            };
            tracing::error!("{}", err.user_message());
            Err(err.into())
        }
    }
}
