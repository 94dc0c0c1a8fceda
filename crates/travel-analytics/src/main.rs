//! `travel-analytics` - CLI and HTTP server entry point
//!
//! Loads configuration, opens the database and either serves the REST API or
//! runs one of the maintenance commands.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use travel_analytics::api::{self, AppState};
use travel_analytics::cli::{Cli, Command, ConfigCommand, InitDbCommand, ServeCommand};
use travel_analytics::{init_logging, Config, MockWeatherSource, Storage, WeatherService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, &serve_cmd).await,
        Command::InitDb(init_cmd) => handle_init_db(&config, &init_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

async fn handle_serve(mut config: Config, cmd: &ServeCommand) -> anyhow::Result<()> {
    if let Some(bind) = cmd.bind {
        config.server.bind = bind;
    }

    let storage = Arc::new(Storage::open(config.database_path())?);
    if config.storage.seed_sample_data {
        storage.seed_sample_flights()?;
    }

    let weather = WeatherService::new(
        Arc::clone(&storage),
        Arc::new(MockWeatherSource),
        config.cache_ttl(),
    );
    let state = AppState::new(Arc::clone(&storage), weather);

    api::serve(&config, state, api::shutdown_signal()).await?;

    match Arc::try_unwrap(storage) {
        Ok(storage) => storage.close()?,
        Err(_) => warn!("storage still in use at shutdown; leaving it to drop"),
    }
    info!("shutdown complete");
    Ok(())
}

fn handle_init_db(config: &Config, cmd: &InitDbCommand) -> anyhow::Result<()> {
    let path = cmd
        .database
        .clone()
        .unwrap_or_else(|| config.database_path());

    let storage = Storage::open(&path)
        .with_context(|| format!("initializing database at {}", path.display()))?;
    let seeded = if cmd.no_seed {
        0
    } else {
        storage.seed_sample_flights()?
    };
    let total = storage.count_all()?;
    storage.close()?;

    println!("Initialized database at {}", path.display());
    println!("  Sample flights added: {seeded}");
    println!("  Flights stored:       {total}");
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.server.bind);
                println!(
                    "  Request timeout:    {}s",
                    config.server.request_timeout_secs
                );
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Seed sample data:   {}", config.storage.seed_sample_data);
                println!();
                println!("[Weather]");
                println!("  Cache TTL:          {}s", config.weather.cache_ttl_secs);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path)).context("configuration is invalid")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
