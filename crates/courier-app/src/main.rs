//! courier - relays the daily delivery report from the portal to the route
//! processor, and looks single deliveries up in the processed reports.

use anyhow::{Context, Result};
use clap::Parser;
use courier_core::AppConfig;
use std::path::Path;
use std::process::ExitCode;

mod cli;
mod commands;
mod logging;

use cli::{Cli, Command};

/// Load configuration. Only a run needs the portal settings to be valid.
fn load_config(path: Option<&Path>, validate: bool) -> Result<AppConfig> {
    if validate {
        return AppConfig::load_with_env(path).context("invalid configuration");
    }

    let mut config = match path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Run => {
            let config = load_config(config_path, true)?;
            let log_path = logging::init(Some(&config.paths.log_dir))?;
            commands::run::execute(config, log_path).await
        }
        Command::Lookup { code, json } => {
            let config = load_config(config_path, false)?;
            logging::init(None)?;
            commands::lookup::execute(&config, &code, json)
        }
        Command::Scan => {
            let config = load_config(config_path, false)?;
            logging::init(None)?;
            commands::scan::execute(&config).await
        }
        Command::Reference(action) => {
            let config = load_config(config_path, false)?;
            logging::init(None)?;
            commands::reference::execute(&config, action)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
