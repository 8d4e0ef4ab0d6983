pub mod batch;
pub mod chart;
pub mod cli;
pub mod core;
pub mod fetch;
pub mod normalize;
pub mod providers;

use crate::cli::chart::ChartOptions;
use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

/// Commands that need a loaded configuration.
#[derive(Debug, Clone)]
pub enum AppCommand {
    Chart(ChartOptions),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("foliochart starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Chart(options) => cli::chart::run(&config, &options).await,
    }
}
