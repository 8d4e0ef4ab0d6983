use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use foliochart::cli::chart::ChartOptions;
use foliochart::core::log::init_logging;
use foliochart::core::{Interval, Range};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display price history for the largest holdings
    Chart {
        /// Time range, e.g. 1d, 5d, 1mo, 1y, max
        #[arg(short, long)]
        range: Option<Range>,

        /// Sampling interval, e.g. 5m, 1h, 1d, 1wk
        #[arg(short, long)]
        interval: Option<Interval>,

        /// Ignore cached series for this range and interval
        #[arg(long)]
        refresh: bool,

        /// Reload every N seconds until interrupted
        #[arg(short, long, value_name = "SECONDS")]
        watch: Option<u64>,
    },
}

impl From<Commands> for foliochart::AppCommand {
    fn from(cmd: Commands) -> foliochart::AppCommand {
        match cmd {
            Commands::Chart {
                range,
                interval,
                refresh,
                watch,
            } => foliochart::AppCommand::Chart(ChartOptions {
                range,
                interval,
                refresh,
                watch,
            }),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => foliochart::cli::setup::setup_at_path(path),
            None => foliochart::cli::setup::setup(),
        },
        Some(cmd) => foliochart::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
