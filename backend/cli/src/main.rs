mod cache_cmd;
mod config_cmd;
mod fetch_cmd;
mod runtime;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use cache_cmd::CacheCommand;
use config_cmd::ConfigCommand;
use fetch_cmd::FetchArgs;
use runtime::Runtime;

#[derive(Parser)]
#[command(name = "holdfast")]
#[command(about = "Holdfast: cached, deadline-guarded, retrying fetches")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $HOLDFAST_CONFIG_DIR/config.yaml or ~/.holdfast/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a JSON URL with caching, a per-attempt deadline and retries
    Fetch(FetchArgs),
    /// Inspect or clear cached entries
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Inspect the configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Command failed");
            terminal_output::note_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let runtime = Runtime::load(cli.config).await?;
    runtime.init_logging();

    match cli.command {
        Commands::Fetch(args) => fetch_cmd::run(&runtime, args).await,
        Commands::Cache(command) => cache_cmd::run(&runtime, command),
        Commands::Config(command) => config_cmd::run(&runtime, command),
    }
}
