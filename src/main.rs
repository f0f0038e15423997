use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use neouzs::core::log::init_logging;
use neouzs::{Scope, ScrapeOptions};
use std::path::PathBuf;

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

impl From<Commands> for neouzs::AppCommand {
    fn from(cmd: Commands) -> neouzs::AppCommand {
        match cmd {
            Commands::Scrape {
                force,
                scope,
                output,
            } => neouzs::AppCommand::Scrape(ScrapeOptions {
                force,
                scope,
                output,
            }),
            Commands::Merge { base, inputs } => neouzs::AppCommand::Merge { base, inputs },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch rates, savings, news and reliability scores into the snapshot
    Scrape {
        /// Ignore every freshness window and refetch
        #[arg(long)]
        force: bool,

        /// Producers to run
        #[arg(long, value_enum, default_value_t = Scope::Exchange)]
        scope: Scope,

        /// Write a partial snapshot here instead of updating the store
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Overlay partial snapshots onto a base snapshot
    Merge {
        /// Base snapshot, defaults to the configured store
        #[arg(long)]
        base: Option<PathBuf>,

        /// Partial snapshots, applied in order
        #[arg(long, num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => neouzs::cli::setup::setup(),
        Some(cmd) => neouzs::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
