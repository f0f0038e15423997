pub mod cli;
pub mod core;
pub mod lookup;
pub mod news;
pub mod notify;
pub mod pipeline;
pub mod processor;
pub mod providers;
pub mod reconcile;
pub mod reliability;
pub mod scrape;
pub mod store;

use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::core::LocalTime;
use crate::core::config::{AppConfig, Credentials};

pub use pipeline::{RunReport, Scope, ScrapeOptions};

pub enum AppCommand {
    Scrape(ScrapeOptions),
    /// Overlay partial outputs onto `base`, or onto the configured store.
    Merge {
        base: Option<PathBuf>,
        inputs: Vec<PathBuf>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("NeoUZS starting...");
    dotenvy::dotenv().ok();

    let config = AppConfig::load(config_path)?;
    debug!(
        store = %config.store_path.display(),
        currencies = config.currencies.len(),
        feeds = config.news.feeds.len(),
        "Loaded config"
    );

    match command {
        AppCommand::Scrape(options) => {
            let credentials = Credentials::from_env();
            let report =
                pipeline::run_scrape(&config, &credentials, &options, LocalTime::now()).await?;
            cli::summary::display(&report);
        }
        AppCommand::Merge { base, inputs } => {
            let base = base.unwrap_or_else(|| config.store_path.clone());
            let merged = store::merge_files(&base, &inputs, &LocalTime::now())?;
            info!(merged, total = inputs.len(), base = %base.display(), "Merge complete");
        }
    }
    Ok(())
}
