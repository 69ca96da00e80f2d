use crate::config::Config;
use crate::error::{HarvestError, Result};
use crate::infrastructure::{CsvStore, HttpFetcher};
use crate::services::{
    collection::CollectionService, conversion::ConversionService,
    harvest_service::HarvestService, merging::MergingService,
};
use std::sync::Arc;
use tracing::{info, Level};

mod config;
mod domain;
mod error;
mod infrastructure;
mod services;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::new()?;

    let level: Level = config
        .args
        .log_level
        .parse()
        .map_err(|_| HarvestError::Config(format!("unknown log level {}", config.args.log_level)))?;
    tracing_subscriber::fmt().with_max_level(level).init();

    config.ensure_directories()?;

    let store = Arc::new(CsvStore::new(
        config.args.data_dir.clone(),
        config.args.checkpoint_dir.clone(),
    ));
    let fetcher = HttpFetcher::new(config.http_client.clone());

    let harvest = HarvestService::new(
        config,
        CollectionService::new(fetcher, store.clone()),
        ConversionService::new(store.clone()),
        MergingService::new(store),
    );
    harvest.run().await?;

    info!("Harvest completed successfully!");
    Ok(())
}
