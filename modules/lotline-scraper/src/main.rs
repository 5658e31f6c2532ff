use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lotline_common::{Config, SourceDataset};
use lotline_scraper::{RebrowserValuationSource, RetryClassifier, ScrapeQueueManager};
use rebrowser_client::RebrowserClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lotline=info".parse()?))
        .init();

    info!("Lotline valuation scraper starting...");

    let config = Config::scraper_from_env();

    let dataset = Arc::new(SourceDataset::load(&config.source_data_path).await?);
    let addresses: Vec<String> = dataset
        .full_addresses()
        .await
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();

    info!(
        total = addresses.len(),
        lanes = config.scrape_lanes,
        path = config.source_data_path.as_str(),
        "Loaded source dataset"
    );

    let client = RebrowserClient::new(&config.rebrowser_ws_url);
    let source = Arc::new(RebrowserValuationSource::new(
        client,
        &config.valuation_site_url,
    ));

    let site_label = config
        .valuation_site_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string();

    let manager = ScrapeQueueManager::new(
        source,
        dataset,
        RetryClassifier::new(Duration::from_millis(config.scrape_retry_delay_ms)),
        Duration::from_millis(config.lane_min_delay_ms),
        config.scrape_max_attempts,
        &site_label,
    );

    let report = manager.run(addresses, config.scrape_lanes).await;

    info!(
        found = report.found(),
        not_found = report.not_found(),
        skipped = report.skipped(),
        failed = report.failures().len(),
        "Scraper finished"
    );

    Ok(())
}
