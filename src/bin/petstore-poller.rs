/// Mirror pets from a pet-store endpoint into the catalog API.
///
/// Usage: petstore-poller [--once]
///   --once : Run a single poll and exit
use std::{sync::Arc, time::Duration};

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use product_catalog::{
    clock::SystemClock,
    config::PollerConfig,
    poller::{
        cache::PetCache, catalog::CatalogClient, service::IngestService, HttpPetSource,
        PetStorePoller,
    },
    shutdown::shutdown_signal,
};

#[derive(Parser)]
#[command(
    name = "petstore-poller",
    about = "Ingest pets from a pet store into the product catalog"
)]
struct Args {
    /// Poll once and exit instead of running on an interval
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = PollerConfig::from_env()?;
    let http_timeout = Duration::from_secs(config.http_timeout_secs);

    let source = HttpPetSource::new(config.source_url.clone(), http_timeout)?;
    let catalog = CatalogClient::new(
        &config.catalog_api_url,
        config.catalog_username.clone(),
        config.catalog_password.clone(),
        http_timeout,
    )?;
    let cache = Arc::new(PetCache::new(config.cache_ttl_minutes, Arc::new(SystemClock)));

    let poller = PetStorePoller::new(
        Arc::new(source),
        IngestService::new(cache, Arc::new(catalog)),
        Duration::from_secs(config.poll_interval_secs),
    );

    if args.once {
        let summary = poller.poll_once().await?;
        info!(
            fetched = summary.fetched,
            written = summary.written,
            skipped = summary.skipped,
            failed = summary.failed,
            "single poll finished"
        );
        return Ok(());
    }

    info!(
        source = %config.source_url,
        interval_secs = config.poll_interval_secs,
        "petstore poller started"
    );
    poller.run(shutdown_signal()).await;

    Ok(())
}
