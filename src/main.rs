mod config;
mod models;
mod notify;
mod runner;
mod scrapers;
mod store;

use clap::Parser;
use config::Config;
use notify::ConsoleNotifier;
use runner::{RunOptions, RunMetrics};
use scrapers::FairfaxScraper;
use store::ListingStore;
use tracing::{info, Level};

/// Fairfax FTHB Listings Notifier - scrape the county listings page and
/// notify subscribers of new listings.
#[derive(Debug, Parser)]
#[command(name = "fthb-notifier", version, about)]
struct Args {
    /// Run a single scrape cycle and exit (for cron/scheduling)
    #[arg(long)]
    once: bool,

    /// Print what would be sent without sending or marking anything
    #[arg(long)]
    dry_run: bool,

    /// Exclude listings marked as 'DRAWING CLOSED'
    #[arg(long)]
    exclude_closed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    info!("🏠 Fairfax FTHB Listings Notifier");
    info!("==================================");

    let store = ListingStore::new(&config.db_path)?;
    let scraper = FairfaxScraper::new(&config)?;
    let notifier = ConsoleNotifier::new(config.subject_prefix.clone());

    let opts = RunOptions {
        exclude_closed: args.exclude_closed,
        dry_run: args.dry_run,
    };

    if args.once {
        let metrics: RunMetrics =
            runner::run_once(&config, &store, &scraper, &notifier, opts).await?;
        info!(
            "Run complete: scraped={}, new={}, notified={}",
            metrics.scraped_total, metrics.unnotified, metrics.notified_count
        );
    } else {
        info!(
            "Starting continuous mode ({}s polling), Ctrl+C to stop",
            config.poll_interval_secs
        );
        runner::run_forever(&config, &store, &scraper, &notifier, opts).await;
    }

    Ok(())
}
