//! Run orchestration: FETCH -> EXTRACT -> RECONCILE -> NOTIFY -> COMMIT.
//!
//! Fatal scrape errors abort a run before any store mutation. A failed
//! notification leaves everything unnotified so the next run retries the
//! whole set; re-upserting already-seen listings is idempotent, so nothing
//! extracted this run is lost either way.

use crate::config::Config;
use crate::notify::{format_body, format_subject, Notifier};
use crate::scrapers::ScraperTrait;
use crate::store::ListingStore;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Leave DRAWING CLOSED listings out of notifications.
    pub exclude_closed: bool,
    /// Format and display without sending or marking anything notified.
    pub dry_run: bool,
}

/// What one run accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMetrics {
    pub scraped_total: usize,
    pub unnotified: usize,
    pub notified_count: usize,
}

/// Execute one full scrape cycle.
pub async fn run_once(
    config: &Config,
    store: &ListingStore,
    scraper: &dyn ScraperTrait,
    notifier: &dyn Notifier,
    opts: RunOptions,
) -> Result<RunMetrics> {
    let mut metrics = RunMetrics::default();

    info!("Starting scrape of {}", scraper.source_name());
    let records = scraper
        .scrape()
        .await
        .context("scrape failed; aborting run with no store mutation")?;
    metrics.scraped_total = records.len();
    info!("Scraped {} listings", records.len());

    for record in &records {
        store.upsert(record).context("upserting scraped listing")?;
    }

    let unnotified = store
        .query_unnotified(opts.exclude_closed)
        .context("querying unnotified listings")?;
    metrics.unnotified = unnotified.len();
    info!("Found {} unnotified listings", unnotified.len());

    if opts.dry_run {
        let subject = format_subject(&config.subject_prefix, unnotified.len());
        info!("DRY RUN - would send the following notification:");
        println!("\n{}", "=".repeat(80));
        println!("{subject}\n\n{}", format_body(&unnotified));
        println!("{}\n", "=".repeat(80));
    } else {
        // The notifier receives the full set even when it is empty; a
        // "no new listings" message doubles as a heartbeat.
        notifier
            .notify(&unnotified)
            .await
            .context("notification failed; listings stay unnotified and retry next run")?;

        if !unnotified.is_empty() {
            let ids: Vec<String> = unnotified.iter().map(|l| l.id.clone()).collect();
            metrics.notified_count = store
                .mark_notified(&ids)
                .context("marking notified after successful send")?;
        }
    }

    let stats = store.stats().context("reading store stats")?;
    info!(
        "Database stats: {} total, {} notified, {} unnotified",
        stats.total, stats.notified, stats.unnotified
    );

    Ok(metrics)
}

/// Run cycles forever, sleeping between them. A failed cycle is logged and
/// the loop continues; only process termination stops it.
pub async fn run_forever(
    config: &Config,
    store: &ListingStore,
    scraper: &dyn ScraperTrait,
    notifier: &dyn Notifier,
    opts: RunOptions,
) {
    let interval = Duration::from_secs(config.poll_interval_secs);
    loop {
        match run_once(config, store, scraper, notifier, opts).await {
            Ok(metrics) => info!(
                "Cycle complete: scraped={}, new={}, notified={}",
                metrics.scraped_total, metrics.unnotified, metrics.notified_count
            ),
            Err(e) => error!("Cycle failed: {e:#}"),
        }
        info!("Sleeping for {:?} until next cycle", interval);
        tokio::time::sleep(interval).await;
    }
}
