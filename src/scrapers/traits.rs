use crate::models::ListingRecord;
use crate::scrapers::ScrapeError;
use async_trait::async_trait;

/// Common trait for listing scrapers.
/// This allows easy addition of new sources (other counties, other program
/// pages) in the future, and lets the runner be tested against a fake.
#[async_trait]
pub trait ScraperTrait: Send + Sync {
    /// Fetch the source page and extract candidate listings from it.
    async fn scrape(&self) -> Result<Vec<ListingRecord>, ScrapeError>;

    /// Get the name of the scraper source.
    fn source_name(&self) -> &'static str;
}
