pub mod fairfax;
pub mod fetch;
pub mod rules;
pub mod traits;

pub use fairfax::{extract_listings, FairfaxScraper};
pub use traits::ScraperTrait;

use thiserror::Error;

/// Fatal scrape failures. Per-block parse trouble is not represented here:
/// a block that cannot be parsed is skipped, not an error.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network or HTTP failure that survived all retry attempts.
    #[error("failed to fetch {url} after {attempts} attempts")]
    Fetch {
        url: String,
        attempts: usize,
        #[source]
        source: reqwest::Error,
    },

    /// No listings-section heading anywhere in the document. The page layout
    /// has changed beyond recognition.
    #[error("could not find a '{}' heading on the page", rules::SECTION_MARKER)]
    NoSectionFound,

    /// Both the heading walk and the fallback pass produced zero records.
    #[error("no listings found on the page; its structure may have changed")]
    NoListingsFound,
}
