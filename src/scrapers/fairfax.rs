use crate::config::Config;
use crate::models::{ListingRecord, ListingStatus};
use crate::scrapers::rules;
use crate::scrapers::traits::ScraperTrait;
use crate::scrapers::{fetch, ScrapeError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

lazy_static! {
    static ref HEADING_SEL: Selector =
        Selector::parse("h1, h2, h3, h4, h5, h6").expect("heading selector");
    static ref FALLBACK_SEL: Selector = Selector::parse("div, article, li").expect("block selector");
    static ref PRICE_RE: Regex = Regex::new(r"\$[\d,]+").expect("price regex");
    static ref LOCATION_RE: Regex =
        Regex::new(r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*),\s*([A-Z]{2})\s+(\d{5})")
            .expect("location regex");
    static ref HOUSEHOLD_RE: Regex =
        Regex::new(r"(?i)(\d+)\s+to\s+(\d+)\s+people?").expect("household regex");
    static ref BEDS_RE: Regex = Regex::new(r"(?i)(\d+)\s+bedrooms?").expect("beds regex");
    static ref BATHS_RE: Regex = Regex::new(r"(?i)(\d+)\s+bathrooms?").expect("baths regex");
}

/// Scraper for the Fairfax County First-Time Homebuyers listings page.
pub struct FairfaxScraper {
    client: Client,
    url: String,
    max_attempts: usize,
}

impl FairfaxScraper {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: config.listings_url.clone(),
            max_attempts: config.max_fetch_attempts,
        })
    }
}

#[async_trait]
impl ScraperTrait for FairfaxScraper {
    async fn scrape(&self) -> Result<Vec<ListingRecord>, ScrapeError> {
        debug!("Fetching URL: {}", self.url);
        let html = fetch::fetch_page(&self.client, &self.url, self.max_attempts).await?;
        debug!("Downloaded {} bytes of HTML", html.len());

        let listings = extract_listings(&html, &self.url)?;
        info!("Successfully scraped {} listings", listings.len());
        Ok(listings)
    }

    fn source_name(&self) -> &'static str {
        "Fairfax FTHB"
    }
}

/// Extract candidate listings from raw page HTML.
///
/// Primary pass: walk headings after the "Homes for Sale" marker and treat
/// each qualifying heading plus its following siblings as one listing block.
/// Fallback pass: when that yields nothing, scan every block-level element
/// that looks listing-shaped. Blocks that cannot be parsed are skipped; only
/// a missing section or an empty result is fatal.
pub fn extract_listings(html: &str, base_url: &str) -> Result<Vec<ListingRecord>, ScrapeError> {
    let document = Html::parse_document(html);
    let headings: Vec<ElementRef> = document.select(&HEADING_SEL).collect();

    // Prefer a level-2 marker; any heading level is accepted as a fallback.
    let start = headings
        .iter()
        .position(|h| h.value().name() == "h2" && contains_marker(h))
        .or_else(|| headings.iter().position(contains_marker))
        .ok_or(ScrapeError::NoSectionFound)?;
    let level2_marker = headings[start].value().name() == "h2";

    let mut listings = Vec::new();

    for heading in &headings[start + 1..] {
        // When the marker was a proper h2 the section is h2-delimited and
        // other heading levels belong to the blocks, not the walk.
        if level2_marker && heading.value().name() != "h2" {
            continue;
        }

        let text = element_text(heading);
        let lower = text.to_lowercase();

        if rules::STOP_WORDS.iter().any(|w| lower.contains(w)) {
            break;
        }
        if !heading_qualifies(&lower) {
            continue;
        }

        let block = collect_block(*heading);
        if let Some(listing) = parse_block(&block, base_url) {
            listings.push(listing);
        }
    }

    if listings.is_empty() {
        warn!("No listings found via heading walk, trying block-level fallback");
        listings = fallback_pass(&document, base_url);
    }

    if listings.is_empty() {
        return Err(ScrapeError::NoListingsFound);
    }

    Ok(listings)
}

fn contains_marker(heading: &ElementRef) -> bool {
    element_text(heading)
        .to_lowercase()
        .contains(rules::SECTION_MARKER)
}

fn heading_qualifies(lower: &str) -> bool {
    lower.contains('$')
        || rules::STATUS_TOKENS.iter().any(|t| lower.contains(t))
        || rules::ADDRESS_TOKENS.iter().any(|t| lower.contains(t))
}

/// A listing heading plus its following element siblings, bounded by the
/// next h2 and a lookahead cap.
fn collect_block(heading: ElementRef) -> Vec<ElementRef> {
    let mut elements = vec![heading];
    for node in heading.next_siblings() {
        if let Some(el) = ElementRef::wrap(node) {
            if el.value().name() == "h2" {
                break;
            }
            elements.push(el);
            if elements.len() > rules::BLOCK_LOOKAHEAD {
                break;
            }
        }
    }
    elements
}

fn fallback_pass(document: &Html, base_url: &str) -> Vec<ListingRecord> {
    let mut listings = Vec::new();
    for el in document.select(&FALLBACK_SEL) {
        let text = element_text(&el);
        if text.len() < rules::FALLBACK_MIN_TEXT_LEN {
            continue;
        }
        let lower = text.to_lowercase();
        let has_price = lower.contains('$');
        let has_address = rules::ADDRESS_TOKENS.iter().any(|t| lower.contains(t));
        let has_link = !collect_links(&[el]).is_empty();
        if !(has_price || has_address || has_link) {
            continue;
        }
        if let Some(listing) = parse_block(&[el], base_url) {
            listings.push(listing);
        }
    }
    listings
}

/// Parse one listing block into a record. `None` means the block carries no
/// usable title and is not a listing; that is a normal outcome, not an error.
fn parse_block(elements: &[ElementRef], base_url: &str) -> Option<ListingRecord> {
    let text = block_text(elements);
    let lower = text.to_lowercase();

    let title = find_title(elements, &text)?;

    let status = if lower.contains("drawing closed") {
        Some(ListingStatus::DrawingClosed)
    } else if lower.contains("immediately available") {
        Some(ListingStatus::ImmediatelyAvailable)
    } else if lower.contains("available") {
        Some(ListingStatus::Available)
    } else {
        None
    };

    let price = PRICE_RE
        .find(&text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let location = LOCATION_RE
        .find(&text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let mut details = Vec::new();
    for (needles, label) in rules::PROPERTY_TYPES {
        if needles.iter().any(|n| lower.contains(n)) {
            details.push(format!("Type: {label}"));
            break;
        }
    }
    if let Some(m) = HOUSEHOLD_RE.find(&text) {
        details.push(format!("Household: {}", m.as_str()));
    }
    let beds = BEDS_RE.find(&text).map(|m| m.as_str().to_string());
    let baths = BATHS_RE.find(&text).map(|m| m.as_str().to_string());
    if beds.is_some() || baths.is_some() {
        details.push(format!(
            "Beds/Baths: {} / {}",
            beds.as_deref().unwrap_or("N/A"),
            baths.as_deref().unwrap_or("N/A")
        ));
    }

    let url = find_listing_url(elements, base_url).unwrap_or_default();

    Some(ListingRecord {
        title,
        status,
        price,
        location,
        details,
        url,
    })
}

/// Title priority: first h2/h3/h4/strong/b anywhere in the block, else the
/// block's first text line capped at a fixed length.
fn find_title(elements: &[ElementRef], text: &str) -> Option<String> {
    for tag in ["h2", "h3", "h4", "strong", "b"] {
        for el in elements {
            for node in el.descendants() {
                if let Some(d) = ElementRef::wrap(node) {
                    if d.value().name() == tag {
                        let title = element_text(&d);
                        if !title.is_empty() {
                            return Some(title);
                        }
                    }
                }
            }
        }
    }

    let truncated: String = text.chars().take(rules::TITLE_MAX_LEN).collect();
    let truncated = truncated.trim().to_string();
    if truncated.is_empty() {
        None
    } else {
        Some(truncated)
    }
}

/// Find the detail-page link: anchor text by priority needle, then the first
/// non-fragment href as a last resort.
fn find_listing_url(elements: &[ElementRef], base_url: &str) -> Option<String> {
    let links = collect_links(elements);

    for needle in rules::LISTING_LINK_TEXTS {
        for (anchor_text, href) in &links {
            if anchor_text.contains(needle) {
                return Some(absolutize(base_url, href));
            }
        }
    }

    links
        .iter()
        .find(|(_, href)| !href.starts_with('#'))
        .map(|(_, href)| absolutize(base_url, href))
}

/// All hyperlinks in the block as (lowercased anchor text, href).
fn collect_links(elements: &[ElementRef]) -> Vec<(String, String)> {
    let mut links = Vec::new();
    for el in elements {
        for node in el.descendants() {
            if let Some(d) = ElementRef::wrap(node) {
                if d.value().name() == "a" {
                    if let Some(href) = d.value().attr("href") {
                        if !href.is_empty() {
                            links.push((element_text(&d).to_lowercase(), href.to_string()));
                        }
                    }
                }
            }
        }
    }
    links
}

fn absolutize(base_url: &str, href: &str) -> String {
    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn block_text(elements: &[ElementRef]) -> String {
    elements
        .iter()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
