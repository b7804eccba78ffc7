use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing availability status, derived from free text on the page.
///
/// Persisted as the exact uppercase strings the source page uses, so the
/// stored value stays greppable against the raw HTML.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ListingStatus {
    DrawingClosed,
    ImmediatelyAvailable,
    Available,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::DrawingClosed => "DRAWING CLOSED",
            ListingStatus::ImmediatelyAvailable => "IMMEDIATELY AVAILABLE",
            ListingStatus::Available => "AVAILABLE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAWING CLOSED" => Some(ListingStatus::DrawingClosed),
            "IMMEDIATELY AVAILABLE" => Some(ListingStatus::ImmediatelyAvailable),
            "AVAILABLE" => Some(ListingStatus::Available),
            _ => None,
        }
    }
}

/// A candidate listing freshly extracted from the page, not yet reconciled
/// against storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    pub title: String,
    pub status: Option<ListingStatus>,
    /// Raw matched substring like "$106,516", or empty.
    pub price: String,
    /// Raw matched "City, ST ZIP" substring, or empty.
    pub location: String,
    /// Human-readable derived facts, order-stable.
    pub details: Vec<String>,
    /// Absolute URL to the detail page, or empty if undiscoverable.
    pub url: String,
}

/// A listing as tracked in the store across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedListing {
    pub id: String,
    pub title: String,
    pub status: Option<ListingStatus>,
    pub price: String,
    pub location: String,
    pub details: Vec<String>,
    pub url: String,
    /// Set once at creation, never mutated afterwards.
    pub first_seen_at: DateTime<Utc>,
    /// Refreshed on every observation.
    pub last_seen_at: DateTime<Utc>,
    /// Set exactly once, when a notification containing this listing succeeds.
    pub notified_at: Option<DateTime<Utc>>,
}

/// Counts over the whole store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub total: usize,
    pub notified: usize,
    pub unnotified: usize,
}
