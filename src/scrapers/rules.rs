//! Heuristic rule sets for the listings page layout.
//!
//! The page has no stable schema, so every structural assumption lives here
//! as a named constant. When the county redesigns the page, these lists are
//! the first (and usually only) thing that needs updating.

/// Heading text that marks the start of the listings section.
pub const SECTION_MARKER: &str = "homes for sale";

/// Heading text that marks the end of the listings section. Hitting any of
/// these stops the heading walk.
pub const STOP_WORDS: &[&str] = &[
    "virtual assistant",
    "eligibility",
    "application",
    "step",
    "about",
];

/// Street-suffix tokens plus proper nouns observed in past listing titles.
/// A heading must carry one of these, a price symbol, or a status keyword
/// to be treated as a listing.
pub const ADDRESS_TOKENS: &[&str] = &[
    "way",
    "street",
    "road",
    "drive",
    "court",
    "lane",
    "groombridge",
    "cavalier",
];

/// Status keywords that qualify a heading as a listing.
pub const STATUS_TOKENS: &[&str] = &["drawing", "available"];

/// Property-type checks in priority order; the first match wins.
pub const PROPERTY_TYPES: &[(&[&str], &str)] = &[
    (&["condominium", "condo"], "Condominium"),
    (&["townhouse", "town home"], "Townhouse"),
    (&["single family"], "Single Family"),
];

/// Anchor-text needles for the detail-page link, in priority order.
pub const LISTING_LINK_TEXTS: &[&str] = &["full listing", "view listing", "listing"];

/// How many element siblings after a listing heading are considered part of
/// its block.
pub const BLOCK_LOOKAHEAD: usize = 10;

/// Minimum text length for a fallback-pass block to be worth parsing.
pub const FALLBACK_MIN_TEXT_LEN: usize = 50;

/// Title length cap when falling back to the block's first text line.
pub const TITLE_MAX_LEN: usize = 200;
