//! Listing extraction
//!
//! Every source turns a fetched result page into listings through the same
//! [`ListingExtractor`] contract. Extraction is a pure function of the page text: no network
//! I/O happens here. The per-site differences are data, namely a declarative table of
//! [`FieldRule`]s evaluated by the HTML extractor or JSON pointers evaluated by the JSON
//! extractor. Ready-made tables for the supported marketplaces live in [`presets`].
//!
//! A listing whose required values are missing is skipped with a warning; the rest of the
//! page is still returned.

mod details;
mod html;
mod ids;
mod json;
pub mod presets;
mod rules;

use crate::listing::{today, Listing};
use crate::url::resolve_link;
use crate::ConfigResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

// Re-export main types
pub use details::{DetailExtractor, DetailRule};
pub use html::{FieldSpec, HtmlExtractor, HtmlLayout};
pub use ids::{derive_id, hashed_id, numeric_id, IdRule, HASHED_ID_RANGE};
pub use json::{JsonEmbed, JsonExtractor, JsonFieldSpec, JsonIdRule, JsonImages, JsonLayout};
pub use presets::Preset;
pub use rules::{compile_date_format, normalize_whitespace, CompiledRule, FieldRule, Refinement};

/// Image used when a listing has none, as shown by ImmobilienScout24 for listings without photos
pub const FALLBACK_IMAGE: &str = "https://www.static-immobilienscout24.de/statpic/placeholder_house/496c95154de31a357afa978cdb7f15f0_placeholder_medium.png";

/// Errors affecting a single listing
///
/// These never abort a page: the listing is skipped and counted as rejected.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Missing required field '{field}'")]
    MissingField { field: String },

    #[error("Invalid listing id '{raw}'")]
    InvalidId { raw: String },

    #[error("Malformed JSON entry: {0}")]
    Json(String),
}

/// Result of extracting one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    /// Listings in document order
    pub listings: Vec<Listing>,

    /// Total number of results the site reports for the search, if shown
    pub result_count: Option<u32>,

    /// Number of entries skipped as malformed
    pub rejected: usize,
}

/// Parses raw page content into listings
///
/// Implementations must be pure: same page in, same listings out.
pub trait ListingExtractor: Send + Sync {
    /// Name of the source the produced listings belong to
    fn source(&self) -> &str;

    /// Extracts all listings from a result page
    fn extract(&self, page: &str) -> ExtractedPage;
}

/// Listing attribute a rule writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingField {
    Url,
    Title,
    Address,
    Image,
    Price,
    TotalPrice,
    Size,
    Rooms,
    AvailableFrom,
    AvailableTo,
}

impl ListingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Title => "title",
            Self::Address => "address",
            Self::Image => "image",
            Self::Price => "price",
            Self::TotalPrice => "total-price",
            Self::Size => "size",
            Self::Rooms => "rooms",
            Self::AvailableFrom => "available-from",
            Self::AvailableTo => "available-to",
        }
    }

    /// Stores `value` in the matching attribute of `listing`
    ///
    /// Links are resolved against `base`. Empty dates are stored as absent.
    pub fn apply(self, listing: &mut Listing, value: String, base: Option<&Url>) {
        match self {
            Self::Url => listing.url = resolve_link(&value, base),
            Self::Title => listing.title = value,
            Self::Address => listing.address = value,
            Self::Image => listing.image = resolve_link(&value, base),
            Self::Price => listing.price = value,
            Self::TotalPrice => listing.total_price = value,
            Self::Size => listing.size = value,
            Self::Rooms => listing.rooms = value,
            Self::AvailableFrom => listing.available_from = Some(value).filter(|v| !v.is_empty()),
            Self::AvailableTo => listing.available_to = Some(value).filter(|v| !v.is_empty()),
        }
    }
}

impl fmt::Display for ListingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fills the display defaults every extractor guarantees
///
/// The primary image is the first gallery image when none was extracted, then the fallback
/// placeholder. A listing without a start date is available from today.
pub(crate) fn finish_listing(listing: &mut Listing, fallback_image: &str, date_format: &str) {
    if listing.image.is_empty() {
        listing.image = listing
            .images
            .first()
            .cloned()
            .unwrap_or_else(|| fallback_image.to_string());
    }
    if listing.available_from.is_none() {
        listing.available_from = Some(today(date_format));
    }
}

/// Parses a displayed result count such as "1.234 Ergebnisse" by keeping its digits
pub fn parse_count(text: &str) -> Option<u32> {
    let digits: String = text
        .split_whitespace()
        .find(|word| word.chars().any(|c| c.is_ascii_digit()))?
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Extraction strategy of a source
#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    Html(HtmlLayout),
    Json(JsonLayout),
}

impl Layout {
    /// Compiles the layout into an extractor producing listings for `source`
    pub fn build(&self, source: &str) -> ConfigResult<Arc<dyn ListingExtractor>> {
        Ok(match self {
            Self::Html(layout) => Arc::new(HtmlExtractor::new(source, layout)?),
            Self::Json(layout) => Arc::new(JsonExtractor::new(source, layout)?),
        })
    }
}
