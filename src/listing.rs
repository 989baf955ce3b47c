//! Listing data model
//!
//! A [`Listing`] is one parsed advertisement. Descriptive and numeric-ish fields are kept as
//! the text the site displays; absence is an empty string, never an error.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Source-scoped listing identifier
///
/// Either the site's native numeric ad id or a hash of a stable site key, see
/// [`crate::extract::hashed_id`].
pub type ListingId = u64;

/// Display format used for dates when a source does not define its own
pub const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";

/// Outcome of an auto-submit attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Applied {
    #[default]
    NotAttempted,
    Yes,
    No,
}

impl fmt::Display for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotAttempted => "",
            Self::Yes => "Yes",
            Self::No => "No",
        };
        f.write_str(text)
    }
}

/// One real-estate advertisement as extracted from a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub total_price: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub rooms: String,
    #[serde(default)]
    pub available_from: Option<String>,
    #[serde(default)]
    pub available_to: Option<String>,
    #[serde(default)]
    pub applied: Applied,
}

impl Listing {
    /// Creates a listing with only its identity set
    pub fn new(id: ListingId, source: impl Into<String>) -> Self {
        Self {
            id,
            source: source.into(),
            url: String::new(),
            title: String::new(),
            address: String::new(),
            image: String::new(),
            images: Vec::new(),
            price: String::new(),
            total_price: String::new(),
            size: String::new(),
            rooms: String::new(),
            available_from: None,
            available_to: None,
            applied: Applied::NotAttempted,
        }
    }

    /// Returns the text of a named field, as used by message templates
    ///
    /// Unknown names yield `None` so callers can leave the placeholder untouched.
    pub fn field(&self, name: &str) -> Option<String> {
        let value = match name {
            "id" => self.id.to_string(),
            "source" | "crawler" => self.source.clone(),
            "url" => self.url.clone(),
            "title" => self.title.clone(),
            "address" => self.address.clone(),
            "image" => self.image.clone(),
            "price" => self.price.clone(),
            "total_price" => self.total_price.clone(),
            "size" => self.size.clone(),
            "rooms" => self.rooms.clone(),
            "available_from" | "from" => self.available_from.clone().unwrap_or_default(),
            "available_to" | "to" => self.available_to.clone().unwrap_or_default(),
            "applied" => self.applied.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

/// Renders `date` in the given display format
///
/// Formats are checked when layouts are compiled; one that still fails to render falls back
/// to [`DEFAULT_DATE_FORMAT`].
pub fn format_date(date: NaiveDate, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(format)).is_err() {
        out = date.format(DEFAULT_DATE_FORMAT).to_string();
    }
    out
}

/// Today's date in the given display format
pub fn today(format: &str) -> String {
    format_date(Local::now().date_naive(), format)
}
