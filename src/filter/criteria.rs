use super::numeric::parse_number;
use crate::listing::Listing;
use serde::{Deserialize, Serialize};
use std::fmt;

/// User-configured acceptance rules
///
/// Numeric bounds are inclusive and apply to the number parsed from the listing's text.
/// A field that does not parse passes its bound unless `strict` is set. Keyword tests look
/// at the title, location tests at the address; both ignore case. An empty criteria set
/// accepts every listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    #[serde(rename = "min-price")]
    pub min_price: Option<f64>,

    #[serde(rename = "max-price")]
    pub max_price: Option<f64>,

    #[serde(rename = "min-size")]
    pub min_size: Option<f64>,

    #[serde(rename = "max-size")]
    pub max_size: Option<f64>,

    #[serde(rename = "min-rooms")]
    pub min_rooms: Option<f64>,

    #[serde(rename = "max-rooms")]
    pub max_rooms: Option<f64>,

    /// At least one must appear in the title
    #[serde(rename = "include-keywords")]
    pub include_keywords: Vec<String>,

    /// None may appear in the title
    #[serde(rename = "exclude-keywords")]
    pub exclude_keywords: Vec<String>,

    /// At least one must appear in the address
    pub locations: Vec<String>,

    /// Reject listings whose bounded fields do not parse as numbers
    pub strict: bool,
}

/// Why a listing was not accepted
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    Price(String),
    Size(String),
    Rooms(String),
    ExcludedKeyword(String),
    NoIncludedKeyword,
    Location(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Price(value) => write!(f, "price '{}' out of bounds", value),
            Self::Size(value) => write!(f, "size '{}' out of bounds", value),
            Self::Rooms(value) => write!(f, "rooms '{}' out of bounds", value),
            Self::ExcludedKeyword(keyword) => write!(f, "title contains '{}'", keyword),
            Self::NoIncludedKeyword => write!(f, "title contains no wanted keyword"),
            Self::Location(address) => write!(f, "address '{}' not in wanted locations", address),
        }
    }
}

impl FilterCriteria {
    /// Returns true if no rule is configured
    pub fn is_empty(&self) -> bool {
        self.min_price.is_none()
            && self.max_price.is_none()
            && self.min_size.is_none()
            && self.max_size.is_none()
            && self.min_rooms.is_none()
            && self.max_rooms.is_none()
            && self.include_keywords.is_empty()
            && self.exclude_keywords.is_empty()
            && self.locations.is_empty()
    }

    /// Checks whether `listing` passes every rule
    pub fn matches(&self, listing: &Listing) -> bool {
        self.rejection(listing).is_none()
    }

    /// Returns the first rule `listing` violates, if any
    pub fn rejection(&self, listing: &Listing) -> Option<Rejection> {
        if !self.within(&listing.price, self.min_price, self.max_price) {
            return Some(Rejection::Price(listing.price.clone()));
        }
        if !self.within(&listing.size, self.min_size, self.max_size) {
            return Some(Rejection::Size(listing.size.clone()));
        }
        if !self.within(&listing.rooms, self.min_rooms, self.max_rooms) {
            return Some(Rejection::Rooms(listing.rooms.clone()));
        }

        let title = listing.title.to_lowercase();
        if let Some(keyword) = self
            .exclude_keywords
            .iter()
            .find(|k| title.contains(&k.to_lowercase()))
        {
            return Some(Rejection::ExcludedKeyword(keyword.clone()));
        }
        if !self.include_keywords.is_empty()
            && !self
                .include_keywords
                .iter()
                .any(|k| title.contains(&k.to_lowercase()))
        {
            return Some(Rejection::NoIncludedKeyword);
        }

        let address = listing.address.to_lowercase();
        if !self.locations.is_empty()
            && !self
                .locations
                .iter()
                .any(|l| address.contains(&l.to_lowercase()))
        {
            return Some(Rejection::Location(listing.address.clone()));
        }

        None
    }

    fn within(&self, text: &str, min: Option<f64>, max: Option<f64>) -> bool {
        if min.is_none() && max.is_none() {
            return true;
        }
        match parse_number(text) {
            None => !self.strict,
            Some(value) => min.map_or(true, |m| value >= m) && max.map_or(true, |m| value <= m),
        }
    }
}
