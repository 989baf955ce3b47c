//! URL handling module for Flatwatch
//!
//! This module provides host extraction, wildcard host patterns for gating configured
//! search URLs, paginated URL derivation, and link resolution for extracted listings.

mod domain;
mod matcher;
mod pagination;

use url::Url;

// Re-export main functions
pub use domain::{extract_domain, parse_http_url};
pub use matcher::{matches_any, matches_wildcard};
pub use pagination::Pagination;

/// Resolves an extracted link against an optional base URL
///
/// Absolute http(s) links are returned unchanged. Relative links are joined onto `base`;
/// without a base they are returned as extracted. Script, mail and data links, as well as
/// fragment-only anchors, resolve to an empty string.
///
/// # Arguments
///
/// * `href` - The raw link text taken from the page
/// * `base` - The base URL for resolving relative links
///
/// # Returns
///
/// The resolved link, or an empty string if the link is unusable
pub fn resolve_link(href: &str, base: Option<&Url>) -> String {
    let href = href.trim();

    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return String::new();
    }

    if let Ok(absolute) = Url::parse(href) {
        return match absolute.scheme() {
            "http" | "https" => absolute.to_string(),
            _ => String::new(),
        };
    }

    match base.map(|b| b.join(href)) {
        Some(Ok(joined)) => joined.to_string(),
        _ => href.to_string(),
    }
}
