//! Criteria filter
//!
//! Decides which new listings are reported. The global criteria from `[filter]` always
//! apply; a source's own `filter` table narrows them further and never replaces them.

mod criteria;
mod numeric;

pub use criteria::{FilterCriteria, Rejection};
pub use numeric::parse_number;

use crate::listing::Listing;

/// Evaluates the global criteria and then the source's override
///
/// # Returns
///
/// * `None` - If the listing passes both
/// * `Some(Rejection)` - The first violated rule
pub fn check(
    global: &FilterCriteria,
    source_override: Option<&FilterCriteria>,
    listing: &Listing,
) -> Option<Rejection> {
    global
        .rejection(listing)
        .or_else(|| source_override.and_then(|criteria| criteria.rejection(listing)))
}
