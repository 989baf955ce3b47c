//! Listing id derivation
//!
//! Sources with a native numeric ad id use it directly. Sources that only expose an opaque
//! key get a SHA-256 digest of that key, read as a big-endian integer and reduced modulo
//! [`HASHED_ID_RANGE`]. Two distinct keys may collide; for `n` listings of one source the
//! probability is about `n^2 / (2 * 10^16)`, roughly 5e-7 at 100 000 listings.

use super::rules::FieldRule;
use super::ExtractionError;
use crate::listing::ListingId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Exclusive upper bound of hash-derived ids
pub const HASHED_ID_RANGE: u64 = 10_000_000_000_000_000;

/// Derives a bounded numeric id from an opaque site key
///
/// # Examples
///
/// ```
/// use flatwatch::extract::{hashed_id, HASHED_ID_RANGE};
///
/// let id = hashed_id("classified-2KxyZ");
/// assert_eq!(id, hashed_id("classified-2KxyZ"));
/// assert!(id < HASHED_ID_RANGE);
/// ```
pub fn hashed_id(key: &str) -> ListingId {
    let digest = Sha256::digest(key.as_bytes());
    let modulus = u128::from(HASHED_ID_RANGE);

    let reduced = digest
        .iter()
        .fold(0u128, |acc, byte| (acc * 256 + u128::from(*byte)) % modulus);

    // reduced < HASHED_ID_RANGE, so it fits
    reduced as ListingId
}

/// Parses a native numeric ad id
///
/// Zero is rejected: some sites use it as a placeholder on promoted cards.
pub fn numeric_id(raw: &str) -> Result<ListingId, ExtractionError> {
    match raw.trim().parse::<ListingId>() {
        Ok(0) | Err(_) => Err(ExtractionError::InvalidId {
            raw: raw.to_string(),
        }),
        Ok(id) => Ok(id),
    }
}

/// Rule producing a listing's id
///
/// The value is read with the embedded [`FieldRule`] and then either parsed as a number or
/// hashed, depending on `hashed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdRule {
    #[serde(flatten)]
    pub rule: FieldRule,

    #[serde(default)]
    pub hashed: bool,
}

impl IdRule {
    /// Id read as a native number
    pub fn numeric(rule: FieldRule) -> Self {
        Self {
            rule,
            hashed: false,
        }
    }

    /// Id hashed from an opaque key
    pub fn hashed(rule: FieldRule) -> Self {
        Self { rule, hashed: true }
    }
}

/// Turns an extracted id value into a [`ListingId`]
pub fn derive_id(raw: &str, hashed: bool) -> Result<ListingId, ExtractionError> {
    if hashed {
        let key = raw.trim();
        if key.is_empty() {
            return Err(ExtractionError::InvalidId {
                raw: raw.to_string(),
            });
        }
        Ok(hashed_id(key))
    } else {
        numeric_id(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_id_known_values() {
        assert_eq!(hashed_id("classified-2KxyZ"), 2757740500453045);
        assert_eq!(hashed_id("expose-1"), 5601699193727809);
    }

    #[test]
    fn test_hashed_id_is_stable_and_bounded() {
        for key in ["a", "expose-1", "expose-2", "ÄÖÜ"] {
            let id = hashed_id(key);
            assert_eq!(id, hashed_id(key));
            assert!(id < HASHED_ID_RANGE);
        }
        assert_ne!(hashed_id("expose-1"), hashed_id("expose-2"));
    }

    #[test]
    fn test_numeric_id() {
        assert_eq!(numeric_id(" 1234567 ").unwrap(), 1234567);
        assert!(matches!(
            numeric_id("12a"),
            Err(ExtractionError::InvalidId { .. })
        ));
        assert!(numeric_id("0").is_err());
        assert!(numeric_id("").is_err());
    }

    #[test]
    fn test_derive_id() {
        assert_eq!(derive_id("42", false).unwrap(), 42);
        assert_eq!(derive_id("expose-1", true).unwrap(), 5601699193727809);
        assert!(derive_id("  ", true).is_err());
    }

    #[test]
    fn test_id_rule_from_toml() {
        let rule: IdRule = toml::from_str(
            r#"
            attrs = ["id"]
            hashed = true
            "#,
        )
        .unwrap();
        assert!(rule.hashed);
        assert_eq!(rule.rule.attrs, vec!["id".to_string()]);
        assert_eq!(rule.rule.selector, None);
    }
}
