/// Checks if a host matches a wildcard pattern
///
/// This function supports two types of patterns, compared case-insensitively:
/// 1. Exact match: "www.immowelt.de" matches only "www.immowelt.de"
/// 2. Wildcard match: "*.immowelt.de" matches:
///    - "immowelt.de" (the bare domain)
///    - "www.immowelt.de" (single subdomain)
///    - "m.www.immowelt.de" (nested subdomains)
///
/// # Arguments
///
/// * `pattern` - The host pattern, optionally starting with "*."
/// * `host` - The host to check against the pattern
///
/// # Examples
///
/// ```
/// use flatwatch::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.immowelt.de", "www.immowelt.de"));
/// assert!(matches_wildcard("*.immowelt.de", "immowelt.de"));
/// assert!(!matches_wildcard("*.immowelt.de", "www.immowelt.at"));
/// ```
pub fn matches_wildcard(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim().to_ascii_lowercase();
    let host = host.trim().to_ascii_lowercase();

    if let Some(base) = pattern.strip_prefix("*.") {
        host == base || host.ends_with(&format!(".{}", base))
    } else {
        host == pattern
    }
}

/// Returns true if `host` matches at least one of `patterns`
///
/// An empty pattern list accepts every host.
pub fn matches_any<S: AsRef<str>>(patterns: &[S], host: &str) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| matches_wildcard(p.as_ref(), host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("www.wg-gesucht.de", "www.wg-gesucht.de"));
        assert!(!matches_wildcard("www.wg-gesucht.de", "wg-gesucht.de"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_subdomains() {
        assert!(matches_wildcard("*.kleinanzeigen.de", "kleinanzeigen.de"));
        assert!(matches_wildcard("*.kleinanzeigen.de", "www.kleinanzeigen.de"));
        assert!(matches_wildcard("*.kleinanzeigen.de", "a.b.kleinanzeigen.de"));
    }

    #[test]
    fn test_wildcard_rejects_lookalikes() {
        assert!(!matches_wildcard("*.kleinanzeigen.de", "ebay-kleinanzeigen.de"));
        assert!(!matches_wildcard("*.immowelt.de", "immowelt.de.evil.com"));
        assert!(!matches_wildcard("*.immowelt.de", ""));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches_wildcard("*.ImmobilienScout24.de", "WWW.immobilienscout24.DE"));
    }

    #[test]
    fn test_matches_any() {
        let patterns = ["*.kleinanzeigen.de", "*.ebay-kleinanzeigen.de"];
        assert!(matches_any(&patterns, "www.ebay-kleinanzeigen.de"));
        assert!(matches_any(&patterns, "www.kleinanzeigen.de"));
        assert!(!matches_any(&patterns, "www.immowelt.de"));

        let none: [&str; 0] = [];
        assert!(matches_any(&none, "anything.example"));
    }
}
