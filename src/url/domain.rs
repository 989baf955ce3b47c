use crate::{ConfigError, ConfigResult};
use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use flatwatch::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Immowelt.de/liste/berlin").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.immowelt.de".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Parses a configured search URL, accepting only http(s) URLs with a host
///
/// # Arguments
///
/// * `raw` - The URL as written in the configuration
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL
/// * `Err(ConfigError::InvalidUrl)` - If the URL is malformed, not http(s) or has no host
pub fn parse_http_url(raw: &str) -> ConfigResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::InvalidUrl(format!(
                "'{}': unsupported scheme '{}'",
                raw, other
            )))
        }
    }

    if extract_domain(&url).is_none() {
        return Err(ConfigError::InvalidUrl(format!("'{}': missing host", raw)));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_with_port_and_query() {
        let url = Url::parse("http://127.0.0.1:8080/search?page=2").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_parse_http_url_accepts_https() {
        let url = parse_http_url(" https://www.wg-gesucht.de/wg-zimmer-in-Berlin.8.0.1.0.html ")
            .unwrap();
        assert_eq!(url.host_str(), Some("www.wg-gesucht.de"));
    }

    #[test]
    fn test_parse_http_url_rejects_other_schemes() {
        assert!(matches!(
            parse_http_url("ftp://example.com/"),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            parse_http_url("not a url"),
            Err(ConfigError::InvalidUrl(_))
        ));
    }
}
