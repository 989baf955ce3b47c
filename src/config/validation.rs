use crate::config::types::{Config, CrawlerConfig, MessageConfig, NotifyConfig, SourceConfig, StoreConfig};
use crate::crawler::SourceSpec;
use crate::filter::FilterCriteria;
use crate::url::parse_http_url;
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agents(&config.user_agent.agents)?;
    validate_store_config(&config.store)?;
    validate_filter(&config.filter, "filter")?;
    validate_message_config(&config.message)?;
    validate_notify_config(&config.notify)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.result_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "result-limit must be >= 1, got {}",
            config.result_limit
        )));
    }

    if config.page_ceiling < 1 {
        return Err(ConfigError::Validation(format!(
            "page-ceiling must be >= 1, got {}",
            config.page_ceiling
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    if config.fetch_attempts < 1 || config.fetch_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "fetch-attempts must be between 1 and 10, got {}",
            config.fetch_attempts
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout must be >= 1s, got {}s",
            config.request_timeout
        )));
    }

    if config.loop_period < 10 {
        return Err(ConfigError::Validation(format!(
            "loop-period must be >= 10s, got {}s",
            config.loop_period
        )));
    }

    Ok(())
}

/// Validates the user agent pool
fn validate_user_agents(agents: &[String]) -> Result<(), ConfigError> {
    if agents.iter().any(|agent| agent.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agent entries cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates store configuration
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "store path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates one criteria table, `section` names it in error messages
fn validate_filter(criteria: &FilterCriteria, section: &str) -> Result<(), ConfigError> {
    let bounds = [
        ("price", criteria.min_price, criteria.max_price),
        ("size", criteria.min_size, criteria.max_size),
        ("rooms", criteria.min_rooms, criteria.max_rooms),
    ];

    for (name, min, max) in bounds {
        for value in [min, max].into_iter().flatten() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "{}: {} bounds must be non-negative numbers, got {}",
                    section, name, value
                )));
            }
        }

        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ConfigError::Validation(format!(
                    "{}: min-{} ({}) is greater than max-{} ({})",
                    section, name, min, name, max
                )));
            }
        }
    }

    let keywords = criteria
        .include_keywords
        .iter()
        .chain(&criteria.exclude_keywords)
        .chain(&criteria.locations);
    for keyword in keywords {
        if keyword.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{}: keyword and location entries cannot be empty",
                section
            )));
        }
    }

    Ok(())
}

/// Validates the message template
fn validate_message_config(config: &MessageConfig) -> Result<(), ConfigError> {
    if config.template.trim().is_empty() {
        return Err(ConfigError::Validation(
            "message template cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates notification configuration
fn validate_notify_config(config: &NotifyConfig) -> Result<(), ConfigError> {
    if let Some(webhook) = &config.webhook_url {
        parse_http_url(webhook)?;
    }
    Ok(())
}

/// Validates all sources
fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    if sources.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[source]] must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for source in sources {
        validate_source_name(&source.name)?;

        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate source name '{}'",
                source.name
            )));
        }

        if source.layout_count() != 1 {
            return Err(ConfigError::Validation(format!(
                "source '{}' must declare exactly one of preset, html or json, found {}",
                source.name,
                source.layout_count()
            )));
        }

        if source.urls.is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' has no urls",
                source.name
            )));
        }

        if source.max_pages == Some(0) {
            return Err(ConfigError::Validation(format!(
                "source '{}': max-pages must be >= 1 when set",
                source.name
            )));
        }

        if let Some(filter) = &source.filter {
            validate_filter(filter, &format!("source '{}' filter", source.name))?;
        }

        // compiles selectors and patterns and checks URLs against host patterns
        SourceSpec::from_config(source)?;
    }

    Ok(())
}

/// Validates a source name: non-empty, lowercase alphanumeric, hyphens and underscores
fn validate_source_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "source name cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "source name must contain only lowercase letters, digits, '-' and '_', got '{}'",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Config {
        toml::from_str(content).unwrap()
    }

    const SOURCE: &str = r#"
[[source]]
name = "wg"
preset = "wg-gesucht"
urls = ["https://www.wg-gesucht.de/wg-zimmer-in-Berlin.8.0.1.0.html"]
"#;

    #[test]
    fn test_minimal_config_is_valid() {
        let config = parse(SOURCE);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_no_sources() {
        let config = parse("[crawler]\nresult-limit = 10\n");
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_result_limit_zero() {
        let config = parse(&format!("[crawler]\nresult-limit = 0\n{}", SOURCE));
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_fetch_attempts_bounds() {
        let config = parse(&format!("[crawler]\nfetch-attempts = 0\n{}", SOURCE));
        assert!(validate(&config).is_err());

        let config = parse(&format!("[crawler]\nfetch-attempts = 11\n{}", SOURCE));
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_inverted_bounds() {
        let config = parse(&format!(
            "[filter]\nmin-price = 900.0\nmax-price = 500.0\n{}",
            SOURCE
        ));
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_inverted_source_bounds() {
        let config = parse(&format!("{}[source.filter]\nmin-rooms = 3.0\nmax-rooms = 1.0\n", SOURCE));
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_source_name() {
        let config = parse(&format!("{}{}", SOURCE, SOURCE));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_invalid_source_name() {
        let config = parse(&SOURCE.replace("name = \"wg\"", "name = \"WG Gesucht\""));
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_source_without_urls() {
        let config = parse(
            r#"
[[source]]
name = "wg"
preset = "wg-gesucht"
"#,
        );
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_non_http_url() {
        let config = parse(&SOURCE.replace("https://www.wg-gesucht.de", "ftp://www.wg-gesucht.de"));
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_invalid_selector() {
        let config = parse(
            r#"
[[source]]
name = "custom"
urls = ["https://flats.example.org/search"]
[source.html]
item = "article[["
[source.html.id]
selector = "article"
attrs = ["data-id"]
"#,
        );
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_unknown_date_format_specifier() {
        let config = parse(
            r#"
[[source]]
name = "custom"
urls = ["https://flats.example.org/search"]
[source.html]
item = "article"
date-format = "%Q"
[source.html.id]
attrs = ["data-id"]
"#,
        );
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("date-format"));
    }

    #[test]
    fn test_invalid_webhook() {
        let config = parse(&format!("[notify]\nwebhook-url = \"not a url\"\n{}", SOURCE));
        assert!(validate(&config).is_err());
    }
}
