use crate::config::SourceConfig;
use crate::extract::{DetailExtractor, Layout, ListingExtractor};
use crate::filter::FilterCriteria;
use crate::url::{extract_domain, matches_any, parse_http_url, Pagination};
use crate::{ConfigError, ConfigResult};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// A fully resolved source, ready to be crawled
///
/// Built once at startup from a `[[source]]` entry: the layout is compiled into an
/// extractor and every search URL is parsed and checked against the host patterns.
#[derive(Clone)]
pub struct SourceSpec {
    /// Store partition key
    pub name: String,

    pub extractor: Arc<dyn ListingExtractor>,

    /// Search URLs, crawled one after another
    pub urls: Vec<Url>,

    pub pagination: Pagination,

    /// Page bound overriding the global one
    pub max_pages: Option<u32>,

    /// Host patterns search URLs were checked against; empty allows any host
    pub host_patterns: Vec<String>,

    /// Detail-page reader used to enrich accepted listings
    pub details: Option<Arc<DetailExtractor>>,

    pub auto_submit: bool,

    /// Per-source criteria, evaluated after the global ones
    pub filter: Option<FilterCriteria>,
}

impl SourceSpec {
    /// Creates a single-page source without URLs, bounds or enrichment
    pub fn new(name: impl Into<String>, extractor: Arc<dyn ListingExtractor>) -> Self {
        Self {
            name: name.into(),
            extractor,
            urls: Vec::new(),
            pagination: Pagination::Single,
            max_pages: None,
            host_patterns: Vec::new(),
            details: None,
            auto_submit: false,
            filter: None,
        }
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.urls.push(url);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_filter(mut self, filter: FilterCriteria) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_details(mut self, details: DetailExtractor) -> Self {
        self.details = Some(Arc::new(details));
        self
    }

    pub fn with_auto_submit(mut self, auto_submit: bool) -> Self {
        self.auto_submit = auto_submit;
        self
    }

    /// Resolves a `[[source]]` entry
    ///
    /// # Arguments
    ///
    /// * `config` - The source entry from the configuration file
    ///
    /// # Returns
    ///
    /// * `Ok(SourceSpec)` - The compiled source
    /// * `Err(ConfigError)` - If the layout does not compile, a URL is invalid or does not
    ///   match the source's host patterns, or details are requested without a detail rule
    pub fn from_config(config: &SourceConfig) -> ConfigResult<Self> {
        let layout = match (&config.preset, &config.html, &config.json) {
            (Some(preset), None, None) => preset.layout(),
            (None, Some(html), None) => Layout::Html(html.clone()),
            (None, None, Some(json)) => Layout::Json(json.clone()),
            _ => {
                return Err(ConfigError::Validation(format!(
                    "source '{}' must declare exactly one of preset, html or json",
                    config.name
                )))
            }
        };
        let extractor = layout.build(&config.name)?;

        let pagination = config
            .pagination
            .clone()
            .or_else(|| config.preset.map(|preset| preset.pagination()))
            .unwrap_or_default();

        let host_patterns: Vec<String> = match (&config.url_pattern, &config.preset) {
            (Some(pattern), _) => vec![pattern.clone()],
            (None, Some(preset)) => preset
                .host_patterns()
                .iter()
                .map(|pattern| pattern.to_string())
                .collect(),
            (None, None) => Vec::new(),
        };

        let mut urls = Vec::with_capacity(config.urls.len());
        for raw in &config.urls {
            let url = parse_http_url(raw)?;
            let host = extract_domain(&url).unwrap_or_default();
            if !matches_any(&host_patterns, &host) {
                return Err(ConfigError::Validation(format!(
                    "URL '{}' of source '{}' does not match {:?}",
                    raw, config.name, host_patterns
                )));
            }
            urls.push(url);
        }

        let details = if config.fetch_details {
            let rule = config
                .details
                .clone()
                .or_else(|| config.preset.and_then(|preset| preset.details()))
                .ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "source '{}' sets fetch-details but has no details rule",
                        config.name
                    ))
                })?;
            Some(Arc::new(DetailExtractor::new(&rule)?))
        } else {
            None
        };

        Ok(Self {
            name: config.name.clone(),
            extractor,
            urls,
            pagination,
            max_pages: config.max_pages,
            host_patterns,
            details,
            auto_submit: config.auto_submit,
            filter: config.filter.clone(),
        })
    }
}

impl fmt::Debug for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSpec")
            .field("name", &self.name)
            .field("extractor", &self.extractor.source())
            .field("urls", &self.urls)
            .field("pagination", &self.pagination)
            .field("max_pages", &self.max_pages)
            .field("details", &self.details.is_some())
            .field("auto_submit", &self.auto_submit)
            .finish()
    }
}
