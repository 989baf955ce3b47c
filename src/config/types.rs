use crate::extract::presets::Preset;
use crate::extract::{DetailRule, HtmlLayout, JsonLayout};
use crate::filter::FilterCriteria;
use crate::url::Pagination;
use serde::Deserialize;
use std::path::PathBuf;

/// Default notification template, placeholders are listing field names
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    "{title}\nZimmer: {rooms}\nGröße: {size}\nPreis: {price}\n\n{url}";

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Pagination, fetch and scheduling settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// User agent rotation pool
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,

    /// Seen-listing store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Global filter criteria, applied to every source
    #[serde(default)]
    pub filter: FilterCriteria,

    #[serde(default)]
    pub message: MessageConfig,

    #[serde(default)]
    pub notify: NotifyConfig,

    /// Sources to watch
    #[serde(rename = "source", default)]
    pub sources: Vec<SourceConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Hard ceiling on listings gathered per crawl
    #[serde(rename = "result-limit", default = "default_result_limit")]
    pub result_limit: u32,

    /// Page bound applied to sources that do not set their own
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Hard ceiling on pages per crawl
    #[serde(rename = "page-ceiling", default = "default_page_ceiling")]
    pub page_ceiling: u32,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Attempts per page fetch, including the first
    #[serde(rename = "fetch-attempts", default = "default_fetch_attempts")]
    pub fetch_attempts: u32,

    /// Fixed delay between fetch attempts in milliseconds
    #[serde(rename = "retry-delay", default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Seconds between two passes over all sources
    #[serde(rename = "loop-period", default = "default_loop_period")]
    pub loop_period: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            result_limit: default_result_limit(),
            max_pages: None,
            page_ceiling: default_page_ceiling(),
            request_timeout: default_request_timeout(),
            fetch_attempts: default_fetch_attempts(),
            retry_delay: default_retry_delay(),
            loop_period: default_loop_period(),
        }
    }
}

fn default_result_limit() -> u32 {
    50
}

fn default_page_ceiling() -> u32 {
    20
}

fn default_request_timeout() -> u64 {
    30
}

fn default_fetch_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5000
}

fn default_loop_period() -> u64 {
    600
}

/// User agent rotation pool
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAgentConfig {
    /// Agents used in turn; empty means the built-in desktop browser pool
    #[serde(default)]
    pub agents: Vec<String>,
}

/// Seen-store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    /// One SQLite database file for all sources
    #[default]
    Sqlite,

    /// One JSON file per source inside a directory
    Json,
}

/// Seen-store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database file (sqlite) or directory (json)
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("flatwatch.db")
}

/// Notification message configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MessageConfig {
    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
        }
    }
}

fn default_template() -> String {
    DEFAULT_MESSAGE_TEMPLATE.to_string()
}

/// Notification delivery configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifyConfig {
    /// Incoming-webhook URL; listings are only logged when unset
    #[serde(rename = "webhook-url", default)]
    pub webhook_url: Option<String>,
}

/// One `[[source]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Store partition key and log label
    pub name: String,

    /// Built-in site layout
    #[serde(default)]
    pub preset: Option<Preset>,

    /// Custom HTML result-list layout
    #[serde(default)]
    pub html: Option<HtmlLayout>,

    /// Custom embedded-JSON layout
    #[serde(default)]
    pub json: Option<JsonLayout>,

    /// Search URLs, already parameterized for the site
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Host pattern every search URL must match, e.g. `*.immowelt.de`
    #[serde(rename = "url-pattern", default)]
    pub url_pattern: Option<String>,

    #[serde(default)]
    pub pagination: Option<Pagination>,

    /// Fetch each accepted listing's page to read its availability date
    #[serde(rename = "fetch-details", default)]
    pub fetch_details: bool,

    #[serde(default)]
    pub details: Option<DetailRule>,

    #[serde(rename = "auto-submit", default)]
    pub auto_submit: bool,

    /// Narrows the global criteria for this source
    #[serde(default)]
    pub filter: Option<FilterCriteria>,
}

impl SourceConfig {
    /// Number of layouts declared by this source; exactly one is valid
    pub fn layout_count(&self) -> usize {
        [
            self.preset.is_some(),
            self.html.is_some(),
            self.json.is_some(),
        ]
        .iter()
        .filter(|declared| **declared)
        .count()
    }
}
