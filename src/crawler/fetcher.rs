//! HTTP fetcher implementation
//!
//! This module resolves a URL to page text for the crawler, including:
//! - Building HTTP clients with browser-like default headers
//! - Rotating user agents from an injected pool
//! - Bounded retries with a fixed delay for transient failures
//! - Detecting interactive verification pages
//!
//! The orchestrator only sees the [`PageFetcher`] contract, so tests and embedders can
//! swap the transport.

use crate::config::Config;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, USER_AGENT};
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Markers of bot-check pages served with a success status
const CHALLENGE_MARKERS: &[&str] = &["initGeetest", "g-recaptcha"];

/// Resolves a URL to raw page content
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, returning the page body or why it could not be obtained
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Round-robin pool of user agent strings
///
/// Shared by all crawls of a run; each request takes the next agent.
#[derive(Debug)]
pub struct UserAgentPool {
    agents: Vec<String>,
    next: AtomicUsize,
}

impl UserAgentPool {
    /// Creates a pool, falling back to [`UserAgentPool::default_agents`] when `agents` is empty
    pub fn new(agents: Vec<String>) -> Self {
        let agents = if agents.is_empty() {
            Self::default_agents()
        } else {
            agents
        };
        Self {
            agents,
            next: AtomicUsize::new(0),
        }
    }

    /// Built-in desktop browser agents
    pub fn default_agents() -> Vec<String> {
        [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
            "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
        ]
        .iter()
        .map(|agent| agent.to_string())
        .collect()
    }

    /// Returns the next agent in turn
    pub fn next_agent(&self) -> &str {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        &self.agents[index]
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Timeout and retry settings for page fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Bound on one request, connect included
    pub timeout: Duration,

    /// Attempts per URL, including the first
    pub attempts: u32,

    /// Fixed pause between attempts
    pub retry_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            attempts: 3,
            retry_delay: Duration::from_millis(5000),
        }
    }
}

impl FetchPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.crawler.request_timeout),
            attempts: config.crawler.fetch_attempts.max(1),
            retry_delay: Duration::from_millis(config.crawler.retry_delay),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `timeout` - Bound on a single request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("de-DE,de;q=0.9,en;q=0.8"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true if the page is an interactive verification step rather than content
pub fn is_challenge_page(body: &str) -> bool {
    CHALLENGE_MARKERS.iter().any(|marker| body.contains(marker))
}

/// [`PageFetcher`] backed by reqwest
pub struct HttpFetcher {
    client: Client,
    agents: Arc<UserAgentPool>,
    policy: FetchPolicy,
}

impl HttpFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `agents` - The shared user agent pool
    /// * `policy` - Timeout and retry settings
    pub fn new(agents: Arc<UserAgentPool>, policy: FetchPolicy) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(policy.timeout)?,
            agents,
            policy,
        })
    }

    /// Creates a fetcher from the `[crawler]` and `[user-agent]` sections
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let agents = Arc::new(UserAgentPool::new(config.user_agent.agents.clone()));
        Self::new(agents, FetchPolicy::from_config(config))
    }

    /// Performs a single GET request
    async fn fetch_once(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.agents.next_agent())
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| classify(url, e))?;

        if is_challenge_page(&body) {
            return Err(FetchError::Challenge {
                url: url.to_string(),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => {
                    debug!("Fetched {} ({} bytes, attempt {})", url, body.len(), attempt);
                    return Ok(body);
                }
                Err(e) if e.is_transient() && attempt < self.policy.attempts => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}, retrying in {:?}",
                        attempt, self.policy.attempts, url, e, self.policy.retry_delay
                    );
                    tokio::time::sleep(self.policy.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
