use crate::config::Config;
use crate::listing::Listing;
use crate::output::message::MessageRenderer;
use crate::WatchError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Delivers one accepted listing
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `message`, the rendered text for `listing`
    async fn notify(&self, listing: &Listing, message: &str) -> Result<(), WatchError>;
}

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, listing: &Listing, message: &str) -> Result<(), WatchError> {
        tracing::info!("[{}] New listing {}:\n{}", listing.source, listing.id, message);
        Ok(())
    }
}

/// Posts notifications to an incoming webhook as `{"text": ...}`
#[derive(Debug)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, _listing: &Listing, message: &str) -> Result<(), WatchError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "text": message }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Notify(format!(
                "webhook responded with {}",
                status
            )));
        }
        Ok(())
    }
}

/// Builds the notifier the `[notify]` section asks for
pub fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>, WatchError> {
    Ok(match &config.notify.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_secs(config.crawler.request_timeout),
        )?),
        None => Arc::new(LogNotifier),
    })
}

/// Renders and sends every listing, in order
///
/// # Returns
///
/// The number of listings delivered; failed deliveries are logged and skipped.
pub async fn dispatch(
    notifier: &dyn Notifier,
    renderer: &MessageRenderer,
    listings: &[Listing],
) -> usize {
    let mut delivered = 0;
    for listing in listings {
        let message = renderer.render(listing);
        match notifier.notify(listing, &message).await {
            Ok(()) => delivered += 1,
            Err(e) => tracing::warn!(
                "[{}] Notification for {} failed: {}",
                listing.source,
                listing.id,
                e
            ),
        }
    }
    delivered
}
