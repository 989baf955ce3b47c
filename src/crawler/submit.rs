use crate::listing::{Applied, Listing};
use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Why an auto-submit attempt did not go through
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Listing {id} has no contact form")]
    NoForm { id: u64 },

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Submission rejected: {0}")]
    Rejected(String),
}

/// Best-effort contact/application form submission for a listing
///
/// Only the outcome is recorded on the listing; a failure never affects the crawl.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, listing: &Listing) -> Result<(), SubmitError>;
}

/// Submits `listing` and records the outcome in its `applied` field
pub async fn submit_and_record(submitter: &dyn Submitter, listing: &mut Listing) {
    listing.applied = match submitter.submit(listing).await {
        Ok(()) => Applied::Yes,
        Err(e) => {
            warn!("[{}] Auto-submit for {} failed: {}", listing.source, listing.id, e);
            Applied::No
        }
    };
}
