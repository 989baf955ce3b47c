//! Output module for accepted listings and run summaries
//!
//! This module handles:
//! - Rendering notification text from the configured template
//! - Delivering notifications through the log or a webhook
//! - Summarizing crawl passes and the seen store

mod message;
mod notifier;
pub mod stats;

pub use message::{render_message, MessageRenderer};
pub use notifier::{build_notifier, dispatch, LogNotifier, Notifier, WebhookNotifier};
pub use stats::{load_statistics, log_report, print_statistics, RunReport, StoreStatistics};
