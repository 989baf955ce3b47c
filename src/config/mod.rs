//! Configuration module for Flatwatch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use flatwatch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("flatwatch.toml")).unwrap();
//! println!("Watching {} sources", config.sources.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, MessageConfig, NotifyConfig, SourceConfig, StoreBackend, StoreConfig,
    UserAgentConfig, DEFAULT_MESSAGE_TEMPLATE,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, resolve_sources};
