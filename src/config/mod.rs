//! Configuration module for Tally-Trawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use tally_trawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawl starts at: {}", config.crawler.start_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ClassifierConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

/// Smallest rate limit accepted from configuration or at runtime (seconds)
pub const MIN_RATE_LIMIT_SECONDS: f64 = 0.1;
