//! Output module for the crawl's outward-facing views
//!
//! This module handles:
//! - The immutable run snapshot the engine publishes after every change
//! - The stats snapshot consumed by progress broadcasters
//! - The results view and its JSON export

mod results;
pub mod stats;

pub use results::{write_results_json, CrawlResults};
pub use stats::{format_statistics, RunCounters, RunSnapshot, StatsAggregator, StatsSnapshot};
