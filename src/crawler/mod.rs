//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` seam
//! - Results-table link classification
//! - The deduplicated frontier and the shared rate limiter
//! - Run control flags and the single-worker crawl engine

mod classifier;
mod control;
mod coordinator;
mod engine;
mod fetcher;
mod frontier;
mod rate_limit;

pub use classifier::{ClassifiedLinks, LinkClassifier, LinkKind};
pub use control::RunControl;
pub use coordinator::Crawler;
pub use engine::{RunState, START_NODE_NAME};
pub use fetcher::{
    build_http_client, fetch_page, user_agent_string, FetchError, FetchResponse, FetchResult,
    Fetcher, HttpFetcher,
};
pub use frontier::Frontier;
pub use rate_limit::RateLimiter;
