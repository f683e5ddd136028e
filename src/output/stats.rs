//! Statistics derived from engine state
//!
//! The engine publishes a `RunSnapshot` after each state change; everything
//! in this module reads those snapshots and never touches live crawl state.

use crate::crawler::RunControl;
use crate::graph::GraphSnapshot;
use crate::state::{NodeStatus, RunStatus};
use crate::storage::PdfRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Counters for a single run; reset at every start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub pages_crawled: u64,
    pub pages_failed: u64,
    pub pdfs_found: u64,

    /// PDFs fetched and written during this run (pre-existing files excluded)
    pub pdfs_downloaded: u64,
    pub pdfs_failed: u64,
}

/// Immutable view of one run, as last published by the engine
#[derive(Debug, Clone, Default)]
pub struct RunSnapshot {
    pub counters: RunCounters,
    pub current_url: String,
    pub frontier_size: usize,
    pub graph: GraphSnapshot,
    pub visited_urls: Vec<String>,
    pub pdf_records: Vec<PdfRecord>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Point-in-time progress report for external consumers
///
/// The field names are the wire format of the live progress feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub status: RunStatus,
    pub pages_crawled: u64,
    pub pages_failed: u64,
    pub pdfs_found: u64,
    pub pdfs_downloaded: u64,
    pub pdfs_failed: u64,
    pub frontier_size: usize,
    pub current_url: String,
    pub rate_limit_seconds: f64,
    pub updated_at: Option<DateTime<Utc>>,
    pub link_tree: GraphSnapshot,
}

impl StatsSnapshot {
    /// Combines a published run with the live run status and rate limit
    pub fn from_run(run: &RunSnapshot, status: RunStatus, rate_limit: Duration) -> Self {
        Self {
            status,
            pages_crawled: run.counters.pages_crawled,
            pages_failed: run.counters.pages_failed,
            pdfs_found: run.counters.pdfs_found,
            pdfs_downloaded: run.counters.pdfs_downloaded,
            pdfs_failed: run.counters.pdfs_failed,
            frontier_size: run.frontier_size,
            current_url: run.current_url.clone(),
            rate_limit_seconds: rate_limit.as_secs_f64(),
            updated_at: run.updated_at,
            link_tree: run.graph.clone(),
        }
    }

    /// Number of graph nodes currently in `status`
    pub fn nodes_with_status(&self, status: NodeStatus) -> usize {
        self.link_tree
            .nodes
            .iter()
            .filter(|n| n.status == status)
            .count()
    }
}

/// Builds stats snapshots from the engine's published state
///
/// Cheap to clone; any number of readers can hold one.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    control: Arc<RunControl>,
    feed: watch::Receiver<Arc<RunSnapshot>>,
}

impl StatsAggregator {
    pub fn new(control: Arc<RunControl>, feed: watch::Receiver<Arc<RunSnapshot>>) -> Self {
        Self { control, feed }
    }

    /// Latest run snapshot; zeroed before the first run
    pub fn latest_run(&self) -> Arc<RunSnapshot> {
        self.feed.borrow().clone()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let run = self.latest_run();
        StatsSnapshot::from_run(&run, self.control.status(), self.control.rate_limit())
    }

    /// Waits until the engine publishes again
    ///
    /// Returns false once the publishing side is gone.
    pub async fn changed(&mut self) -> bool {
        self.feed.changed().await.is_ok()
    }
}

/// Renders a short human-readable summary of a stats snapshot
pub fn format_statistics(stats: &StatsSnapshot) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Statistics ===\n");
    out.push_str(&format!("  Status: {}\n", stats.status));
    out.push_str(&format!(
        "  Pages crawled: {} ({} failed, {} queued)\n",
        stats.pages_crawled, stats.pages_failed, stats.frontier_size
    ));
    out.push_str(&format!(
        "  PDFs found: {} ({} downloaded, {} failed)\n",
        stats.pdfs_found, stats.pdfs_downloaded, stats.pdfs_failed
    ));
    out.push_str(&format!(
        "  Graph: {} nodes, {} links\n",
        stats.link_tree.nodes.len(),
        stats.link_tree.edges.len()
    ));
    out.push_str(&format!("  Rate limit: {:.2}s\n", stats.rate_limit_seconds));
    if !stats.current_url.is_empty() {
        out.push_str(&format!("  Current URL: {}\n", stats.current_url));
    }

    out
}
