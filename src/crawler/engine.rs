//! Crawl engine: the single worker that drives one run
//!
//! The engine owns its `RunState` outright. Controllers only flip flags on
//! `RunControl`, and readers only ever see the `RunSnapshot`s the engine
//! publishes on its watch channel.
//!
//! Suspension points are the rate-limit gate before every page fetch and
//! every PDF download, the checkpoint right after a page fetch returns, and
//! the checkpoint before each PDF link is processed.
//!
//! Snapshots are published right before each network request and before the
//! engine blocks on a pause or a rate-limit wait, so copies of the run state
//! are bounded by the request rate.

use crate::config::Config;
use crate::crawler::control::TaskSlot;
use crate::crawler::{fetch_page, FetchResult, Fetcher, Frontier, LinkClassifier, RateLimiter, RunControl};
use crate::graph::CrawlGraph;
use crate::output::{RunCounters, RunSnapshot};
use crate::state::{NodeKind, NodeStatus};
use crate::storage::{DownloadOutcome, FileSystem, PdfStore, Prepared};
use crate::url::display_name;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use url::Url;

/// Display name of the start URL's graph node
pub const START_NODE_NAME: &str = "Start Page";

/// Pages between two progress log lines
const PROGRESS_INTERVAL: u64 = 10;

/// Everything a crawler handle shares with the run it spawned
pub(crate) struct Shared {
    pub config: Config,
    pub classifier: LinkClassifier,
    pub fetcher: Arc<dyn Fetcher>,
    pub fs: Arc<dyn FileSystem>,
    pub control: Arc<RunControl>,

    /// Outlives each run, so a restart still waits out the previous request
    pub limiter: Mutex<RateLimiter>,
    pub feed: watch::Sender<Arc<RunSnapshot>>,
}

/// Mutable state of one run; a new run always starts from a fresh instance
pub struct RunState {
    start_url: String,
    frontier: Frontier,
    graph: CrawlGraph,
    pdfs: PdfStore,
    counters: RunCounters,
    current_url: String,
}

impl RunState {
    /// Seeds the frontier and graph with the start URL
    pub fn new(start_url: &str, pdf_root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        let mut frontier = Frontier::new();
        let mut graph = CrawlGraph::new();

        graph.upsert_node(start_url, NodeKind::Page, START_NODE_NAME, NodeStatus::Pending);
        if frontier.enqueue(start_url) {
            graph.set_status(start_url, NodeStatus::Queued);
        }

        Self {
            start_url: start_url.to_string(),
            frontier,
            graph,
            pdfs: PdfStore::new(pdf_root, fs),
            counters: RunCounters::default(),
            current_url: String::new(),
        }
    }

    /// Copies everything readers may look at
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            counters: self.counters,
            current_url: self.current_url.clone(),
            frontier_size: self.frontier.len(),
            graph: self.graph.snapshot(),
            visited_urls: self.frontier.visited_urls().to_vec(),
            pdf_records: self.pdfs.records().cloned().collect(),
            updated_at: Some(Utc::now()),
        }
    }

    /// Display name for a node created at `url`
    fn node_name(&self, url: &Url) -> String {
        if url.as_str() == self.start_url {
            START_NODE_NAME.to_string()
        } else {
            display_name(url)
        }
    }
}

/// How a run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    /// Frontier exhausted
    Completed,

    /// `stop()` observed, or the run was superseded
    Stopped,
}

/// One run of the engine, consumed by `run`
pub(crate) struct CrawlRun {
    shared: Arc<Shared>,
    generation: u64,
    state: RunState,
    timeout: Duration,

    /// State changed since the last publish
    dirty: bool,
    _slot: TaskSlot,
}

impl CrawlRun {
    pub fn new(shared: Arc<Shared>, generation: u64, state: RunState) -> Self {
        let timeout = Duration::from_secs(shared.config.crawler.request_timeout_seconds);
        let slot = TaskSlot::new(Arc::clone(&shared.control));
        Self {
            shared,
            generation,
            state,
            timeout,
            dirty: false,
            _slot: slot,
        }
    }

    /// Runs until the frontier is exhausted or the run is stopped
    pub async fn run(mut self) {
        let started = std::time::Instant::now();
        tracing::info!(
            "Starting crawl run {} at {}",
            self.generation,
            self.state.start_url
        );

        let mut last_progress = 0;
        let finish = loop {
            if !self.shared.control.is_current(self.generation) {
                break Finish::Stopped;
            }
            if self.state.frontier.is_empty() {
                break Finish::Completed;
            }

            if !self.gate().await {
                break Finish::Stopped;
            }

            let Some(url) = self.state.frontier.dequeue() else {
                continue;
            };
            self.visit(url).await;

            let crawled = self.state.counters.pages_crawled;
            if crawled >= last_progress + PROGRESS_INTERVAL {
                last_progress = crawled;
                tracing::info!(
                    "Progress: {} pages crawled, {} in frontier, {:.2} pages/sec",
                    crawled,
                    self.state.frontier.len(),
                    crawled as f64 / started.elapsed().as_secs_f64()
                );
            }
        };

        self.publish();
        match finish {
            Finish::Completed => {
                self.shared.control.finish_run(self.generation);
                tracing::info!("Crawling completed");
            }
            Finish::Stopped => tracing::info!("Crawler stopped by user"),
        }

        let c = self.state.counters;
        tracing::info!(
            "Crawl run {} finished: {} pages ({} failed), {} PDFs found, {} downloaded, {} failed in {:?}",
            self.generation,
            c.pages_crawled,
            c.pages_failed,
            c.pdfs_found,
            c.pdfs_downloaded,
            c.pdfs_failed,
            started.elapsed()
        );
    }

    /// Visits one dequeued page: fetch, classify, download PDFs, enqueue pages
    async fn visit(&mut self, url: String) {
        if !self.state.frontier.mark_visited(&url) {
            tracing::debug!("Skipping already visited URL: {}", url);
            return;
        }

        let Ok(page_url) = Url::parse(&url) else {
            tracing::warn!("Skipping unparseable frontier URL: {}", url);
            return;
        };

        self.state.counters.pages_crawled += 1;
        self.state.current_url = url.clone();
        let name = self.state.node_name(&page_url);
        self.state
            .graph
            .upsert_node(&url, NodeKind::Page, &name, NodeStatus::Visited);
        self.dirty = true;

        tracing::info!("Crawling: {}", url);
        self.before_request();
        let body = match fetch_page(self.shared.fetcher.as_ref(), &url, self.timeout).await {
            FetchResult::Success { body, .. } => body,
            FetchResult::HttpError { .. } | FetchResult::NetworkError { .. } => {
                self.state.counters.pages_failed += 1;
                self.state.graph.set_status(&url, NodeStatus::Failed);
                self.dirty = true;
                return;
            }
        };

        if !self.checkpoint().await {
            return;
        }

        let links = self.shared.classifier.classify(&body, &page_url);
        tracing::debug!(
            "Found {} PDF links and {} page links on {}",
            links.pdf_links.len(),
            links.page_links.len(),
            url
        );

        for pdf_url in &links.pdf_links {
            if !self.checkpoint().await {
                return;
            }
            if !self.handle_pdf(&url, pdf_url).await {
                return;
            }
        }

        for page_link in &links.page_links {
            self.handle_page_link(&url, page_link);
        }
    }

    /// Records and downloads one PDF link found on `source`
    ///
    /// Returns false if the run was stopped while waiting for the rate limit.
    async fn handle_pdf(&mut self, source: &str, pdf_url: &str) -> bool {
        if !self.state.pdfs.enqueue(pdf_url) {
            self.state.graph.add_edge(source, pdf_url);
            self.dirty = true;
            tracing::debug!("PDF already known this run: {}", pdf_url);
            return true;
        }

        let name = match Url::parse(pdf_url) {
            Ok(parsed) => display_name(&parsed),
            Err(_) => pdf_url.to_string(),
        };
        self.state
            .graph
            .upsert_node(pdf_url, NodeKind::Pdf, &name, NodeStatus::Queued);
        self.state.graph.add_edge(source, pdf_url);
        self.state.counters.pdfs_found += 1;
        self.dirty = true;
        tracing::info!("Found PDF: {}", pdf_url);

        // Files already on disk are resolved without a request
        let download = match self.state.pdfs.prepare(pdf_url).await {
            Prepared::Ready(download) => download,
            Prepared::Fetch(pending) => {
                if !self.gate().await {
                    return false;
                }
                self.before_request();
                self.state
                    .pdfs
                    .fetch(self.shared.fetcher.as_ref(), pending, self.timeout)
                    .await
            }
        };

        let status = match download.outcome {
            DownloadOutcome::Saved { .. } => {
                self.state.counters.pdfs_downloaded += 1;
                NodeStatus::Downloaded
            }
            DownloadOutcome::Skipped => NodeStatus::Downloaded,
            DownloadOutcome::Failed { .. } => {
                self.state.counters.pdfs_failed += 1;
                NodeStatus::Failed
            }
        };
        self.state.graph.set_status(pdf_url, status);
        self.dirty = true;
        true
    }

    fn handle_page_link(&mut self, source: &str, target: &str) {
        if self.state.frontier.is_visited(target) {
            tracing::debug!("Ignoring link to visited page: {}", target);
            return;
        }

        let name = match Url::parse(target) {
            Ok(parsed) => self.state.node_name(&parsed),
            Err(_) => target.to_string(),
        };
        self.state
            .graph
            .upsert_node(target, NodeKind::Page, &name, NodeStatus::Queued);
        self.state.graph.add_edge(source, target);
        self.state.frontier.enqueue(target);
        self.dirty = true;
    }

    /// Waits until the run may start its next network operation
    ///
    /// Blocks while paused, then until a full rate-limit interval has passed
    /// since the previous operation started. The limit is re-read on every
    /// iteration so a change applies to the wait in progress. The caller
    /// must call `before_request` right before issuing the request.
    ///
    /// Returns false once the run has been stopped.
    async fn gate(&mut self) -> bool {
        let control = Arc::clone(&self.shared.control);
        loop {
            if !self.checkpoint().await {
                return false;
            }

            let wait = self
                .limiter()
                .remaining(control.rate_limit(), Instant::now());
            if wait.is_zero() {
                return true;
            }

            self.flush();
            control
                .sleep_interruptible(wait.min(control.pause_poll()))
                .await;
        }
    }

    /// Pause checkpoint; readers get the current state before it blocks
    async fn checkpoint(&mut self) -> bool {
        let control = Arc::clone(&self.shared.control);
        control.checkpoint(self.generation, || self.flush()).await
    }

    /// Publishes pending changes and stamps the request start
    ///
    /// Must be the last thing before the fetcher is called: the next request
    /// is held back a full interval from this instant.
    fn before_request(&mut self) {
        self.flush();
        self.limiter().mark(Instant::now());
    }

    fn limiter(&self) -> std::sync::MutexGuard<'_, RateLimiter> {
        self.shared
            .limiter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publishes the state if it changed since the last publish
    fn flush(&mut self) {
        if self.dirty {
            self.publish();
            self.dirty = false;
        }
    }

    /// Replaces the published snapshot, unless a newer run owns the feed
    fn publish(&self) {
        let snapshot = Arc::new(self.state.snapshot());
        let control = &self.shared.control;
        let generation = self.generation;

        // Checked under the channel's write lock; `start()` bumps the
        // generation before it resets the feed.
        self.shared.feed.send_if_modified(|current| {
            if control.generation() != generation {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}
