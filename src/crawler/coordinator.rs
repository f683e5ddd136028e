//! Crawler coordinator - the control surface of the crawl engine
//!
//! A `Crawler` is a cheap, cloneable handle. It exposes the operations a
//! control plane needs:
//! - `start`, `stop`, `pause`, `resume` and `set_rate_limit`
//! - `get_stats` and `get_results`, callable at any time
//! - `subscribe` for the live snapshot feed
//!
//! Every operation is a no-op when called in a state it does not apply to.

use crate::config::Config;
use crate::crawler::engine::{CrawlRun, RunState, Shared};
use crate::crawler::{Fetcher, HttpFetcher, LinkClassifier, RateLimiter, RunControl};
use crate::output::{CrawlResults, RunSnapshot, StatsAggregator, StatsSnapshot};
use crate::state::RunStatus;
use crate::storage::{FileSystem, LocalFileSystem};
use crate::url::parse_absolute;
use crate::TrawlError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle to the crawl engine
#[derive(Clone)]
pub struct Crawler {
    shared: Arc<Shared>,
}

impl Crawler {
    /// Creates a crawler over the given collaborators
    ///
    /// # Errors
    ///
    /// Fails if the start URL, results selector or rate limit in `config`
    /// is unusable.
    pub fn new(
        mut config: Config,
        fetcher: Arc<dyn Fetcher>,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self, TrawlError> {
        // Graph and frontier keys are serialized `Url`s; the seed must match
        config.crawler.start_url = parse_absolute(&config.crawler.start_url)?.to_string();
        let classifier = LinkClassifier::new(&config.classifier)?;

        let control = Arc::new(RunControl::new(
            Duration::ZERO,
            Duration::from_millis(config.crawler.pause_poll_millis),
        ));
        control.set_rate_limit(config.crawler.rate_limit_seconds)?;
        let (feed, _) = watch::channel(Arc::new(RunSnapshot::default()));

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                classifier,
                fetcher,
                fs,
                control,
                limiter: Mutex::new(RateLimiter::new()),
                feed,
            }),
        })
    }

    /// Creates a crawler that fetches over HTTP and writes to the local disk
    pub fn from_config(config: Config) -> Result<Self, TrawlError> {
        let fetcher = HttpFetcher::from_config(&config.user_agent)?;
        Self::new(config, Arc::new(fetcher), Arc::new(LocalFileSystem::new()))
    }

    /// Starts a fresh run on the current tokio runtime
    ///
    /// Frontier, graph, PDF records and counters are all reset. Returns
    /// None, changing nothing, if a run is already running or paused, or
    /// if a stopped run is still finishing its in-flight request.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        let generation = self.shared.control.begin_run()?;

        let config = &self.shared.config;
        let state = RunState::new(
            &config.crawler.start_url,
            &config.output.pdf_root,
            Arc::clone(&self.shared.fs),
        );
        self.shared.feed.send_replace(Arc::new(state.snapshot()));

        let run = CrawlRun::new(Arc::clone(&self.shared), generation, state);
        Some(tokio::spawn(run.run()))
    }

    /// Stops the current run at its next suspension point
    ///
    /// The status reads `Stopped` as soon as this returns; an in-flight
    /// request is allowed to finish but nothing new starts.
    pub fn stop(&self) -> bool {
        let stopped = self.shared.control.stop();
        if stopped {
            tracing::info!("Stop requested");
        }
        stopped
    }

    pub fn pause(&self) -> bool {
        let paused = self.shared.control.pause();
        if paused {
            tracing::info!("Pause requested");
        }
        paused
    }

    pub fn resume(&self) -> bool {
        let resumed = self.shared.control.resume();
        if resumed {
            tracing::info!("Resume requested");
        }
        resumed
    }

    /// Changes the delay between network operations
    ///
    /// Takes effect at the engine's next wait. Values below
    /// `MIN_RATE_LIMIT_SECONDS` are rejected and the old limit is kept.
    pub fn set_rate_limit(&self, seconds: f64) -> Result<(), TrawlError> {
        self.shared.control.set_rate_limit(seconds)?;
        tracing::info!("Rate limit set to {}s", seconds);
        Ok(())
    }

    pub fn status(&self) -> RunStatus {
        self.shared.control.status()
    }

    pub fn get_stats(&self) -> StatsSnapshot {
        let run = self.latest_run();
        StatsSnapshot::from_run(&run, self.status(), self.shared.control.rate_limit())
    }

    pub fn get_results(&self) -> CrawlResults {
        CrawlResults::from_run(&self.latest_run())
    }

    /// Receiver of the engine's snapshot feed
    pub fn subscribe(&self) -> watch::Receiver<Arc<RunSnapshot>> {
        self.shared.feed.subscribe()
    }

    pub fn stats_aggregator(&self) -> StatsAggregator {
        StatsAggregator::new(Arc::clone(&self.shared.control), self.subscribe())
    }

    fn latest_run(&self) -> Arc<RunSnapshot> {
        Arc::clone(&self.shared.feed.borrow())
    }
}
