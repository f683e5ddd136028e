//! PDF store: placement, idempotent download and per-URL state
//!
//! Artifacts live at `<root>/<year>/<file>.pdf`, where the year is the first
//! four-digit run in the URL path. That layout is what makes downloads
//! idempotent across runs: a file already at its destination is never
//! fetched again.

use crate::crawler::Fetcher;
use crate::storage::traits::FileSystem;
use crate::url::{extract_year, parse_absolute, pdf_file_name};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Directory for PDFs whose URL carries no year
pub const UNSORTED_BUCKET: &str = "unsorted";

/// Download lifecycle of one PDF URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfState {
    Queued,
    Downloaded,
    Failed,
}

impl PdfState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued)
    }
}

/// What the store knows about one PDF URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfRecord {
    pub url: String,

    /// None when the URL carries no year (stored under `unsorted/`)
    pub year: Option<String>,

    /// None only when the URL could not be parsed
    pub local_path: Option<PathBuf>,

    pub state: PdfState,
}

/// How a download call was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Fetched from the network and written to disk
    Saved { bytes: usize },

    /// No network call: the file was already on disk or the URL already
    /// reached a terminal state earlier in this run
    Skipped,

    /// Fetch or write failed
    Failed { reason: String },
}

/// Result of `PdfStore::download`
#[derive(Debug, Clone)]
pub struct Download {
    pub record: PdfRecord,
    pub outcome: DownloadOutcome,
}

/// A PDF that needs a network fetch, with its destination resolved
#[derive(Debug)]
pub struct PendingDownload {
    url: String,
    path: PathBuf,
}

/// First half of a download: everything decidable without the network
#[derive(Debug)]
pub enum Prepared {
    /// Resolved without a request
    Ready(Download),

    /// Must be fetched; pass to `PdfStore::fetch`
    Fetch(PendingDownload),
}

/// Downloads and files result PDFs for one run
pub struct PdfStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    records: HashMap<String, PdfRecord>,

    /// Discovery order of `records`
    order: Vec<String>,
}

impl PdfStore {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
            records: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Computes the year bucket and destination of a PDF URL
    ///
    /// Returns None if the URL cannot be parsed.
    pub fn destination(&self, url: &str) -> Option<(Option<String>, PathBuf)> {
        let parsed = parse_absolute(url).ok()?;
        let year = extract_year(&parsed);
        let bucket = year.as_deref().unwrap_or(UNSORTED_BUCKET);
        let path = self.root.join(bucket).join(pdf_file_name(&parsed));
        Some((year, path))
    }

    /// Registers a newly discovered PDF as `Queued`
    ///
    /// Returns false if the URL is already known to this store.
    pub fn enqueue(&mut self, url: &str) -> bool {
        if self.records.contains_key(url) {
            return false;
        }

        let (year, local_path) = match self.destination(url) {
            Some((year, path)) => (year, Some(path)),
            None => (None, None),
        };

        self.order.push(url.to_string());
        self.records.insert(
            url.to_string(),
            PdfRecord {
                url: url.to_string(),
                year,
                local_path,
                state: PdfState::Queued,
            },
        );
        true
    }

    /// Downloads a PDF unless it is already on disk
    ///
    /// Never fails: every fetch or storage problem ends up as a `Failed`
    /// record and a log line. A URL that already reached `Downloaded` or
    /// `Failed` in this store is returned as-is without any I/O.
    pub async fn download(&mut self, fetcher: &dyn Fetcher, url: &str, timeout: Duration) -> Download {
        match self.prepare(url).await {
            Prepared::Ready(download) => download,
            Prepared::Fetch(pending) => self.fetch(fetcher, pending, timeout).await,
        }
    }

    /// Resolves a PDF as far as possible without touching the network
    ///
    /// Registers the URL if it is new. The engine waits out the rate limit
    /// between this and `fetch`.
    pub async fn prepare(&mut self, url: &str) -> Prepared {
        if let Some(record) = self.records.get(url) {
            if record.state.is_terminal() {
                return Prepared::Ready(Download {
                    record: record.clone(),
                    outcome: DownloadOutcome::Skipped,
                });
            }
        }
        self.enqueue(url);

        let Some((year, path)) = self.destination(url) else {
            return Prepared::Ready(self.fail(url, format!("Unparseable PDF URL: {}", url)));
        };

        if self.fs.exists(&path).await {
            tracing::debug!("PDF already present, skipping: {}", path.display());
            return Prepared::Ready(self.finish(url, PdfState::Downloaded, DownloadOutcome::Skipped));
        }

        if year.is_none() {
            tracing::warn!(
                "Could not extract year from URL: {}; filing under {}/",
                url,
                UNSORTED_BUCKET
            );
        }

        Prepared::Fetch(PendingDownload {
            url: url.to_string(),
            path,
        })
    }

    /// Fetches a prepared PDF and writes it to its destination
    ///
    /// The request is the first thing issued; no other I/O precedes it.
    pub async fn fetch(&mut self, fetcher: &dyn Fetcher, pending: PendingDownload, timeout: Duration) -> Download {
        let PendingDownload { url, path } = pending;

        let response = match fetcher.get_bytes(&url, timeout).await {
            Ok(response) => response,
            Err(e) => {
                return self.fail(&url, format!("Error downloading PDF {}: {}", url, e));
            }
        };

        if !response.is_success() {
            return self.fail(
                &url,
                format!("Failed to download PDF {}: status {}", url, response.status),
            );
        }

        if let Some(dir) = path.parent() {
            if let Err(e) = self.fs.ensure_dir(dir).await {
                return self.storage_failure(&url, e.to_string());
            }
        }

        if let Err(e) = self.fs.write_bytes(&path, &response.body).await {
            return self.storage_failure(&url, e.to_string());
        }

        tracing::info!("Successfully downloaded PDF: {}", path.display());
        self.finish(
            &url,
            PdfState::Downloaded,
            DownloadOutcome::Saved {
                bytes: response.body.len(),
            },
        )
    }

    #[cfg(test)]
    pub fn record(&self, url: &str) -> Option<&PdfRecord> {
        self.records.get(url)
    }

    /// All records in discovery order
    pub fn records(&self) -> impl Iterator<Item = &PdfRecord> {
        self.order.iter().filter_map(|url| self.records.get(url))
    }

    fn fail(&mut self, url: &str, reason: String) -> Download {
        tracing::warn!("{}", reason);
        self.finish(url, PdfState::Failed, DownloadOutcome::Failed { reason })
    }

    fn storage_failure(&mut self, url: &str, reason: String) -> Download {
        tracing::error!("Storage failure for PDF {}: {}", url, reason);
        self.finish(url, PdfState::Failed, DownloadOutcome::Failed { reason })
    }

    fn finish(&mut self, url: &str, state: PdfState, outcome: DownloadOutcome) -> Download {
        let record = match self.records.get_mut(url) {
            Some(record) => {
                record.state = state;
                record.clone()
            }
            None => PdfRecord {
                url: url.to_string(),
                year: None,
                local_path: None,
                state,
            },
        };
        Download { record, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{FetchError, FetchResponse};
    use crate::storage::{LocalFileSystem, StoreError, StoreResult};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Serves a fixed response for every PDF and counts requests
    struct StubFetcher {
        status: u16,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn ok() -> Self {
            Self { status: 200, fail: false, calls: AtomicUsize::new(0) }
        }

        fn status(status: u16) -> Self {
            Self { status, fail: false, calls: AtomicUsize::new(0) }
        }

        fn broken() -> Self {
            Self { status: 200, fail: true, calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn get_text(&self, url: &str, _: Duration) -> Result<FetchResponse<String>, FetchError> {
            Err(FetchError::Transport { url: url.to_string(), message: "pages not served".into() })
        }

        async fn get_bytes(&self, url: &str, _: Duration) -> Result<FetchResponse<Vec<u8>>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Timeout { url: url.to_string() });
            }
            Ok(FetchResponse { status: self.status, body: b"%PDF-1.7 results".to_vec() })
        }
    }

    /// Accepts everything except writes
    struct ReadOnlyFileSystem;

    #[async_trait]
    impl FileSystem for ReadOnlyFileSystem {
        async fn ensure_dir(&self, _: &Path) -> StoreResult<()> {
            Ok(())
        }

        async fn exists(&self, _: &Path) -> bool {
            false
        }

        async fn write_bytes(&self, path: &Path, _: &[u8]) -> StoreResult<()> {
            Err(StoreError::Write {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    fn store(dir: &TempDir) -> PdfStore {
        PdfStore::new(dir.path(), Arc::new(LocalFileSystem::new()))
    }

    #[tokio::test]
    async fn test_download_files_under_year() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let fetcher = StubFetcher::ok();

        let url = "https://www.nj.gov/state/elections/2021/results.pdf";
        let download = store.download(&fetcher, url, TIMEOUT).await;

        let expected = dir.path().join("2021").join("results.pdf");
        assert_eq!(download.record.state, PdfState::Downloaded);
        assert_eq!(download.record.year.as_deref(), Some("2021"));
        assert_eq!(download.record.local_path.as_deref(), Some(expected.as_path()));
        assert!(matches!(download.outcome, DownloadOutcome::Saved { .. }));
        assert_eq!(std::fs::read(&expected).unwrap(), b"%PDF-1.7 results");
    }

    #[tokio::test]
    async fn test_second_download_is_not_fetched() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let fetcher = StubFetcher::ok();
        let url = "https://www.nj.gov/2022-general-election-results.pdf";

        let first = store.download(&fetcher, url, TIMEOUT).await;
        let second = store.download(&fetcher, url, TIMEOUT).await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(first.record.state, PdfState::Downloaded);
        assert_eq!(second.record.state, PdfState::Downloaded);
        assert_eq!(second.outcome, DownloadOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_existing_file_skips_network_in_fresh_store() {
        let dir = TempDir::new().unwrap();
        let fetcher = StubFetcher::ok();
        let url = "https://www.nj.gov/2022-general-election-results.pdf";

        store(&dir).download(&fetcher, url, TIMEOUT).await;

        // A later run starts with an empty store but the same directory
        let mut next_run = store(&dir);
        assert!(matches!(
            next_run.prepare("https://www.nj.gov/2023-general-election-results.pdf").await,
            Prepared::Fetch(_)
        ));
        let Prepared::Ready(download) = next_run.prepare(url).await else {
            panic!("file on disk should resolve without a fetch");
        };

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(download.record.state, PdfState::Downloaded);
        assert_eq!(download.outcome, DownloadOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_missing_year_goes_to_unsorted() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let fetcher = StubFetcher::ok();

        let download = store
            .download(&fetcher, "https://www.nj.gov/special-general-election", TIMEOUT)
            .await;

        assert_eq!(download.record.year, None);
        assert_eq!(download.record.state, PdfState::Downloaded);
        assert!(dir
            .path()
            .join(UNSORTED_BUCKET)
            .join("special-general-election.pdf")
            .exists());
    }

    #[tokio::test]
    async fn test_non_success_status_marks_failed() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let fetcher = StubFetcher::status(404);
        let url = "https://www.nj.gov/2020/results.pdf";

        let download = store.download(&fetcher, url, TIMEOUT).await;

        assert_eq!(download.record.state, PdfState::Failed);
        assert!(matches!(download.outcome, DownloadOutcome::Failed { .. }));
        assert!(!dir.path().join("2020").join("results.pdf").exists());
    }

    #[tokio::test]
    async fn test_failed_url_is_not_retried_within_store() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let fetcher = StubFetcher::broken();
        let url = "https://www.nj.gov/2020/results.pdf";

        store.download(&fetcher, url, TIMEOUT).await;
        let again = store.download(&fetcher, url, TIMEOUT).await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(again.record.state, PdfState::Failed);
    }

    #[tokio::test]
    async fn test_write_failure_marks_failed() {
        let mut store = PdfStore::new("/pdfs", Arc::new(ReadOnlyFileSystem));
        let fetcher = StubFetcher::ok();

        let download = store
            .download(&fetcher, "https://www.nj.gov/2019/results.pdf", TIMEOUT)
            .await;

        assert_eq!(download.record.state, PdfState::Failed);
        assert_eq!(store.record("https://www.nj.gov/2019/results.pdf").unwrap().state, PdfState::Failed);
    }

    #[test]
    fn test_enqueue_tracks_discovery_order() {
        let mut store = PdfStore::new("/pdfs", Arc::new(ReadOnlyFileSystem));
        assert!(store.enqueue("https://www.nj.gov/2019/b.pdf"));
        assert!(store.enqueue("https://www.nj.gov/2018/a.pdf"));
        assert!(!store.enqueue("https://www.nj.gov/2019/b.pdf"));

        let urls: Vec<_> = store.records().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://www.nj.gov/2019/b.pdf", "https://www.nj.gov/2018/a.pdf"]);
        assert!(store.records().all(|r| r.state == PdfState::Queued));
    }
}
