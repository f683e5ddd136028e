//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - The `Fetcher` seam the engine and PDF store talk to
//! - Per-request timeouts
//! - Error classification (timeout vs. transport vs. non-2xx status)

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

/// Maximum redirect hops followed for a single request
const MAX_REDIRECTS: usize = 10;

/// Transport-level failure; a non-2xx status is not a `FetchError`
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse<B> {
    pub status: u16,
    pub body: B,
}

impl<B> FetchResponse<B> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network access used by the crawl engine and the PDF store
///
/// Every call carries its own timeout so a single unresponsive resource
/// cannot stall a run.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a page body as text
    async fn get_text(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<FetchResponse<String>, FetchError>;

    /// Fetches a binary body (PDFs)
    async fn get_bytes(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<FetchResponse<Vec<u8>>, FetchError>;
}

/// Result of fetching a page, as the engine consumes it
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The server answered with a non-2xx status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Timeout, connection error or unreadable body
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use tally_trawl::config::UserAgentConfig;
/// use tally_trawl::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "TallyTrawl".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Format: CrawlerName/Version (+ContactURL; ContactEmail)
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// `Fetcher` backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?))
    }

    async fn send(&self, url: &str, timeout: Duration) -> Result<reqwest::Response, FetchError> {
        self.client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get_text(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<FetchResponse<String>, FetchError> {
        let response = self.send(url, timeout).await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| classify_error(url, e))?;
        Ok(FetchResponse { status, body })
    }

    async fn get_bytes(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<FetchResponse<Vec<u8>>, FetchError> {
        let response = self.send(url, timeout).await?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_error(url, e))?
            .to_vec();
        Ok(FetchResponse { status, body })
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Transport {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Fetches a page and folds every failure mode into a `FetchResult`
///
/// Non-success statuses and transport failures are logged here with the
/// offending URL; the caller only decides what the outcome means for the
/// crawl graph.
pub async fn fetch_page(fetcher: &dyn Fetcher, url: &str, timeout: Duration) -> FetchResult {
    match fetcher.get_text(url, timeout).await {
        Ok(response) if response.is_success() => FetchResult::Success {
            status_code: response.status,
            body: response.body,
        },
        Ok(response) => {
            tracing::warn!("Error fetching {}: status {}", url, response.status);
            FetchResult::HttpError {
                status_code: response.status,
            }
        }
        Err(e) => {
            tracing::warn!("Exception while fetching {}: {}", url, e);
            FetchResult::NetworkError {
                error: e.to_string(),
            }
        }
    }
}
