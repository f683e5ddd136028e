use serde::Deserialize;

/// Main configuration structure for Tally-Trawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawl pacing and scope
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Page the traversal starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Minimum delay between consecutive network operations (seconds)
    #[serde(rename = "rate-limit-seconds", default = "default_rate_limit")]
    pub rate_limit_seconds: f64,

    /// Upper bound for a single page or PDF fetch (seconds)
    #[serde(rename = "request-timeout-seconds", default = "default_timeout")]
    pub request_timeout_seconds: u64,

    /// How often a paused run re-checks its control flags (milliseconds)
    #[serde(rename = "pause-poll-millis", default = "default_pause_poll")]
    pub pause_poll_millis: u64,
}

/// Link classification rules for the results table
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClassifierConfig {
    /// CSS selector identifying the single results table on a page
    pub results_selector: String,

    pub pdf_extension: String,

    /// A PDF href must contain one of these (case-insensitive)
    pub pdf_keywords: Vec<String>,

    pub page_extensions: Vec<String>,

    /// A page href must contain one of these (case-insensitive)
    pub page_keywords: Vec<String>,

    /// Drop page links that leave the host of the page they were found on
    pub same_host_only: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            results_selector: "table.table.table-hover".to_string(),
            pdf_extension: ".pdf".to_string(),
            pdf_keywords: vec![
                "-general-election".to_string(),
                "-primary-election".to_string(),
            ],
            page_extensions: vec![".shtml".to_string()],
            page_keywords: vec!["election".to_string()],
            same_host_only: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for downloaded PDFs (`<pdf-root>/<year>/<file>.pdf`)
    #[serde(rename = "pdf-root")]
    pub pdf_root: String,

    /// Where the results JSON is written when a run ends
    #[serde(rename = "results-path", default)]
    pub results_path: Option<String>,
}

fn default_rate_limit() -> f64 {
    1.0
}

fn default_timeout() -> u64 {
    30
}

fn default_pause_poll() -> u64 {
    250
}
