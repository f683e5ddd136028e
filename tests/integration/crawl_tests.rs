//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, with PDFs written to a temp directory.

use std::path::Path;
use std::time::Duration;
use tally_trawl::config::{ClassifierConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use tally_trawl::output::{write_results_json, CrawlResults};
use tally_trawl::storage::PdfState;
use tally_trawl::{Crawler, NodeKind, NodeStatus, RunStatus};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PDF_BODY: &[u8] = b"%PDF-1.7 official results";

/// Creates a test configuration crawling from `start_url` into `pdf_root`
fn create_test_config(start_url: &str, pdf_root: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            start_url: start_url.to_string(),
            rate_limit_seconds: 0.1,
            request_timeout_seconds: 5,
            pause_poll_millis: 10,
        },
        classifier: ClassifierConfig::default(),
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            pdf_root: pdf_root.display().to_string(),
            results_path: None,
        },
    }
}

/// Wraps hrefs in the results table the classifier looks for
fn results_page(hrefs: &[&str]) -> String {
    let rows: String = hrefs
        .iter()
        .map(|h| format!("<tr><td><a href=\"{}\">{}</a></td></tr>", h, h))
        .collect();
    format!(
        r#"<html><head><title>Election Results</title></head><body>
        <nav><a href="/elections/nav-election.shtml">Elections</a></nav>
        <table class="table table-hover"><tbody>{}</tbody></table>
        </body></html>"#,
        rows
    )
}

async fn mount_page(server: &MockServer, route: &str, hrefs: &[&str]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(results_page(hrefs))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_pdf(server: &MockServer, route: &str, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(PDF_BODY)
                .insert_header("content-type", "application/pdf"),
        )
        .expect(expected_fetches)
        .mount(server)
        .await;
}

/// Start page -> 2022 PDF, 2023 page, offsite page; 2023 page -> 2023 PDF, missing PDF
async fn mount_site(server: &MockServer, expected_pdf_fetches: u64) {
    mount_page(
        server,
        "/elections/election-results.shtml",
        &[
            "2022/2022-general-election-results.pdf",
            "2023-primary-election.shtml",
            "https://offsite.example.org/2023-general-election.shtml",
        ],
    )
    .await;
    mount_page(
        server,
        "/elections/2023-primary-election.shtml",
        &[
            "2023/2023-primary-election-results.pdf",
            "2023/2023-general-election-missing.pdf",
            "election-results.shtml",
        ],
    )
    .await;
    mount_pdf(server, "/elections/2022/2022-general-election-results.pdf", expected_pdf_fetches).await;
    mount_pdf(server, "/elections/2023/2023-primary-election-results.pdf", expected_pdf_fetches).await;
}

fn start_url(server: &MockServer) -> String {
    format!("{}/elections/election-results.shtml", server.uri())
}

#[tokio::test]
async fn test_full_crawl_downloads_pdfs_by_year() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;
    let pdf_root = TempDir::new().unwrap();

    let crawler = Crawler::from_config(create_test_config(&start_url(&server), pdf_root.path())).unwrap();
    crawler.start().unwrap().await.unwrap();

    let stats = crawler.get_stats();
    assert_eq!(stats.status, RunStatus::Stopped);
    assert_eq!(stats.pages_crawled, 2);
    assert_eq!(stats.pages_failed, 0);
    assert_eq!(stats.pdfs_found, 3);
    assert_eq!(stats.pdfs_downloaded, 2);
    assert_eq!(stats.pdfs_failed, 1);

    let pdf_2022 = pdf_root.path().join("2022").join("2022-general-election-results.pdf");
    let pdf_2023 = pdf_root.path().join("2023").join("2023-primary-election-results.pdf");
    assert_eq!(std::fs::read(&pdf_2022).unwrap(), PDF_BODY);
    assert_eq!(std::fs::read(&pdf_2023).unwrap(), PDF_BODY);
    assert!(!pdf_root
        .path()
        .join("2023")
        .join("2023-general-election-missing.pdf")
        .exists());

    let start = start_url(&server);
    let page_2023 = format!("{}/elections/2023-primary-election.shtml", server.uri());
    let tree = &stats.link_tree;
    assert_eq!(tree.nodes.len(), 5);
    assert_eq!(tree.node(&start).unwrap().display_name, "Start Page");
    assert_eq!(tree.node(&page_2023).unwrap().status, NodeStatus::Visited);
    assert!(tree.has_edge(&start, &page_2023));
    assert!(tree.node("https://offsite.example.org/2023-general-election.shtml").is_none());
    assert!(tree
        .node(&format!("{}/elections/nav-election.shtml", server.uri()))
        .is_none());

    let missing = format!("{}/elections/2023/2023-general-election-missing.pdf", server.uri());
    let missing_node = tree.node(&missing).unwrap();
    assert_eq!(missing_node.kind, NodeKind::Pdf);
    assert_eq!(missing_node.status, NodeStatus::Failed);

    let results = crawler.get_results();
    assert_eq!(results.visited_urls, vec![start, page_2023]);
    assert_eq!(results.pdf_urls.len(), 3);
    let failed: Vec<_> = results
        .pdf_records
        .iter()
        .filter(|r| r.state == PdfState::Failed)
        .map(|r| r.url.as_str())
        .collect();
    assert_eq!(failed, vec![missing.as_str()]);
}

#[tokio::test]
async fn test_rerun_does_not_refetch_existing_pdfs() {
    let server = MockServer::start().await;
    // Each PDF must be requested exactly once across both runs
    mount_site(&server, 1).await;
    let pdf_root = TempDir::new().unwrap();

    let crawler = Crawler::from_config(create_test_config(&start_url(&server), pdf_root.path())).unwrap();
    crawler.start().unwrap().await.unwrap();
    assert_eq!(crawler.get_stats().pdfs_downloaded, 2);

    crawler.start().unwrap().await.unwrap();
    let second = crawler.get_stats();

    assert_eq!(second.pages_crawled, 2);
    assert_eq!(second.pdfs_found, 3);
    assert_eq!(second.pdfs_downloaded, 0);
    assert_eq!(second.nodes_with_status(NodeStatus::Downloaded), 2);
}

#[tokio::test]
async fn test_pdf_without_year_is_unsorted() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/elections/election-results.shtml",
        &["special-general-election-results.pdf"],
    )
    .await;
    mount_pdf(&server, "/elections/special-general-election-results.pdf", 1).await;
    let pdf_root = TempDir::new().unwrap();

    let crawler = Crawler::from_config(create_test_config(&start_url(&server), pdf_root.path())).unwrap();
    crawler.start().unwrap().await.unwrap();

    assert_eq!(crawler.get_stats().pdfs_downloaded, 1);
    assert!(pdf_root
        .path()
        .join("unsorted")
        .join("special-general-election-results.pdf")
        .exists());

    let record = &crawler.get_results().pdf_records[0];
    assert_eq!(record.year, None);
    assert_eq!(record.state, PdfState::Downloaded);
}

#[tokio::test]
async fn test_page_timeout_is_recorded_not_fatal() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/elections/election-results.shtml",
        &["2020-slow-election.shtml", "2021-fast-election.shtml"],
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/elections/2020-slow-election.shtml"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    mount_page(&server, "/elections/2021-fast-election.shtml", &[]).await;
    let pdf_root = TempDir::new().unwrap();

    let mut config = create_test_config(&start_url(&server), pdf_root.path());
    config.crawler.request_timeout_seconds = 1;
    let crawler = Crawler::from_config(config).unwrap();
    crawler.start().unwrap().await.unwrap();

    let stats = crawler.get_stats();
    assert_eq!(stats.pages_crawled, 3);
    assert_eq!(stats.pages_failed, 1);
    let slow = format!("{}/elections/2020-slow-election.shtml", server.uri());
    assert_eq!(stats.link_tree.node(&slow).unwrap().status, NodeStatus::Failed);
}

#[tokio::test]
async fn test_stop_prevents_further_requests() {
    let server = MockServer::start().await;
    mount_site(&server, 0).await;
    let pdf_root = TempDir::new().unwrap();

    let crawler = Crawler::from_config(create_test_config(&start_url(&server), pdf_root.path())).unwrap();
    crawler.set_rate_limit(1.0).unwrap();

    let handle = crawler.start().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(crawler.stop());
    assert_eq!(crawler.get_stats().status, RunStatus::Stopped);
    handle.await.unwrap();

    // The start page may have been fetched; nothing after it
    let requests = server.received_requests().await.unwrap();
    assert!(requests.len() <= 1, "unexpected requests: {}", requests.len());
    assert_eq!(crawler.get_stats().pdfs_downloaded, 0);
}

#[tokio::test]
async fn test_results_export() {
    let server = MockServer::start().await;
    mount_site(&server, 1).await;
    let pdf_root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let results_path = out.path().join("results.json");

    let crawler = Crawler::from_config(create_test_config(&start_url(&server), pdf_root.path())).unwrap();
    crawler.start().unwrap().await.unwrap();
    write_results_json(&crawler.get_results(), &results_path).unwrap();

    let written: CrawlResults =
        serde_json::from_str(&std::fs::read_to_string(&results_path).unwrap()).unwrap();
    assert_eq!(written, crawler.get_results());
    assert_eq!(written.link_tree.edges.len(), 4);
}
