use crate::graph::GraphSnapshot;
use crate::output::RunSnapshot;
use crate::storage::PdfRecord;
use crate::TrawlError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a run produced, as returned by `get_results`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlResults {
    /// Pages in the order they were visited
    pub visited_urls: Vec<String>,

    /// PDFs in the order they were discovered
    pub pdf_urls: Vec<String>,

    pub link_tree: GraphSnapshot,
    pub pdf_records: Vec<PdfRecord>,
}

impl CrawlResults {
    pub fn from_run(run: &RunSnapshot) -> Self {
        Self {
            visited_urls: run.visited_urls.clone(),
            pdf_urls: run.pdf_records.iter().map(|r| r.url.clone()).collect(),
            link_tree: run.graph.clone(),
            pdf_records: run.pdf_records.clone(),
        }
    }
}

/// Writes results as pretty-printed JSON, creating parent directories
pub fn write_results_json(results: &CrawlResults, path: &Path) -> Result<(), TrawlError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)?;
    Ok(())
}
