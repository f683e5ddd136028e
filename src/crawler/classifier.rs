//! Link classifier for election result pages
//!
//! Only anchors inside the page's results table are considered; site-wide
//! navigation is ignored. Each anchor is sorted into one of three buckets:
//!
//! - **PDF link**: href ends in the PDF extension AND contains a PDF keyword
//! - **Page link**: href ends in a page extension AND contains a page keyword
//! - **Ignored**: everything else (no node, no edge)
//!
//! Keyword matching is case-insensitive. Classification never touches the
//! crawl state; the engine decides what to do with the result.

use crate::config::ClassifierConfig;
use crate::url::resolve_href;
use crate::{ConfigError, ConfigResult};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// How a single href is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Page,
    Pdf,
    Ignored,
}

/// Links extracted from one page, absolute and deduplicated, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedLinks {
    pub page_links: Vec<String>,
    pub pdf_links: Vec<String>,
}

impl ClassifiedLinks {
    pub fn is_empty(&self) -> bool {
        self.page_links.is_empty() && self.pdf_links.is_empty()
    }
}

/// Compiled classification rules
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    table_selector: Selector,
    anchor_selector: Selector,
    pdf_extension: String,
    pdf_keywords: Vec<String>,
    page_extensions: Vec<String>,
    page_keywords: Vec<String>,
    same_host_only: bool,
}

impl LinkClassifier {
    /// Compiles the results-table selector and lowercases the match rules
    pub fn new(config: &ClassifierConfig) -> ConfigResult<Self> {
        let table_selector = Selector::parse(&config.results_selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("'{}': {:?}", config.results_selector, e))
        })?;
        let anchor_selector = Selector::parse("a[href]")
            .map_err(|e| ConfigError::InvalidSelector(format!("'a[href]': {:?}", e)))?;

        let lower = |items: &[String]| -> Vec<String> {
            items.iter().map(|s| s.to_lowercase()).collect()
        };

        Ok(Self {
            table_selector,
            anchor_selector,
            pdf_extension: config.pdf_extension.to_lowercase(),
            pdf_keywords: lower(&config.pdf_keywords),
            page_extensions: lower(&config.page_extensions),
            page_keywords: lower(&config.page_keywords),
            same_host_only: config.same_host_only,
        })
    }

    /// Classifies the anchors of the page's results table
    ///
    /// A page without a results table yields no links; that is not an error.
    ///
    /// # Example
    ///
    /// ```
    /// use tally_trawl::config::ClassifierConfig;
    /// use tally_trawl::crawler::LinkClassifier;
    /// use url::Url;
    ///
    /// let classifier = LinkClassifier::new(&ClassifierConfig::default()).unwrap();
    /// let base = Url::parse("https://www.nj.gov/state/elections/results.shtml").unwrap();
    /// let html = r#"<table class="table table-hover"><tr>
    ///     <td><a href="2022-general-election-results.pdf">2022</a></td>
    ///     <td><a href="2023-primary-election.shtml">2023</a></td>
    /// </tr></table>"#;
    ///
    /// let links = classifier.classify(html, &base);
    /// assert_eq!(links.pdf_links.len(), 1);
    /// assert_eq!(links.page_links.len(), 1);
    /// ```
    pub fn classify(&self, html: &str, base_url: &Url) -> ClassifiedLinks {
        let document = Html::parse_document(html);
        let mut links = ClassifiedLinks::default();

        let Some(table) = document.select(&self.table_selector).next() else {
            tracing::debug!("No results table on {}", base_url);
            return links;
        };

        let mut seen = HashSet::new();
        for anchor in table.select(&self.anchor_selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };

            let kind = self.classify_href(href);
            if kind == LinkKind::Ignored {
                continue;
            }

            let Some(absolute) = resolve_href(href, base_url) else {
                continue;
            };

            if kind == LinkKind::Page
                && self.same_host_only
                && absolute.host_str() != base_url.host_str()
            {
                tracing::debug!("Skipping off-site page link {}", absolute);
                continue;
            }

            let absolute = absolute.to_string();
            if !seen.insert(absolute.clone()) {
                continue;
            }

            match kind {
                LinkKind::Pdf => links.pdf_links.push(absolute),
                LinkKind::Page => links.page_links.push(absolute),
                LinkKind::Ignored => {}
            }
        }

        links
    }

    /// Classifies a raw href by its extension and keywords
    pub fn classify_href(&self, href: &str) -> LinkKind {
        let lowered = href.trim().to_lowercase();
        let target = strip_query_and_fragment(&lowered);

        if target.ends_with(&self.pdf_extension) {
            if self.pdf_keywords.iter().any(|k| lowered.contains(k.as_str())) {
                return LinkKind::Pdf;
            }
            return LinkKind::Ignored;
        }

        if self.page_extensions.iter().any(|ext| target.ends_with(ext.as_str()))
            && self.page_keywords.iter().any(|k| lowered.contains(k.as_str()))
        {
            return LinkKind::Page;
        }

        LinkKind::Ignored
    }
}

fn strip_query_and_fragment(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}
