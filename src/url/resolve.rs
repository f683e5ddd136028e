use crate::{UrlError, UrlResult};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Schemes that never lead to a crawlable resource
const SKIPPED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Name used for a node whose URL path has no usable last segment
const ROOT_DISPLAY_NAME: &str = "Home";

/// Fallback stem for a PDF URL whose path ends in a slash
const FALLBACK_PDF_STEM: &str = "document";

fn year_pattern() -> &'static Regex {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"\d{4}").expect("static year pattern"))
}

/// Parses an absolute http(s) URL, dropping any fragment
///
/// # Examples
///
/// ```
/// use tally_trawl::url::parse_absolute;
///
/// let url = parse_absolute("https://www.nj.gov/state/elections/index.shtml#top").unwrap();
/// assert_eq!(url.as_str(), "https://www.nj.gov/state/elections/index.shtml");
/// ```
pub fn parse_absolute(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves an href against the page it was found on
///
/// Returns None if the link should be excluded:
/// - empty and fragment-only hrefs
/// - javascript:, mailto:, tel: and data: links
/// - hrefs that fail to resolve or resolve to a non-HTTP(S) URL
///
/// The fragment is dropped so `a.shtml#x` and `a.shtml` share one graph node.
pub fn resolve_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }

    absolute.set_fragment(None);
    Some(absolute)
}

/// Extracts the first run of four digits from the URL's path and query
///
/// The host and port are skipped so a server on port 8080 does not file
/// every PDF under "8080".
pub fn extract_year(url: &Url) -> Option<String> {
    let tail = match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    };

    year_pattern().find(&tail).map(|m| m.as_str().to_string())
}

/// Derives the on-disk file name for a PDF URL
///
/// Uses the last path segment and appends `.pdf` when it is missing.
pub fn pdf_file_name(url: &Url) -> String {
    let stem = last_segment(url).unwrap_or(FALLBACK_PDF_STEM);

    if stem.to_ascii_lowercase().ends_with(".pdf") {
        stem.to_string()
    } else {
        format!("{}.pdf", stem)
    }
}

/// Name shown for a URL's node in the crawl graph
pub fn display_name(url: &Url) -> String {
    last_segment(url).unwrap_or(ROOT_DISPLAY_NAME).to_string()
}

fn last_segment(url: &Url) -> Option<&str> {
    url.path_segments()
        .and_then(|segments| segments.last())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
}
