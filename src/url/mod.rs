//! URL handling module for Tally-Trawl
//!
//! This module resolves hrefs found on a page into absolute URLs and derives
//! the naming facts the crawl needs from a URL: the display name of its graph
//! node, the year bucket of a PDF and the PDF's on-disk file name.

mod resolve;

pub use resolve::{display_name, extract_year, parse_absolute, pdf_file_name, resolve_href};
