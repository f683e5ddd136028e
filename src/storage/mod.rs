//! Storage module for downloaded result PDFs
//!
//! This module handles all on-disk artifacts of a crawl, including:
//! - The `FileSystem` seam and its local implementation
//! - Year-bucketed placement of PDFs (`<pdf-root>/<year-or-unsorted>/<file>.pdf`)
//! - Per-URL download state and the skip-if-present idempotence rule

mod local;
mod pdf_store;
mod traits;

pub use local::LocalFileSystem;
pub use pdf_store::{
    Download, DownloadOutcome, PdfRecord, PdfState, PdfStore, PendingDownload, Prepared, UNSORTED_BUCKET,
};
pub use traits::{FileSystem, StoreError, StoreResult};
