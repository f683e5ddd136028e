//! Storage traits and error types
//!
//! This module defines the trait interface for the file system the PDF
//! store writes through, and the associated error type.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// File system operations needed by the PDF store
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Creates `path` and any missing parents; succeeds if it already exists
    async fn ensure_dir(&self, path: &Path) -> StoreResult<()>;

    /// Returns true if a file exists at `path`
    async fn exists(&self, path: &Path) -> bool;

    /// Writes `bytes` to `path`, replacing any previous content
    ///
    /// Implementations must not leave a partial file at `path` on failure,
    /// since existence alone marks a PDF as downloaded.
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> StoreResult<()>;
}
