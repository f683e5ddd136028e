use crate::storage::traits::{FileSystem, StoreError, StoreResult};
use async_trait::async_trait;
use std::path::Path;

/// `FileSystem` backed by the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn ensure_dir(&self, path: &Path) -> StoreResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|source| StoreError::CreateDir {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> StoreResult<()> {
        // Only a complete file may ever appear at `path`
        let mut partial = path.as_os_str().to_owned();
        partial.push(".part");
        let partial = std::path::PathBuf::from(partial);

        let write_err = |source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Err(e) = tokio::fs::write(&partial, bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(write_err(e));
        }

        tokio::fs::rename(&partial, path).await.map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("2021").join("deep");
        let fs = LocalFileSystem::new();

        fs.ensure_dir(&nested).await.unwrap();
        fs.ensure_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_write_then_exists() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("results.pdf");
        let fs = LocalFileSystem::new();

        assert!(!fs.exists(&target).await);
        fs.write_bytes(&target, b"%PDF-1.4").await.unwrap();

        assert!(fs.exists(&target).await);
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.4");
        assert!(!dir.path().join("results.pdf.part").exists());
    }

    #[tokio::test]
    async fn test_write_into_missing_dir_fails() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("results.pdf");
        let fs = LocalFileSystem::new();

        let err = fs.write_bytes(&target, b"x").await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(!fs.exists(&target).await);
    }
}
