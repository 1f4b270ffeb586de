use crate::error::Result;
use crate::FileStore;

use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};

/// A FileStore that reads and writes files under a root directory
///
/// Relative paths are resolved against the root; absolute paths are used as-is.
#[derive(Debug, Clone)]
pub struct FsFileStore {
    root: PathBuf,
}

impl FsFileStore {
    /// Creates a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `path` against the store root
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(Path::new(path))
    }
}

impl Default for FsFileStore {
    fn default() -> Self {
        Self::new(".")
    }
}

#[async_trait]
impl FileStore for FsFileStore {
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path);
        debug!("Reading {}", full.display());
        Ok(tokio::fs::read(full).await?)
    }

    async fn write_bytes(&self, path: &str, data: &[u8]) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!("Writing {} bytes to {}", data.len(), full.display());
        Ok(tokio::fs::write(full, data).await?)
    }
}
