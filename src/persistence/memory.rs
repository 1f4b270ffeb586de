use crate::error::{Error, Result};
use crate::{FileStore, RecordStore};

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, RwLock};

fn poisoned<T>(_: T) -> Error {
    Error::Store("memory store lock poisoned".into())
}

/// An in-memory implementation of the RecordStore trait
///
/// This implementation is meant for testing and should not be used in production.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    /// Map of user ID -> encrypted record JSON
    records: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryRecordStore {
    /// Creates a new MemoryRecordStore
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    /// Returns true if nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, user_id: &str) -> Result<Option<String>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(user_id).cloned())
    }

    async fn put(&self, user_id: &str, blob: &str) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(user_id.to_string(), blob.to_string());
        Ok(())
    }
}

/// An in-memory implementation of the FileStore trait
///
/// This implementation is meant for testing and should not be used in production.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    /// Map of path -> file bytes
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryFileStore {
    /// Creates a new MemoryFileStore
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.read().map_err(poisoned)?;
        files.get(path).cloned().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path),
            ))
        })
    }

    async fn write_bytes(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.write().map_err(poisoned)?;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }
}
