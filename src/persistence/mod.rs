//! Persistence implementations for the pdcrypt library
//!
//! Records are persisted as encrypted JSON text blobs keyed by user id. Files
//! are persisted as opaque encrypted containers keyed by path. It includes:
//!
//! - in-memory record and file stores for testing
//! - a filesystem file store backed by `tokio::fs`
//! - a function adapter for custom record backends

mod fs;
mod functions;
mod memory;

pub use fs::FsFileStore;
pub use functions::RecordStoreFn;
pub use memory::{MemoryFileStore, MemoryRecordStore};
