//! Byte-level storage under a root directory.
//!
//! This module provides:
//! - The [`ByteStore`] trait gateways read and write through
//! - [`FileStore`], a filesystem implementation with atomic writes
//! - Async helpers that move blocking store calls onto the tokio blocking pool
//! - Relative path validation and decomposition ([`paths`])

mod atomic;
mod file_store;
pub mod paths;

pub use file_store::FileStore;

use crate::error::Result;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Raw byte persistence keyed by relative paths.
///
/// All paths handed to a store are relative; only the store knows the
/// absolute location. A missing file is reported through `None` / `false`,
/// never as an error.
pub trait ByteStore: Send + Sync + Debug {
    /// Root directory every relative path is resolved against.
    fn root(&self) -> &Path;

    /// Absolute form of a relative path. No I/O.
    fn absolute_path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write `bytes`, creating missing parent directories.
    fn write(&self, relative: &str, bytes: &[u8]) -> Result<()>;

    /// Read the whole payload, `None` if there is no file.
    fn read(&self, relative: &str) -> Result<Option<Vec<u8>>>;

    /// Delete the file, returning whether one existed.
    fn delete(&self, relative: &str) -> Result<bool>;

    /// Whether a file exists at `relative`.
    fn exists(&self, relative: &str) -> bool;
}

/// Run [`ByteStore::write`] on the blocking pool.
pub async fn write_async(
    store: Arc<dyn ByteStore>,
    relative: String,
    bytes: Vec<u8>,
) -> Result<()> {
    tokio::task::spawn_blocking(move || store.write(&relative, &bytes)).await?
}

/// Run [`ByteStore::read`] on the blocking pool.
pub async fn read_async(store: Arc<dyn ByteStore>, relative: String) -> Result<Option<Vec<u8>>> {
    tokio::task::spawn_blocking(move || store.read(&relative)).await?
}
