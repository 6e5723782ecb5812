//! Filesystem-backed [`ByteStore`].

use super::atomic::{atomic_write, read_if_exists, remove_if_exists};
use super::paths::validate_relative;
use super::ByteStore;
use crate::config::default_storage_root;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores each relative path as one file under `root`.
///
/// Writes go through a temp file and an atomic rename. With backups enabled
/// the previous document is copied to `<file>.bak` before it is replaced.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    keep_backup: bool,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            keep_backup: false,
        }
    }

    /// Create a store at the platform default location.
    pub fn open_default() -> Result<Self> {
        let root = default_storage_root()?;
        debug!("Using default storage root {}", root.display());
        Ok(Self::new(root))
    }

    /// Keep a `.bak` copy of the previous document on every overwrite.
    pub fn with_backup(mut self, keep_backup: bool) -> Self {
        self.keep_backup = keep_backup;
        self
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        validate_relative(relative)?;
        Ok(self.root.join(relative))
    }
}

impl ByteStore for FileStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn write(&self, relative: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(relative)?;
        atomic_write(&path, bytes, self.keep_backup)
    }

    fn read(&self, relative: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve(relative)?;
        debug!("Reading {}", path.display());
        read_if_exists(&path)
    }

    fn delete(&self, relative: &str) -> Result<bool> {
        let path = self.resolve(relative)?;
        remove_if_exists(&path)
    }

    fn exists(&self, relative: &str) -> bool {
        match self.resolve(relative) {
            Ok(path) => path.is_file(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatagateError;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("storage"));
        (store, temp_dir)
    }

    #[test]
    fn test_write_read_delete() {
        let (store, _temp) = create_test_store();

        assert!(!store.exists("profile/settings.json"));
        store.write("profile/settings.json", b"{}").unwrap();
        assert!(store.exists("profile/settings.json"));
        assert_eq!(
            store.read("profile/settings.json").unwrap().as_deref(),
            Some(&b"{}"[..])
        );

        assert!(store.delete("profile/settings.json").unwrap());
        assert!(!store.exists("profile/settings.json"));
        assert!(!store.delete("profile/settings.json").unwrap());
        assert!(store.read("profile/settings.json").unwrap().is_none());
    }

    #[test]
    fn test_rejects_paths_outside_root() {
        let (store, _temp) = create_test_store();

        let err = store.write("../escape.json", b"{}").unwrap_err();
        assert!(matches!(err, DatagateError::InvalidPath { .. }));
        assert!(!store.exists("../escape.json"));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let (store, _temp) = create_test_store();

        store.write("nested/child.json", b"{}").unwrap();
        assert!(!store.exists("nested"));
    }

    #[test]
    fn test_backup_enabled() {
        let (store, _temp) = create_test_store();
        let store = store.with_backup(true);

        store.write("slot.json", b"one").unwrap();
        store.write("slot.json", b"two").unwrap();

        assert_eq!(store.read("slot.json.bak").unwrap().unwrap(), b"one");
        assert_eq!(store.read("slot.json").unwrap().unwrap(), b"two");
    }

    #[test]
    fn test_absolute_path() {
        let (store, temp) = create_test_store();
        assert_eq!(
            store.absolute_path("a/b.json"),
            temp.path().join("storage").join("a/b.json")
        );
    }
}
