//! Atomic file operations for byte payloads.
//!
//! Implements atomic writes using:
//! 1. Write to temp file with unique PID+TID suffix
//! 2. fsync to ensure data reaches disk
//! 3. Optional backup of the previous document
//! 4. Atomic rename to target path

use crate::config::StorageConfig;
use crate::error::{DatagateError, Result};
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use tracing::{debug, warn};

/// Read a whole file.
///
/// Returns `None` if the file doesn't exist.
pub fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DatagateError::Io {
            message: format!("Failed to read {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        }),
    }
}

/// Delete a file.
///
/// Returns `false` if there was nothing to delete.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Deleted {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DatagateError::Io {
            message: format!("Failed to delete {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        }),
    }
}

/// Write bytes to a file atomically.
///
/// Parent directories are created as needed; an already existing directory
/// is not an error, so concurrent writers under one folder are fine.
pub fn atomic_write(path: &Path, bytes: &[u8], keep_backup: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| DatagateError::Io {
            message: format!("Failed to create directory {}", parent.display()),
            path: Some(parent.to_path_buf()),
            source: Some(e),
        })?;
    }

    let temp_path = sibling_with_suffix(
        path,
        &format!("{}.{}.{}", process::id(), thread_id(), StorageConfig::TEMP_SUFFIX),
    );

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| DatagateError::Io {
                message: format!("Failed to create temp file {}", temp_path.display()),
                path: Some(temp_path.clone()),
                source: Some(e),
            })?;

        file.write_all(bytes).map_err(|e| DatagateError::Io {
            message: format!("Failed to write temp file {}", temp_path.display()),
            path: Some(temp_path.clone()),
            source: Some(e),
        })?;

        file.sync_all().map_err(|e| DatagateError::Io {
            message: format!("Failed to sync temp file {}", temp_path.display()),
            path: Some(temp_path.clone()),
            source: Some(e),
        })?;
    }

    if keep_backup && path.exists() {
        let backup_path = sibling_with_suffix(path, StorageConfig::BACKUP_SUFFIX);
        if let Err(e) = fs::copy(path, &backup_path) {
            // Backup failure is not fatal
            warn!("Failed to create backup {}: {}", backup_path.display(), e);
        } else {
            debug!("Created backup: {}", backup_path.display());
        }
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(DatagateError::Io {
            message: format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            path: Some(path.to_path_buf()),
            source: Some(e),
        });
    }

    debug!("Atomically wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// `dir/name.ext` -> `dir/name.ext.<suffix>`
pub(crate) fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Get a unique thread identifier.
fn thread_id() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    format!("{:?}", thread::current().id()).hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");

        atomic_write(&path, b"{\"a\": 1}", false).unwrap();
        assert!(path.exists());

        let bytes = read_if_exists(&path).unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"{\"a\": 1}"[..]));
    }

    #[test]
    fn test_atomic_write_creates_backup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");

        atomic_write(&path, b"first", true).unwrap();
        atomic_write(&path, b"second", true).unwrap();

        let backup_path = temp_dir.path().join("test.json.bak");
        assert_eq!(read_if_exists(&backup_path).unwrap().unwrap(), b"first");
        assert_eq!(read_if_exists(&path).unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.json");

        atomic_write(&path, b"payload", false).unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("test.json")]);
    }

    #[test]
    fn test_read_and_remove_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.json");

        assert!(read_if_exists(&path).unwrap().is_none());
        assert!(!remove_if_exists(&path).unwrap());
    }

    #[test]
    fn test_atomic_write_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("test.json");

        atomic_write(&path, b"nested", false).unwrap();
        assert!(path.exists());

        // Second writer into the same, now existing, folder
        let sibling = temp_dir.path().join("nested").join("dir").join("other.json");
        atomic_write(&sibling, b"other", false).unwrap();
        assert!(sibling.exists());
    }

    #[test]
    fn test_sibling_with_suffix() {
        let path = Path::new("/data/saves/slot.json");
        assert_eq!(
            sibling_with_suffix(path, "bak"),
            PathBuf::from("/data/saves/slot.json.bak")
        );
    }
}
