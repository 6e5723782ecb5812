//! Centralized configuration for datagate.
//!
//! Constants for on-disk naming plus the platform default storage root.

use crate::error::{DatagateError, Result};
use std::path::PathBuf;

/// Storage-level configuration.
pub struct StorageConfig;

impl StorageConfig {
    /// Directory created under the platform data dir by `FileStore::open_default`.
    pub const APP_DIR_NAME: &'static str = "datagate";
    /// Suffix of the per-writer temp file used by atomic writes.
    pub const TEMP_SUFFIX: &'static str = "tmp";
    /// Suffix appended to the file name of a kept backup.
    pub const BACKUP_SUFFIX: &'static str = "bak";
}

/// Default storage root: `<data-local dir>/datagate`.
///
/// - **Linux**: `~/.local/share/datagate`
/// - **Windows**: `%LOCALAPPDATA%\datagate`
/// - **macOS**: `~/Library/Application Support/datagate`
pub fn default_storage_root() -> Result<PathBuf> {
    let base = dirs::data_local_dir().ok_or_else(|| DatagateError::Config {
        message: "Could not determine the local data directory".to_string(),
    })?;
    Ok(base.join(StorageConfig::APP_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_root_ends_with_app_dir() {
        // Headless CI boxes may lack a data dir; only check the shape when present.
        if let Ok(root) = default_storage_root() {
            assert!(root.ends_with(StorageConfig::APP_DIR_NAME));
        }
    }
}
