//! Relative path validation and decomposition.

use crate::error::{DatagateError, Result};
use std::path::{Component, Path};

/// Check that `path` is a usable key under a storage root.
///
/// Rejects empty paths, absolute paths, drive prefixes and any `..`
/// component, so a resolved path can never leave the root.
pub fn validate_relative(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(DatagateError::invalid_path(path, "path is empty"));
    }

    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(DatagateError::invalid_path(
                    path,
                    "escapes the storage root",
                ));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(DatagateError::invalid_path(path, "must be relative"));
            }
        }
    }

    if Path::new(path).file_name().is_none() {
        return Err(DatagateError::invalid_path(path, "does not name a file"));
    }

    Ok(())
}

/// Validate `path` and return its canonical key.
///
/// `.` components and repeated separators are dropped and the remaining
/// components are joined with `/`, so `"./saves//a.json"` and
/// `"saves/a.json"` produce the same key.
pub fn normalize_relative(path: &str) -> Result<String> {
    validate_relative(path)?;

    let parts: Vec<&str> = Path::new(path)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}

/// File name without its extension (`"saves/slot1.json"` -> `"slot1"`).
pub fn file_stem(path: &str) -> Option<&str> {
    Path::new(path).file_stem().and_then(|s| s.to_str())
}

/// Extension without the leading dot (`"saves/slot1.json"` -> `"json"`).
pub fn extension(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|s| s.to_str())
}

/// Build a relative path from a folder and a file name.
pub fn join(folder: &str, file: &str) -> String {
    if folder.is_empty() {
        return file.to_string();
    }
    Path::new(folder).join(file).to_string_lossy().into_owned()
}
