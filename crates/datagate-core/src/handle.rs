//! Type-erased view of a gateway.
//!
//! The registry stores gateways of many value types side by side, and a host
//! inspector only needs the path and the I/O entry points, so both work
//! against `dyn DataHandle` instead of `Gateway<T>`.

use crate::error::Result;
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

/// Stable entry points of a gateway that do not depend on its value type.
///
/// Side effects:
/// - `save` writes the file only when a value is cached
/// - `read` replaces the cached value only when the file exists
/// - `unload` drops the cached value, never touches disk
/// - `remove` deletes the file, keeps the cached value
pub trait DataHandle: Send + Sync + 'static {
    /// Registry key and identity of the gateway.
    fn relative_path(&self) -> &str;

    fn absolute_path(&self) -> PathBuf;

    /// File name without extension.
    fn name(&self) -> &str;

    /// Extension without the leading dot.
    fn extension(&self) -> Option<&str>;

    fn exists(&self) -> bool;

    fn is_loaded(&self) -> bool;

    /// Write the cached value; `Ok(false)` when there is nothing to write.
    fn save(&self) -> Result<bool>;

    /// Reload from disk; `Ok(false)` when there is no file.
    fn read(&self) -> Result<bool>;

    fn unload(&self);

    /// Delete the file; `Ok(false)` when there was none.
    fn remove(&self) -> Result<bool>;

    /// Name of the cached value type, for diagnostics.
    fn value_type_name(&self) -> &'static str;

    /// Upcast used to recover the concrete `Gateway<T>`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
