//! Per-path persistence gateway.
//!
//! A [`Gateway`] owns the cached value of one file and moves it between
//! memory and a [`ByteStore`] through an injected [`Codec`].
//!
//! # Load state
//!
//! The cache is an explicit two-state machine:
//!
//! ```text
//!   Unloaded --read/ensure_loaded--> Loaded(Some | None)
//!   Loaded   --unload--------------> Unloaded
//!   any      --overwrite-----------> Loaded(Some)
//! ```
//!
//! `Loaded(None)` means a load was attempted and no file existed. Nothing in
//! this module loads behind the caller's back: operations that need the value
//! (`get`, `with_value_ref`, `modify`) call [`Gateway::ensure_loaded`] first,
//! and that is the only implicit I/O.
//!
//! # Concurrency
//!
//! Each step holds the internal lock only for its own duration. Whole
//! operations on one gateway are not serialized against each other: a `read`
//! racing a `save` may observe either document, and a `modify` may be
//! interleaved with an `overwrite`. Callers that share one gateway between
//! tasks order their calls themselves.

use crate::codec::{Codec, JsonCodec};
use crate::error::{DatagateError, Result};
use crate::handle::DataHandle;
use crate::store::{self, paths, ByteStore};
use serde::{de::DeserializeOwned, Serialize};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

enum Slot<T> {
    Unloaded,
    Loaded(Option<T>),
}

impl<T> Slot<T> {
    fn value(&self) -> Option<&T> {
        match self {
            Slot::Loaded(Some(value)) => Some(value),
            _ => None,
        }
    }

    fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Slot::Loaded(Some(value)) => Some(value),
            _ => None,
        }
    }

    /// Apply a fetch result. A missing file keeps whatever was cached.
    fn install(&mut self, fetched: Option<T>) -> bool {
        match fetched {
            Some(value) => {
                *self = Slot::Loaded(Some(value));
                true
            }
            None => {
                if let Slot::Unloaded = self {
                    *self = Slot::Loaded(None);
                }
                false
            }
        }
    }
}

/// Gateway between one file and its in-memory value.
///
/// Identity is the relative path: two gateways are equal when they point at
/// the same path, whatever they hold in memory. Dropping a gateway never
/// touches disk.
pub struct Gateway<T> {
    relative_path: String,
    store: Arc<dyn ByteStore>,
    codec: Arc<dyn Codec<T>>,
    slot: RwLock<Slot<T>>,
}

impl<T> Gateway<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a gateway using [`JsonCodec`]. No I/O.
    pub fn new(relative_path: impl Into<String>, store: Arc<dyn ByteStore>) -> Result<Self> {
        Self::with_codec(relative_path, store, Arc::new(JsonCodec::new()))
    }

    /// Create a gateway holding `value` in memory. Nothing is written until
    /// the first save.
    pub fn with_value(
        relative_path: impl Into<String>,
        store: Arc<dyn ByteStore>,
        value: T,
    ) -> Result<Self> {
        Self::with_codec_and_value(relative_path, store, Arc::new(JsonCodec::new()), value)
    }
}

impl<T> Gateway<T>
where
    T: Send + Sync + 'static,
{
    /// Create a gateway with a caller-supplied codec. No I/O.
    ///
    /// The path is stored in normalized form (see
    /// [`paths::normalize_relative`]), so `./a.json` and `a.json` name the
    /// same gateway.
    pub fn with_codec(
        relative_path: impl Into<String>,
        store: Arc<dyn ByteStore>,
        codec: Arc<dyn Codec<T>>,
    ) -> Result<Self> {
        let relative_path: String = relative_path.into();
        let relative_path = paths::normalize_relative(&relative_path)?;
        Ok(Self {
            relative_path,
            store,
            codec,
            slot: RwLock::new(Slot::Unloaded),
        })
    }

    pub fn with_codec_and_value(
        relative_path: impl Into<String>,
        store: Arc<dyn ByteStore>,
        codec: Arc<dyn Codec<T>>,
        value: T,
    ) -> Result<Self> {
        let gateway = Self::with_codec(relative_path, store, codec)?;
        *gateway.slot.write().unwrap_or_else(PoisonError::into_inner) = Slot::Loaded(Some(value));
        Ok(gateway)
    }

    // ========================================
    // Location
    // ========================================

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn absolute_path(&self) -> PathBuf {
        self.store.absolute_path(&self.relative_path)
    }

    /// File name without extension.
    pub fn name(&self) -> &str {
        paths::file_stem(&self.relative_path).unwrap_or_default()
    }

    /// Extension without the leading dot.
    pub fn extension(&self) -> Option<&str> {
        paths::extension(&self.relative_path)
    }

    pub fn store(&self) -> &Arc<dyn ByteStore> {
        &self.store
    }

    // ========================================
    // State queries
    // ========================================

    /// Whether the backing file exists. Always asks the store.
    pub fn exists(&self) -> bool {
        self.store.exists(&self.relative_path)
    }

    /// Whether a load was attempted (or a value set) since the last unload.
    pub fn is_loaded(&self) -> bool {
        matches!(
            *self.slot.read().unwrap_or_else(PoisonError::into_inner),
            Slot::Loaded(_)
        )
    }

    /// Whether a value is cached. No I/O.
    pub fn has_value(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .value()
            .is_some()
    }

    // ========================================
    // Loading
    // ========================================

    /// Move from `Unloaded` to `Loaded`, reading the file if there is one.
    ///
    /// In the `Loaded` state this does no I/O, even when no value is cached.
    pub fn ensure_loaded(&self) -> Result<()> {
        if let Slot::Loaded(_) = *self.read_slot()? {
            return Ok(());
        }

        let mut slot = self.write_slot()?;
        if let Slot::Unloaded = *slot {
            let fetched = self.fetch()?;
            slot.install(fetched);
        }
        Ok(())
    }

    /// Reload from disk.
    ///
    /// Returns `true` when a document was decoded into the cache. A missing
    /// file leaves the cached value untouched and returns `false`. A document
    /// that fails to decode is an error and leaves the cache untouched.
    pub fn read(&self) -> Result<bool> {
        let fetched = self.fetch()?;
        let replaced = self.write_slot()?.install(fetched);
        debug!(
            "Read {}: {}",
            self.relative_path,
            if replaced { "loaded" } else { "no file" }
        );
        Ok(replaced)
    }

    /// Run `f` on the cached value after [`Gateway::ensure_loaded`].
    pub fn with_value_ref<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> Result<R> {
        self.ensure_loaded()?;
        let slot = self.read_slot()?;
        Ok(f(slot.value()))
    }

    // ========================================
    // Saving
    // ========================================

    /// Encode and write the cached value.
    ///
    /// Without a cached value this is a no-op returning `Ok(false)`; it never
    /// creates an empty or placeholder file.
    pub fn save(&self) -> Result<bool> {
        let Some(bytes) = self.encode_cached()? else {
            debug!("Nothing cached for {}, skipping save", self.relative_path);
            return Ok(false);
        };

        self.store.write(&self.relative_path, &bytes)?;
        debug!("Saved {}", self.relative_path);
        Ok(true)
    }

    /// Replace the cached value and save it.
    pub fn overwrite(&self, value: T) -> Result<()> {
        *self.write_slot()? = Slot::Loaded(Some(value));
        self.save().map(|_| ())
    }

    /// Mutate the cached value, then save unconditionally.
    ///
    /// Loads first when unloaded. Fails with [`DatagateError::ValueAbsent`]
    /// (without calling `f`) when there is still no value afterwards.
    pub fn modify(&self, f: impl FnOnce(&mut T)) -> Result<()> {
        self.modify_if(|value| {
            f(value);
            true
        })
        .map(|_| ())
    }

    /// Mutate the cached value and save only if `f` returns `true`.
    ///
    /// Returns what `f` returned.
    pub fn modify_if(&self, f: impl FnOnce(&mut T) -> bool) -> Result<bool> {
        self.ensure_loaded()?;

        let changed = {
            let mut slot = self.write_slot()?;
            let value = slot.value_mut().ok_or_else(|| DatagateError::ValueAbsent {
                path: self.relative_path.clone(),
            })?;
            f(value)
        };

        if changed {
            self.save()?;
        }
        Ok(changed)
    }

    // ========================================
    // Unload / remove
    // ========================================

    /// Drop the cached value. Disk is untouched.
    pub fn unload(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Slot::Unloaded;
    }

    /// Delete the backing file, returning whether one existed.
    ///
    /// The cached value stays; a later save writes it back.
    pub fn remove(&self) -> Result<bool> {
        let removed = self.store.delete(&self.relative_path)?;
        debug!("Remove {}: {}", self.relative_path, removed);
        Ok(removed)
    }

    // ========================================
    // Async variants
    // ========================================

    /// [`Gateway::save`] with the write on the blocking pool.
    ///
    /// The value is encoded on the calling task; only the file write moves.
    pub async fn save_async(&self) -> Result<bool> {
        let Some(bytes) = self.encode_cached()? else {
            debug!("Nothing cached for {}, skipping save", self.relative_path);
            return Ok(false);
        };

        store::write_async(Arc::clone(&self.store), self.relative_path.clone(), bytes).await?;
        debug!("Saved {} (async)", self.relative_path);
        Ok(true)
    }

    /// [`Gateway::overwrite`] with the write on the blocking pool.
    pub async fn overwrite_async(&self, value: T) -> Result<()> {
        *self.write_slot()? = Slot::Loaded(Some(value));
        self.save_async().await.map(|_| ())
    }

    /// Spawn [`Gateway::save_async`] on the current runtime.
    ///
    /// `on_complete` runs exactly once, after the write finished or failed.
    /// Dropping the returned handle does not cancel the save.
    pub fn save_detached<F>(self: &Arc<Self>, on_complete: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce(Result<bool>) + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| DatagateError::NoRuntime)?;
        let gateway = Arc::clone(self);
        Ok(runtime.spawn(async move {
            let result = gateway.save_async().await;
            on_complete(result);
        }))
    }

    fn fetch(&self) -> Result<Option<T>> {
        fetch_from(self.store.as_ref(), self.codec.as_ref(), &self.relative_path)
    }

    fn encode_cached(&self) -> Result<Option<Vec<u8>>> {
        let slot = self.read_slot()?;
        slot.value().map(|value| self.codec.encode(value)).transpose()
    }

    fn read_slot(&self) -> Result<RwLockReadGuard<'_, Slot<T>>> {
        self.slot.read().map_err(|_| DatagateError::LockPoisoned {
            path: self.relative_path.clone(),
        })
    }

    fn write_slot(&self) -> Result<RwLockWriteGuard<'_, Slot<T>>> {
        self.slot.write().map_err(|_| DatagateError::LockPoisoned {
            path: self.relative_path.clone(),
        })
    }
}

impl<T> Gateway<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// [`Gateway::read`], then a copy of the resulting cached value.
    pub fn load(&self) -> Result<Option<T>> {
        self.read()?;
        Ok(self.read_slot()?.value().cloned())
    }

    /// Copy of the cached value after [`Gateway::ensure_loaded`].
    pub fn get(&self) -> Result<Option<T>> {
        self.with_value_ref(|value| value.cloned())
    }

    /// Copy of the cached value. No I/O, even when unloaded.
    pub fn peek(&self) -> Result<Option<T>> {
        Ok(self.read_slot()?.value().cloned())
    }

    /// [`Gateway::load`] with the read and the decode on the blocking pool.
    pub async fn load_async(&self) -> Result<Option<T>> {
        let store = Arc::clone(&self.store);
        let codec = Arc::clone(&self.codec);
        let relative = self.relative_path.clone();

        let fetched = tokio::task::spawn_blocking(move || {
            fetch_from(store.as_ref(), codec.as_ref(), &relative)
        })
        .await??;

        let mut slot = self.write_slot()?;
        slot.install(fetched);
        Ok(slot.value().cloned())
    }

    /// Spawn [`Gateway::load_async`] on the current runtime.
    ///
    /// `on_complete` runs exactly once with the loaded value or the error.
    pub fn load_detached<F>(self: &Arc<Self>, on_complete: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce(Result<Option<T>>) + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| DatagateError::NoRuntime)?;
        let gateway = Arc::clone(self);
        Ok(runtime.spawn(async move {
            let result = gateway.load_async().await;
            on_complete(result);
        }))
    }
}

fn fetch_from<T>(store: &dyn ByteStore, codec: &dyn Codec<T>, relative: &str) -> Result<Option<T>> {
    match store.read(relative)? {
        Some(bytes) => codec.decode(&bytes).map(Some),
        None => Ok(None),
    }
}

impl<T> DataHandle for Gateway<T>
where
    T: Send + Sync + 'static,
{
    fn relative_path(&self) -> &str {
        Gateway::relative_path(self)
    }

    fn absolute_path(&self) -> PathBuf {
        Gateway::absolute_path(self)
    }

    fn name(&self) -> &str {
        Gateway::name(self)
    }

    fn extension(&self) -> Option<&str> {
        Gateway::extension(self)
    }

    fn exists(&self) -> bool {
        Gateway::exists(self)
    }

    fn is_loaded(&self) -> bool {
        Gateway::is_loaded(self)
    }

    fn save(&self) -> Result<bool> {
        Gateway::save(self)
    }

    fn read(&self) -> Result<bool> {
        Gateway::read(self)
    }

    fn unload(&self) {
        Gateway::unload(self)
    }

    fn remove(&self) -> Result<bool> {
        Gateway::remove(self)
    }

    fn value_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<T> PartialEq for Gateway<T> {
    fn eq(&self, other: &Self) -> bool {
        self.relative_path == other.relative_path
    }
}

impl<T> Eq for Gateway<T> {}

impl<T> Hash for Gateway<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.relative_path.hash(state);
    }
}

impl<T> fmt::Display for Gateway<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.store.absolute_path(&self.relative_path).display())
    }
}

impl<T> fmt::Debug for Gateway<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.slot.try_read().as_deref() {
            Ok(Slot::Unloaded) => "unloaded",
            Ok(Slot::Loaded(Some(_))) => "loaded",
            Ok(Slot::Loaded(None)) => "loaded (empty)",
            Err(_) => "busy",
        };
        f.debug_struct("Gateway")
            .field("relative_path", &self.relative_path)
            .field("store", &self.store)
            .field("state", &state)
            .finish()
    }
}
