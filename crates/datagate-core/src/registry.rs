//! Shared gateway registry.
//!
//! Maps relative paths to live gateways so independent call sites end up on
//! the same `Arc<Gateway<T>>` instead of private copies that drift apart.
//!
//! A registry is bound to one [`ByteStore`], since a relative path is only
//! unique below one root. It is an ordinary value: create it once, wrap it in
//! an `Arc` and pass it to whoever needs sharing.
//!
//! Every registry operation is total. "Not found" and "already registered"
//! are reported through `Option` and `bool`. Only [`SharedRegistry::get_or_create`]
//! can fail, and only because it performs file I/O.

use crate::codec::{Codec, JsonCodec};
use crate::error::Result;
use crate::gateway::Gateway;
use crate::handle::DataHandle;
use crate::store::{paths, ByteStore};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::hash_map::Entry;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Process-wide path -> gateway map.
///
/// Mutations and enumeration run under one mutex. Shared creation runs
/// under a second one, held across the existence check, the load or
/// fallback write and the insert, so only one caller ever touches the file
/// of a path being created. The gateways handed out are not synchronized by
/// the registry; see the concurrency notes on [`Gateway`].
pub struct SharedRegistry {
    store: Arc<dyn ByteStore>,
    entries: Mutex<HashMap<String, Arc<dyn DataHandle>>>,
    creating: Mutex<()>,
}

impl SharedRegistry {
    pub fn new(store: Arc<dyn ByteStore>) -> Self {
        Self {
            store,
            entries: Mutex::new(HashMap::new()),
            creating: Mutex::new(()),
        }
    }

    /// Store new gateways are created against.
    pub fn store(&self) -> &Arc<dyn ByteStore> {
        &self.store
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn DataHandle>>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Shared registry lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_creation(&self) -> MutexGuard<'_, ()> {
        self.creating.lock().unwrap_or_else(|poisoned| {
            warn!("Shared creation lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    // ========================================
    // Lookup or create
    // ========================================

    /// Get a gateway for `relative_path`, creating it when needed.
    ///
    /// - `shared` and already registered: the registered gateway is returned
    ///   and `fallback` is ignored.
    /// - otherwise a new gateway is built; an existing file wins over
    ///   `fallback`, and a missing file is created from `fallback`.
    /// - `shared`: the new gateway is registered before it is returned.
    ///   Concurrent shared calls for one path are serialized, so exactly one
    ///   of them reads or writes the file and the rest get its instance.
    pub fn get_or_create<T>(
        &self,
        relative_path: &str,
        fallback: T,
        shared: bool,
    ) -> Result<Arc<Gateway<T>>>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.get_or_create_with_codec(relative_path, fallback, shared, Arc::new(JsonCodec::new()))
    }

    /// [`SharedRegistry::get_or_create`] with a caller-supplied codec.
    pub fn get_or_create_with_codec<T>(
        &self,
        relative_path: &str,
        fallback: T,
        shared: bool,
        codec: Arc<dyn Codec<T>>,
    ) -> Result<Arc<Gateway<T>>>
    where
        T: Send + Sync + 'static,
    {
        let _creating = shared.then(|| self.lock_creation());

        if shared {
            if let Some(existing) = self.try_get::<T>(relative_path) {
                debug!("Reusing shared gateway for {}", relative_path);
                return Ok(existing);
            }
        }

        let gateway = Arc::new(Gateway::with_codec(
            relative_path,
            Arc::clone(&self.store),
            codec,
        )?);

        if gateway.exists() {
            gateway.read()?;
        } else {
            gateway.overwrite(fallback)?;
        }

        if shared && !self.share(gateway.clone()) {
            warn!(
                "{} is already shared by another instance; returning an unshared gateway",
                relative_path
            );
        }

        Ok(gateway)
    }

    // ========================================
    // Lookup
    // ========================================

    /// Typed lookup. Never creates anything.
    ///
    /// Returns `None` when the path is not registered or is registered with
    /// a different value type.
    pub fn try_get<T>(&self, relative_path: &str) -> Option<Arc<Gateway<T>>>
    where
        T: Send + Sync + 'static,
    {
        let handle = self.try_get_handle(relative_path)?;
        let stored_type = handle.value_type_name();

        match handle.into_any().downcast::<Gateway<T>>() {
            Ok(gateway) => Some(gateway),
            Err(_) => {
                warn!(
                    "Shared gateway {} holds {}, not {}",
                    relative_path,
                    stored_type,
                    std::any::type_name::<T>()
                );
                None
            }
        }
    }

    /// Untyped lookup.
    pub fn try_get_handle(&self, relative_path: &str) -> Option<Arc<dyn DataHandle>> {
        self.lock_entries().get(key_for(relative_path).as_ref()).cloned()
    }

    /// Whether any gateway is registered under `handle`'s path.
    ///
    /// This does not check that `handle` itself is the registered instance.
    pub fn is_shared(&self, handle: &dyn DataHandle) -> bool {
        self.lock_entries().contains_key(handle.relative_path())
    }

    // ========================================
    // Registration
    // ========================================

    /// Register `handle` under its path if the path is free.
    ///
    /// Returns `false`, leaving the current entry in place, when the path is
    /// already registered.
    pub fn share(&self, handle: Arc<dyn DataHandle>) -> bool {
        match self.lock_entries().entry(handle.relative_path().to_string()) {
            Entry::Occupied(_) => {
                debug!("{} is already shared", handle.relative_path());
                false
            }
            Entry::Vacant(slot) => {
                debug!("Sharing {}", handle.relative_path());
                slot.insert(handle);
                true
            }
        }
    }

    /// Remove the entry for `handle`'s path, returning whether one existed.
    pub fn unshare(&self, handle: &dyn DataHandle) -> bool {
        let removed = self
            .lock_entries()
            .remove(handle.relative_path())
            .is_some();
        debug!("Unshare {}: {}", handle.relative_path(), removed);
        removed
    }

    // ========================================
    // Enumeration
    // ========================================

    /// Snapshot of every registered gateway, in no particular order.
    pub fn list_all(&self) -> Vec<Arc<dyn DataHandle>> {
        self.lock_entries().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Drop every entry. Files and the gateways' cached values are untouched.
    pub fn clear_all(&self) {
        let mut entries = self.lock_entries();
        debug!("Clearing {} shared gateways", entries.len());
        entries.clear();
    }
}

/// Registry key for a caller-supplied path. Paths that fail validation can
/// never be registered, so they are looked up as given and simply miss.
fn key_for(relative_path: &str) -> Cow<'_, str> {
    match paths::normalize_relative(relative_path) {
        Ok(key) => Cow::Owned(key),
        Err(_) => Cow::Borrowed(relative_path),
    }
}

impl fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<String> = self.lock_entries().keys().cloned().collect();
        paths.sort();
        f.debug_struct("SharedRegistry")
            .field("store", &self.store)
            .field("paths", &paths)
            .finish()
    }
}
