//! Datagate Core - typed values persisted one file per path.
//!
//! A [`Gateway`] ties an in-memory value to a file under a storage root and
//! moves it across with explicit load/save/modify calls, in blocking and
//! async flavours. A [`SharedRegistry`] hands the same live gateway to every
//! caller asking for a path, so they work on one object instead of copies.
//!
//! Bytes go through a [`ByteStore`] ([`FileStore`] by default) and values
//! through a [`Codec`] ([`JsonCodec`] by default). `JsonCodec` wraps values
//! that are not keyed structures (numbers, strings, lists, ...) in a
//! `{ "value": ... }` envelope, decided from the type alone.
//!
//! # Example
//!
//! ```rust,no_run
//! use datagate_core::{ByteStore, FileStore, Gateway, SharedRegistry};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Settings {
//!     volume: f64,
//!     name: String,
//! }
//!
//! fn main() -> datagate_core::Result<()> {
//!     let store: Arc<dyn ByteStore> = Arc::new(FileStore::open_default()?);
//!     let registry = Arc::new(SharedRegistry::new(store.clone()));
//!
//!     let settings = registry.get_or_create(
//!         "settings.json",
//!         Settings { volume: 0.5, name: "p1".into() },
//!         true,
//!     )?;
//!     settings.modify(|s| s.volume = 0.8)?;
//!
//!     let score = Gateway::with_value("score.json", store, 42u32)?;
//!     score.save()?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handle;
pub mod registry;
pub mod store;

pub use codec::{Codec, EnvelopePolicy, JsonCodec, Shape};
pub use config::StorageConfig;
pub use error::{DatagateError, Result};
pub use gateway::Gateway;
pub use handle::DataHandle;
pub use registry::SharedRegistry;
pub use store::{ByteStore, FileStore};
