//! Store persistence for Transformer Test Studio.
//!
//! Module data lives in named stores (`transformerInputs`, `losses`,
//! `impulse`, ...) on a backend key-value API. This crate provides:
//!
//! - [`PersistenceContext`]: the registry. Probes the backend once and hands
//!   out one [`DataStore`] per store id. When the probe fails every store runs
//!   on local storage for the rest of the session.
//! - [`DataStore`]: read cache with a short TTL, merge (`update_data`) and
//!   replace (`set_data`) writes, and local recovery of failed merges.
//! - [`RemoteStoreClient`]: the HTTP surface, including administrative
//!   export/import/backup/restore calls.
//! - [`LocalStore`]: the fallback key-value storage.
//! - [`TypedStore`]: deserializes store values into declared shapes.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use tts_persistence::{PersistenceConfig, PersistenceContext, form_data_patch};
//!
//! # async fn run() -> tts_persistence::Result<()> {
//! let context = PersistenceContext::new(&PersistenceConfig::default())?;
//! let losses = context.get_store("losses");
//!
//! let mut form = serde_json::Map::new();
//! form.insert("perdas-vazio-kw".into(), json!("120.5"));
//! losses.update_data(&form_data_patch(form)).await?;
//!
//! let value = losses.get_data().await;
//! println!("{value}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod local;
pub mod merge;
pub mod registry;
pub mod remote;
pub mod shape;
pub mod store;

pub use config::{DEFAULT_BASE_URL, PersistenceConfig};
pub use error::{PersistError, Result};
pub use local::{
    FileLocalStore, LocalStore, MemoryLocalStore, STORE_KEY_PREFIX, clean_module_cache,
    read_store, store_key, write_store,
};
pub use merge::{JsonObject, form_data_patch, shallow_merge};
pub use registry::PersistenceContext;
pub use remote::{
    Backup, LossesOperation, ProcessRequest, RemoteStoreClient, RestoreReport, StoreExport,
};
pub use shape::{
    FormStoreShape, NOMINAL_CURRENT_FIELDS, StoreShape, TransformerInputsShape, TypedStore,
};
pub use store::{DataStore, SaveOutcome, TRANSFORMER_INPUTS_STORE};

#[cfg(feature = "test-support")]
pub mod testing;
