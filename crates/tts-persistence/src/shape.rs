//! Typed views over store values.
//!
//! Store payloads are plain JSON by convention (`{formData: {...}, ...}`).
//! A [`TypedStore`] deserializes them into a declared shape at the boundary,
//! reporting a mismatch as [`PersistError::Schema`].

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PersistError, Result};
use crate::merge::JsonObject;
use crate::registry::PersistenceContext;
use crate::store::{DataStore, SaveOutcome, TRANSFORMER_INPUTS_STORE};

/// A shape that belongs to exactly one store.
pub trait StoreShape: Serialize + DeserializeOwned {
    const STORE_ID: &'static str;
}

/// Module store convention: `formData` plus arbitrary result keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormStoreShape {
    #[serde(rename = "formData", default)]
    pub form_data: JsonObject,

    /// Every other top-level key (results, timestamps, ...).
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Fields the backend derives when transformer inputs are saved.
pub const NOMINAL_CURRENT_FIELDS: [&str; 5] = [
    "corrente_nominal_at",
    "corrente_nominal_bt",
    "corrente_nominal_terciario",
    "corrente_nominal_at_tap_maior",
    "corrente_nominal_at_tap_menor",
];

/// The canonical transformer inputs.
///
/// Older payloads keep the inputs at the root instead of under `formData`;
/// [`resolved`](Self::resolved) hides the difference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformerInputsShape {
    #[serde(rename = "formData", default)]
    pub form_data: JsonObject,

    #[serde(flatten)]
    pub extra: JsonObject,
}

impl StoreShape for TransformerInputsShape {
    const STORE_ID: &'static str = TRANSFORMER_INPUTS_STORE;
}

impl TransformerInputsShape {
    /// Root keys overlaid with `formData` when it is non-empty.
    pub fn resolved(&self) -> JsonObject {
        let mut resolved = self.extra.clone();
        for (key, value) in &self.form_data {
            resolved.insert(key.clone(), value.clone());
        }
        resolved
    }

    /// Nominal currents by field name; missing currents are absent.
    pub fn nominal_currents(&self) -> Vec<(&'static str, Value)> {
        let resolved = self.resolved();
        NOMINAL_CURRENT_FIELDS
            .iter()
            .filter_map(|field| {
                resolved
                    .get(*field)
                    .filter(|value| !value.is_null())
                    .map(|value| (*field, value.clone()))
            })
            .collect()
    }
}

/// A [`DataStore`] read and written through the shape `T`.
#[derive(Debug)]
pub struct TypedStore<T> {
    store: Arc<DataStore>,
    _shape: PhantomData<fn() -> T>,
}

impl<T> Clone for TypedStore<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _shape: PhantomData,
        }
    }
}

impl<T: StoreShape> TypedStore<T> {
    /// Open the store that `T` belongs to.
    pub fn named(context: &PersistenceContext) -> Self {
        Self::open(context, T::STORE_ID)
    }
}

impl<T: Serialize + DeserializeOwned> TypedStore<T> {
    /// Open `store_id` with shape `T`.
    pub fn open(context: &PersistenceContext, store_id: &str) -> Self {
        Self {
            store: context.get_store(store_id),
            _shape: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    /// Load and validate the current value.
    pub async fn load(&self) -> Result<T> {
        let value = self.store.get_data().await;
        T::deserialize(value.as_ref()).map_err(|e| PersistError::Schema {
            store_id: self.store.store_id().to_string(),
            source: e,
        })
    }

    /// Merge the top-level keys of `value` into the store.
    pub async fn merge(&self, value: &T) -> Result<SaveOutcome> {
        let partial = match serde_json::to_value(value) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(PersistError::Schema {
                    store_id: self.store.store_id().to_string(),
                    source: serde::de::Error::custom(format!(
                        "expected an object, got {other}"
                    )),
                });
            }
            Err(e) => {
                return Err(PersistError::Json {
                    context: format!("store '{}'", self.store.store_id()),
                    source: e,
                });
            }
        };
        self.store.update_data(&partial).await
    }
}
