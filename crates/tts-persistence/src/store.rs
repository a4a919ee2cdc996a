//! Per-store cache with remote and local fallback routing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde_json::Value;

use crate::error::Result;
use crate::local::{merge_store, read_store, write_store};
use crate::merge::{JsonObject, form_data_patch, shallow_merge};
use crate::registry::Backend;

/// Store id of the canonical transformer inputs.
pub const TRANSFORMER_INPUTS_STORE: &str = "transformerInputs";

/// Where a write ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Persisted by the backend.
    Remote,
    /// Persisted locally because the registry is in fallback mode.
    LocalFallback,
    /// The backend call failed and the value was merged into local storage instead.
    EmergencyLocal,
}

impl SaveOutcome {
    pub fn is_remote(self) -> bool {
        matches!(self, Self::Remote)
    }
}

#[derive(Debug)]
struct CachedValue {
    value: Arc<Value>,
    /// `None` when the value came from a write and was never fetched.
    fetched_at: Option<Instant>,
}

/// A named store: short-lived read cache over the backend or local fallback.
///
/// Obtained from [`PersistenceContext::get_store`](crate::PersistenceContext::get_store).
/// Every operation first waits for the registry's connectivity probe.
#[derive(Debug)]
pub struct DataStore {
    store_id: String,
    backend: Arc<Backend>,
    cache: Mutex<Option<CachedValue>>,
}

impl DataStore {
    pub(crate) fn new(store_id: impl Into<String>, backend: Arc<Backend>) -> Self {
        let store_id = store_id.into();
        tracing::debug!(%store_id, "Created data store");
        Self {
            store_id,
            backend,
            cache: Mutex::new(None),
        }
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Current value of the store.
    ///
    /// Served from memory while the last fetch is younger than the cache TTL.
    /// Otherwise read from local storage in fallback mode, or from the
    /// backend. A failed backend read yields `{}` and does not consult local
    /// storage.
    pub async fn get_data(&self) -> Arc<Value> {
        self.backend.ensure_probed().await;

        if let Some(value) = self.fresh_cache() {
            tracing::debug!(store_id = %self.store_id, "Serving store from cache");
            return value;
        }

        let value = if self.backend.is_fallback_active() {
            tracing::debug!(store_id = %self.store_id, "Reading store from local fallback");
            read_store(self.backend.local(), &self.store_id)
        } else {
            match self.backend.remote().get_store(&self.store_id).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(store_id = %self.store_id, error = %e, "Failed to load store, using empty object");
                    Value::Object(JsonObject::new())
                }
            }
        };

        let value = Arc::new(value);
        *self.lock_cache() = Some(CachedValue {
            value: Arc::clone(&value),
            fetched_at: Some(Instant::now()),
        });
        value
    }

    /// Shallow-merge `partial` into the store.
    ///
    /// A failed backend write is recovered by merging into local storage; the
    /// returned error only reports that local storage failed as well.
    pub async fn update_data(&self, partial: &JsonObject) -> Result<SaveOutcome> {
        self.backend.ensure_probed().await;

        if self.backend.is_fallback_active() {
            let current = self.get_data().await;
            let merged = shallow_merge(&current, partial);
            write_store(self.backend.local(), &self.store_id, &merged)?;
            self.store_written(merged);
            tracing::debug!(store_id = %self.store_id, "Merged store into local fallback");
            return Ok(SaveOutcome::LocalFallback);
        }

        match self.backend.remote().patch_store(&self.store_id, partial).await {
            Ok(merged) => {
                self.store_written(merged);
                tracing::info!(store_id = %self.store_id, "Store updated");
                Ok(SaveOutcome::Remote)
            }
            Err(e) => {
                tracing::error!(store_id = %self.store_id, error = %e, "Failed to update store, saving locally");
                self.emergency_merge(partial)
            }
        }
    }

    /// Replace the store with `full`.
    ///
    /// A failed backend write is returned and leaves the cache untouched;
    /// nothing is written locally.
    pub async fn set_data(&self, full: Value) -> Result<SaveOutcome> {
        self.backend.ensure_probed().await;

        if self.backend.is_fallback_active() {
            write_store(self.backend.local(), &self.store_id, &full)?;
            self.store_written(full);
            tracing::debug!(store_id = %self.store_id, "Replaced store in local fallback");
            return Ok(SaveOutcome::LocalFallback);
        }

        match self.backend.remote().put_store(&self.store_id, &full).await {
            Ok(stored) => {
                self.store_written(stored);
                tracing::info!(store_id = %self.store_id, "Store replaced");
                Ok(SaveOutcome::Remote)
            }
            Err(e) => {
                tracing::error!(store_id = %self.store_id, error = %e, "Failed to replace store");
                Err(e)
            }
        }
    }

    /// Save the canonical transformer inputs through the compute endpoint.
    ///
    /// The server returns the inputs completed with derived values; they
    /// become the cached `formData`. Failures merge `{formData}` locally.
    pub async fn submit_transformer_inputs(&self, form_data: JsonObject) -> Result<SaveOutcome> {
        self.backend.ensure_probed().await;

        if self.backend.is_fallback_active() {
            return self.update_data(&form_data_patch(form_data)).await;
        }

        match self.backend.remote().submit_transformer_inputs(&form_data).await {
            Ok(updated) => {
                let patch = form_data_patch(updated);
                let merged = match self.cached_value() {
                    Some(current) => shallow_merge(&current, &patch),
                    None => Value::Object(patch),
                };
                self.store_written(merged);
                tracing::info!(store_id = %self.store_id, "Transformer inputs saved and recomputed");
                Ok(SaveOutcome::Remote)
            }
            Err(e) => {
                tracing::error!(store_id = %self.store_id, error = %e, "Failed to save transformer inputs, saving locally");
                self.emergency_merge(&form_data_patch(form_data))
            }
        }
    }

    /// Drop the cached value; the next read goes to storage.
    pub fn invalidate(&self) {
        *self.lock_cache() = None;
    }

    fn emergency_merge(&self, partial: &JsonObject) -> Result<SaveOutcome> {
        let merged = merge_store(self.backend.local(), &self.store_id, partial)?;
        self.store_written(merged);
        Ok(SaveOutcome::EmergencyLocal)
    }

    /// Record a written value without refreshing the fetch timestamp.
    fn store_written(&self, value: Value) {
        let mut cache = self.lock_cache();
        let fetched_at = cache.as_ref().and_then(|cached| cached.fetched_at);
        *cache = Some(CachedValue {
            value: Arc::new(value),
            fetched_at,
        });
    }

    fn fresh_cache(&self) -> Option<Arc<Value>> {
        let ttl = self.backend.cache_ttl();
        self.lock_cache().as_ref().and_then(|cached| {
            cached
                .fetched_at
                .filter(|at| at.elapsed() < ttl)
                .map(|_| Arc::clone(&cached.value))
        })
    }

    fn cached_value(&self) -> Option<Arc<Value>> {
        self.lock_cache()
            .as_ref()
            .map(|cached| Arc::clone(&cached.value))
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<CachedValue>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
