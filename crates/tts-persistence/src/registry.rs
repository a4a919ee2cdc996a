//! Process-wide store registry and connectivity state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::config::PersistenceConfig;
use crate::error::Result;
use crate::local::{FileLocalStore, LocalStore, MemoryLocalStore, STORE_KEY_PREFIX, store_key};
use crate::remote::RemoteStoreClient;
use crate::store::{DataStore, SaveOutcome};

/// State shared by the registry and every store it hands out.
#[derive(Debug)]
pub(crate) struct Backend {
    remote: RemoteStoreClient,
    local: Arc<dyn LocalStore>,
    cache_ttl: Duration,
    /// Set once by the health probe: `true` when fallback mode is active.
    probe: OnceCell<bool>,
}

impl Backend {
    /// Run the health probe once; concurrent callers wait for the same result.
    pub(crate) async fn ensure_probed(&self) -> bool {
        *self
            .probe
            .get_or_init(|| async move {
                match self.remote.health().await {
                    Ok(()) => {
                        tracing::info!("Backend reachable");
                        false
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Backend unavailable, using local fallback");
                        true
                    }
                }
            })
            .await
    }

    pub(crate) fn is_fallback_active(&self) -> bool {
        self.probe.get().copied().unwrap_or(false)
    }

    pub(crate) fn remote(&self) -> &RemoteStoreClient {
        &self.remote
    }

    pub(crate) fn local(&self) -> &dyn LocalStore {
        self.local.as_ref()
    }

    pub(crate) fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }
}

/// Registry of [`DataStore`]s sharing one backend and one fallback mode.
///
/// Construct once at startup and pass by reference to everything that
/// persists data.
#[derive(Debug)]
pub struct PersistenceContext {
    backend: Arc<Backend>,
    stores: Mutex<HashMap<String, Arc<DataStore>>>,
}

impl PersistenceContext {
    /// Create a context from `config`.
    ///
    /// The fallback store is file-backed when `local_dir` is set, in-memory otherwise.
    pub fn new(config: &PersistenceConfig) -> Result<Self> {
        let local: Arc<dyn LocalStore> = match &config.local_dir {
            Some(dir) => Arc::new(FileLocalStore::open(dir)?),
            None => Arc::new(MemoryLocalStore::new()),
        };
        Self::with_local(config, local)
    }

    /// Create a context with an explicit fallback store.
    pub fn with_local(config: &PersistenceConfig, local: Arc<dyn LocalStore>) -> Result<Self> {
        let backend = Backend {
            remote: RemoteStoreClient::new(config)?,
            local,
            cache_ttl: config.cache_ttl(),
            probe: OnceCell::new(),
        };
        Ok(Self {
            backend: Arc::new(backend),
            stores: Mutex::new(HashMap::new()),
        })
    }

    /// Probe backend connectivity. Only the first call probes.
    pub async fn init(&self) {
        let fallback = self.backend.ensure_probed().await;
        tracing::debug!(fallback, "Persistence initialized");
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.probe.initialized()
    }

    /// Whether the registry runs on local storage only.
    pub fn is_fallback_active(&self) -> bool {
        self.backend.is_fallback_active()
    }

    /// Get the store for `store_id`, creating it on first access.
    pub fn get_store(&self, store_id: &str) -> Arc<DataStore> {
        let mut stores = self.lock_stores();
        let store = stores.entry(store_id.to_string()).or_insert_with(|| {
            Arc::new(DataStore::new(store_id, Arc::clone(&self.backend)))
        });
        Arc::clone(store)
    }

    pub fn remote(&self) -> &RemoteStoreClient {
        self.backend.remote()
    }

    pub fn local(&self) -> &dyn LocalStore {
        self.backend.local()
    }

    /// Clear one store on the backend and locally, and invalidate its cache.
    ///
    /// A backend failure is logged and reported as [`SaveOutcome::EmergencyLocal`];
    /// the local copy is removed regardless.
    pub async fn clear_store(&self, store_id: &str) -> Result<SaveOutcome> {
        let outcome = if self.backend.ensure_probed().await {
            SaveOutcome::LocalFallback
        } else {
            match self.remote().delete_store(store_id).await {
                Ok(()) => SaveOutcome::Remote,
                Err(e) => {
                    tracing::warn!(%store_id, error = %e, "Failed to clear store on backend");
                    SaveOutcome::EmergencyLocal
                }
            }
        };

        self.local().remove(&store_key(store_id))?;
        if let Some(store) = self.lock_stores().get(store_id) {
            store.invalidate();
        }

        tracing::info!(%store_id, ?outcome, "Store cleared");
        Ok(outcome)
    }

    /// Clear every store and invalidate the cache of every registered
    /// [`DataStore`]. Registered instances stay in place, so holders of an
    /// earlier [`get_store`](Self::get_store) handle see the cleared value.
    pub async fn clear_all(&self) -> Result<SaveOutcome> {
        let outcome = if self.backend.ensure_probed().await {
            SaveOutcome::LocalFallback
        } else {
            match self.remote().delete_all_stores().await {
                Ok(()) => SaveOutcome::Remote,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to clear stores on backend");
                    SaveOutcome::EmergencyLocal
                }
            }
        };

        let local = self.local();
        let mut removed = 0;
        for key in local.keys()? {
            if key.starts_with(STORE_KEY_PREFIX) {
                local.remove(&key)?;
                removed += 1;
            }
        }
        let stores = self.lock_stores();
        for store in stores.values() {
            store.invalidate();
        }
        let invalidated = stores.len();
        drop(stores);

        tracing::info!(removed, invalidated, ?outcome, "All stores cleared");
        Ok(outcome)
    }

    fn lock_stores(&self) -> MutexGuard<'_, HashMap<String, Arc<DataStore>>> {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
