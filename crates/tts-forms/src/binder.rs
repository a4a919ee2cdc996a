//! Auto-save wiring between forms and stores.
//!
//! [`PersistenceBinder::bind`] hydrates a form from its store and marks every
//! control as listening. Each interaction then goes through
//! [`FormBinding::handle`]: the whole form is serialized, saved in the
//! background with the store's [`SaveStrategy`], and a [`StoreEvent`] is
//! published before `handle` returns.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::task::JoinHandle;
use tts_persistence::{
    DataStore, JsonObject, PersistenceContext, Result, SaveOutcome, TRANSFORMER_INPUTS_STORE,
    form_data_patch,
};

use crate::binding::{PopulateReport, populate, serialize};
use crate::events::{EventBus, StoreEvent};
use crate::form::{Document, Form, InteractionKind};

/// How a store persists a serialized form.
pub trait SaveStrategy: Send + Sync + fmt::Debug {
    fn save<'a>(
        &'a self,
        store: &'a DataStore,
        form_data: JsonObject,
    ) -> BoxFuture<'a, Result<SaveOutcome>>;
}

/// Merge `{formData}` into the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeFormData;

impl SaveStrategy for MergeFormData {
    fn save<'a>(
        &'a self,
        store: &'a DataStore,
        form_data: JsonObject,
    ) -> BoxFuture<'a, Result<SaveOutcome>> {
        async move { store.update_data(&form_data_patch(form_data)).await }.boxed()
    }
}

/// Post the inputs to the compute endpoint so derived values are recalculated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeTransformerInputs;

impl SaveStrategy for ComputeTransformerInputs {
    fn save<'a>(
        &'a self,
        store: &'a DataStore,
        form_data: JsonObject,
    ) -> BoxFuture<'a, Result<SaveOutcome>> {
        async move { store.submit_transformer_inputs(form_data).await }.boxed()
    }
}

/// Binds forms to stores.
#[derive(Debug, Clone)]
pub struct PersistenceBinder {
    context: Arc<PersistenceContext>,
    events: Arc<EventBus>,
    strategies: HashMap<String, Arc<dyn SaveStrategy>>,
    fallback_strategy: Arc<dyn SaveStrategy>,
}

impl PersistenceBinder {
    /// Binder saving through [`MergeFormData`], except the canonical
    /// transformer inputs which use [`ComputeTransformerInputs`].
    pub fn new(context: Arc<PersistenceContext>, events: Arc<EventBus>) -> Self {
        let mut strategies: HashMap<String, Arc<dyn SaveStrategy>> = HashMap::new();
        strategies.insert(
            TRANSFORMER_INPUTS_STORE.to_string(),
            Arc::new(ComputeTransformerInputs),
        );
        Self {
            context,
            events,
            strategies,
            fallback_strategy: Arc::new(MergeFormData),
        }
    }

    /// Use `strategy` for `store_id`.
    pub fn with_strategy(mut self, store_id: &str, strategy: impl SaveStrategy + 'static) -> Self {
        self.strategies
            .insert(store_id.to_string(), Arc::new(strategy));
        self
    }

    pub fn strategy_for(&self, store_id: &str) -> Arc<dyn SaveStrategy> {
        self.strategies
            .get(store_id)
            .map_or_else(|| Arc::clone(&self.fallback_strategy), Arc::clone)
    }

    pub fn context(&self) -> &Arc<PersistenceContext> {
        &self.context
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Hydrate `form` from `store_id` and attach listeners to its unbound controls.
    ///
    /// Dependent select options must be in place before binding or their
    /// stored values are reported as unmatched.
    pub async fn bind(&self, form: &mut Form, store_id: &str) -> FormBinding {
        let store = self.context.get_store(store_id);

        let data = store.get_data().await;
        let hydration = match data.get("formData") {
            Some(Value::Object(form_data)) => {
                let report = populate(form, form_data);
                tracing::debug!(%store_id, form = %form.id(), applied = report.applied.len(), "Form hydrated");
                Some(report)
            }
            _ => {
                tracing::debug!(%store_id, "No saved form data");
                None
            }
        };

        let mut newly_bound = 0;
        for control in form.controls_mut() {
            if control.bind_listeners() {
                newly_bound += 1;
            }
        }

        tracing::info!(%store_id, form = %form.id(), newly_bound, "Form persistence bound");
        FormBinding {
            store,
            strategy: self.strategy_for(store_id),
            events: Arc::clone(&self.events),
            form_id: form.id().to_string(),
            hydration,
            newly_bound,
        }
    }

    /// [`bind`](Self::bind) the form `form_id` of `document`.
    ///
    /// Returns `None` (logged) when the document has no such form.
    pub async fn bind_by_id(
        &self,
        document: &mut Document,
        form_id: &str,
        store_id: &str,
    ) -> Option<FormBinding> {
        let Some(form) = document.form_mut(form_id) else {
            tracing::error!(%form_id, %store_id, "Form not found, persistence not bound");
            return None;
        };
        Some(self.bind(form, store_id).await)
    }
}

/// A bound form: routes interactions to its store.
#[derive(Debug, Clone)]
pub struct FormBinding {
    store: Arc<DataStore>,
    strategy: Arc<dyn SaveStrategy>,
    events: Arc<EventBus>,
    form_id: String,
    hydration: Option<PopulateReport>,
    newly_bound: usize,
}

impl FormBinding {
    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    pub fn store_id(&self) -> &str {
        self.store.store_id()
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// Result of the initial hydration, `None` when the store had no form data.
    pub fn hydration(&self) -> Option<&PopulateReport> {
        self.hydration.as_ref()
    }

    /// Controls that received listeners from this binding.
    pub fn newly_bound(&self) -> usize {
        self.newly_bound
    }

    /// React to an interaction with control `control_id` of `form`.
    ///
    /// When the control listens to `kind`, serializes the form, starts the
    /// save on the Tokio runtime and publishes the change. The save is not
    /// awaited; its outcome is available through the returned handle and is
    /// logged on failure. Saves are not ordered: the cache reflects whichever
    /// response lands last.
    pub fn handle(
        &self,
        form: &Form,
        control_id: &str,
        kind: InteractionKind,
    ) -> Option<JoinHandle<Result<SaveOutcome>>> {
        let listening = form
            .control(control_id)
            .is_some_and(|control| control.listens_to(kind));
        if !listening {
            return None;
        }

        let form_data = serialize(form);

        let store = Arc::clone(&self.store);
        let strategy = Arc::clone(&self.strategy);
        let payload = form_data.clone();
        let save = tokio::spawn(async move {
            let result = strategy.save(&store, payload).await;
            if let Err(e) = &result {
                tracing::error!(store_id = %store.store_id(), error = %e, "Form save failed");
            }
            result
        });

        self.events
            .publish(StoreEvent::for_store(self.store.store_id(), form_data));
        Some(save)
    }
}
