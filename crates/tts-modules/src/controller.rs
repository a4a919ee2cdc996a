//! Per-module page controller.

use std::sync::Arc;

use serde_json::Value;
use tts_forms::{
    Form, FormBinding, PersistenceBinder, PopulateReport, StoreEvent, Subscription, populate,
    serialize,
};
use tts_persistence::{
    DataStore, JsonObject, LossesOperation, PersistenceContext, ProcessRequest,
    TRANSFORMER_INPUTS_STORE,
};

use crate::catalog::ModuleId;
use crate::error::{ModuleError, Result};
use crate::info_panel::{TransformerInfoPanel, basic_data};

/// Drives one module page: its form, its store and the transformer summary.
#[derive(Debug)]
pub struct ModuleController {
    module: ModuleId,
    context: Arc<PersistenceContext>,
    store: Arc<DataStore>,
    panel: TransformerInfoPanel,
}

impl ModuleController {
    pub fn new(module: ModuleId, context: Arc<PersistenceContext>) -> Self {
        let store = context.get_store(module.store_id());
        Self {
            module,
            context,
            store,
            panel: TransformerInfoPanel::from_store_value(&Value::Object(JsonObject::new())),
        }
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    pub fn panel(&self) -> &TransformerInfoPanel {
        &self.panel
    }

    /// Bind `form` to the module store and load the transformer summary.
    pub async fn attach(&mut self, binder: &PersistenceBinder, form: &mut Form) -> FormBinding {
        let binding = binder.bind(form, self.module.store_id()).await;
        self.refresh_panel(None).await;
        binding
    }

    /// Populate `form` from the module's saved `formData`.
    ///
    /// Returns `None` when nothing was saved yet.
    pub async fn hydrate(&self, form: &mut Form) -> Option<PopulateReport> {
        let data = self.store.get_data().await;
        let Some(Value::Object(form_data)) = data.get("formData") else {
            tracing::debug!(module = %self.module, "Nothing saved for module");
            return None;
        };
        Some(populate(form, form_data))
    }

    /// Rebuild the summary from the stored transformer inputs, overlaid with
    /// `latest` when the change has not reached the store yet.
    pub async fn refresh_panel(&mut self, latest: Option<&JsonObject>) -> &TransformerInfoPanel {
        let stored = self
            .context
            .get_store(TRANSFORMER_INPUTS_STORE)
            .get_data()
            .await;
        let mut data = basic_data(&stored);
        if let Some(latest) = latest {
            data.extend(latest.iter().map(|(key, value)| (key.clone(), value.clone())));
        }
        self.panel = TransformerInfoPanel::from_store_value(&Value::Object(data));
        &self.panel
    }

    /// React to a store event. Returns whether the event concerned this module.
    ///
    /// Canonical input changes refresh the summary and re-hydrate `form`;
    /// other modules' local changes are ignored.
    pub async fn handle_event(&mut self, event: &StoreEvent, form: &mut Form) -> bool {
        match event {
            StoreEvent::CanonicalInputsChanged { form_data } => {
                tracing::debug!(module = %self.module, "Transformer inputs changed");
                self.refresh_panel(Some(form_data)).await;
                self.hydrate(form).await;
                true
            }
            StoreEvent::ModuleLocalChanged { .. } => false,
        }
    }

    /// Handle every queued event. Returns the number that concerned this module.
    pub async fn drain_events(&mut self, subscription: &Subscription, form: &mut Form) -> usize {
        let mut handled = 0;
        while let Some(event) = subscription.try_next() {
            if self.handle_event(&event, form).await {
                handled += 1;
            }
        }
        handled
    }

    /// Run the module calculation on the server and store its results.
    ///
    /// The request carries the transformer inputs as `basicData` and
    /// `module_data` as `moduleData`; the returned `results` are merged into
    /// the module store under `results`. Losses go through
    /// [`process_losses`](Self::process_losses) instead.
    pub async fn process(&self, module_data: JsonObject) -> Result<Value> {
        if !self.module.is_processable() {
            return Err(ModuleError::NotProcessable {
                module: self.module.to_string(),
            });
        }
        if self.module == ModuleId::Losses {
            return Err(ModuleError::OperationRequired {
                module: self.module.to_string(),
            });
        }

        let basic = self.transformer_data().await?;
        let request = ProcessRequest::new(Value::Object(basic), Value::Object(module_data));
        let results = self.submit(&request).await?;

        let mut patch = JsonObject::new();
        patch.insert("results".to_string(), results.clone());
        let outcome = self.store.update_data(&patch).await?;
        tracing::info!(module = %self.module, ?outcome, "Module results stored");
        Ok(results)
    }

    /// Run one losses calculation.
    ///
    /// `data` holds the transformer inputs overlaid with `module_data`. The
    /// results are kept per operation under `results`, so no-load and load
    /// results do not overwrite each other.
    pub async fn process_losses(
        &self,
        operation: LossesOperation,
        module_data: JsonObject,
    ) -> Result<Value> {
        if self.module != ModuleId::Losses {
            return Err(ModuleError::OperationNotSupported {
                module: self.module.to_string(),
                operation: operation.as_str(),
            });
        }

        let basic = self.transformer_data().await?;
        let mut combined = basic.clone();
        combined.extend(module_data.iter().map(|(key, value)| (key.clone(), value.clone())));
        let request = ProcessRequest::new(Value::Object(basic), Value::Object(module_data))
            .with_operation(operation, Value::Object(combined));
        let results = self.submit(&request).await?;

        let current = self.store.get_data().await;
        let mut by_operation = match current.get("results") {
            Some(Value::Object(existing)) => existing.clone(),
            _ => JsonObject::new(),
        };
        by_operation.insert(operation.as_str().to_string(), results.clone());
        let mut patch = JsonObject::new();
        patch.insert("results".to_string(), Value::Object(by_operation));
        let outcome = self.store.update_data(&patch).await?;
        tracing::info!(module = %self.module, operation = operation.as_str(), ?outcome, "Losses results stored");
        Ok(results)
    }

    /// The non-empty `formData` of the transformer inputs.
    async fn transformer_data(&self) -> Result<JsonObject> {
        let transformer = self
            .context
            .get_store(TRANSFORMER_INPUTS_STORE)
            .get_data()
            .await;
        match transformer.get("formData") {
            Some(Value::Object(form_data)) if !form_data.is_empty() => Ok(form_data.clone()),
            _ => Err(ModuleError::MissingTransformerData),
        }
    }

    async fn submit(&self, request: &ProcessRequest) -> Result<Value> {
        Ok(self
            .context
            .remote()
            .process_module(self.module.store_id(), request)
            .await?)
    }

    /// [`process`](Self::process) with the current contents of `form`.
    pub async fn process_form(&self, form: &Form) -> Result<Value> {
        self.process(serialize(form)).await
    }

    /// [`process_losses`](Self::process_losses) with the current contents of `form`.
    pub async fn process_losses_form(
        &self,
        operation: LossesOperation,
        form: &Form,
    ) -> Result<Value> {
        self.process_losses(operation, serialize(form)).await
    }
}
