//! Controller of the canonical transformer inputs page.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tts_forms::{
    EventBus, Form, FormBinding, InteractionKind, PersistenceBinder, StoreEvent, form_text,
    populate,
};
use tts_persistence::{
    JsonObject, PersistenceContext, Result as PersistResult, SaveOutcome, TRANSFORMER_INPUTS_STORE,
    TransformerInputsShape, TypedStore,
};
use tts_standards::DependentDropdownResolver;

use crate::error::Result;

/// Wires the transformer inputs form to its store and insulation dropdowns.
#[derive(Debug, Clone)]
pub struct TransformerInputsController {
    events: Arc<EventBus>,
    store: TypedStore<TransformerInputsShape>,
    resolver: DependentDropdownResolver<'static>,
}

impl TransformerInputsController {
    /// Controller using the embedded insulation table.
    pub fn new(context: &PersistenceContext, events: Arc<EventBus>) -> Result<Self> {
        Ok(Self::with_resolver(
            context,
            events,
            DependentDropdownResolver::embedded()?,
        ))
    }

    pub fn with_resolver(
        context: &PersistenceContext,
        events: Arc<EventBus>,
        resolver: DependentDropdownResolver<'static>,
    ) -> Self {
        Self {
            events,
            store: TypedStore::named(context),
            resolver,
        }
    }

    pub fn resolver(&self) -> &DependentDropdownResolver<'static> {
        &self.resolver
    }

    /// Populate the dropdowns, hydrate and bind the form, then announce
    /// existing inputs to the other modules.
    ///
    /// Dependent selects only get their options once their voltage class is
    /// restored, so values they rejected during hydration are applied again
    /// after the dropdowns are resolved.
    pub async fn attach(&self, binder: &PersistenceBinder, form: &mut Form) -> Result<FormBinding> {
        self.resolver.initialize(form);
        let binding = binder.bind(form, TRANSFORMER_INPUTS_STORE).await;
        self.resolver.initialize(form);

        let shape = self.store.load().await?;
        if let Some(report) = binding.hydration().filter(|report| !report.unmatched.is_empty()) {
            let retry: JsonObject = report
                .unmatched
                .iter()
                .filter_map(|key| Some((key.clone(), shape.form_data.get(key)?.clone())))
                .collect();
            let second = populate(form, &retry);
            self.resolver.initialize(form);
            if !second.unmatched.is_empty() {
                tracing::warn!(fields = ?second.unmatched, "Saved insulation values not offered for the selected classes");
                // keep them selectable so the next save does not drop them
                for key in &second.unmatched {
                    if let (Some(value), Some(dropdown)) = (retry.get(key), form.dropdown_mut(key)) {
                        dropdown.set_value_or_insert_temporary(&form_text(value));
                    }
                }
            }
        }

        self.apply_nominal_currents(form, &shape);

        let resolved = shape.resolved();
        if !resolved.is_empty() {
            let receivers = self.events.publish(StoreEvent::CanonicalInputsChanged {
                form_data: resolved,
            });
            tracing::debug!(receivers, "Announced existing transformer inputs");
        }
        Ok(binding)
    }

    /// Route an interaction: resolve dependent dropdowns on committed
    /// changes, then save through the binding.
    pub fn handle(
        &self,
        binding: &FormBinding,
        form: &mut Form,
        control_id: &str,
        kind: InteractionKind,
    ) -> Option<JoinHandle<PersistResult<SaveOutcome>>> {
        if kind == InteractionKind::Change {
            self.resolver.handle_change(form, control_id);
        }
        binding.handle(form, control_id, kind)
    }

    /// Write the server-derived nominal currents into `form`. Returns the
    /// number of fields updated.
    pub async fn refresh_nominal_currents(&self, form: &mut Form) -> Result<usize> {
        let shape = self.store.load().await?;
        Ok(self.apply_nominal_currents(form, &shape))
    }

    /// Nominal currents currently stored, by field name.
    pub async fn nominal_currents(&self) -> Result<Vec<(&'static str, Value)>> {
        Ok(self.store.load().await?.nominal_currents())
    }

    fn apply_nominal_currents(&self, form: &mut Form, shape: &TransformerInputsShape) -> usize {
        let currents: JsonObject = shape
            .nominal_currents()
            .into_iter()
            .map(|(field, value)| (field.to_string(), value))
            .collect();
        if currents.is_empty() {
            return 0;
        }
        let report = populate(form, &currents);
        tracing::debug!(applied = report.applied.len(), "Nominal currents shown");
        report.applied.len()
    }
}
