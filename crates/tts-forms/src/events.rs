//! Typed publish/subscribe channel for store changes.
//!
//! Every bound form publishes a [`StoreEvent`] after each edit. Changes to
//! the canonical transformer inputs are the cross-module signal; changes to
//! any other store are module-local and ignored by other modules.

use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, TryIter};
use tts_persistence::{JsonObject, TRANSFORMER_INPUTS_STORE};

/// Event name of [`StoreEvent::CanonicalInputsChanged`].
pub const TRANSFORMER_DATA_UPDATED: &str = "transformerDataUpdated";

/// Event name of [`StoreEvent::ModuleLocalChanged`].
pub const MODULE_DATA_UPDATED: &str = "moduleDataUpdated";

/// A store's form data changed.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The canonical transformer inputs changed.
    CanonicalInputsChanged { form_data: JsonObject },
    /// A module's own store changed.
    ModuleLocalChanged {
        store_id: String,
        form_data: JsonObject,
    },
}

impl StoreEvent {
    /// The event for a change of `store_id`.
    pub fn for_store(store_id: &str, form_data: JsonObject) -> Self {
        if store_id == TRANSFORMER_INPUTS_STORE {
            Self::CanonicalInputsChanged { form_data }
        } else {
            Self::ModuleLocalChanged {
                store_id: store_id.to_string(),
                form_data,
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CanonicalInputsChanged { .. } => TRANSFORMER_DATA_UPDATED,
            Self::ModuleLocalChanged { .. } => MODULE_DATA_UPDATED,
        }
    }

    pub fn store_id(&self) -> &str {
        match self {
            Self::CanonicalInputsChanged { .. } => TRANSFORMER_INPUTS_STORE,
            Self::ModuleLocalChanged { store_id, .. } => store_id,
        }
    }

    pub fn form_data(&self) -> &JsonObject {
        match self {
            Self::CanonicalInputsChanged { form_data }
            | Self::ModuleLocalChanged { form_data, .. } => form_data,
        }
    }
}

/// Receiving end of an [`EventBus`] subscription.
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<StoreEvent>,
}

impl Subscription {
    /// Next pending event, if any.
    pub fn try_next(&self) -> Option<StoreEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drain all pending events.
    pub fn pending(&self) -> TryIter<'_, StoreEvent> {
        self.receiver.try_iter()
    }
}

/// Fan-out of [`StoreEvent`]s to every live subscription.
///
/// Publishing enqueues the event for all subscribers before returning.
/// Dropped subscriptions are pruned on the next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<StoreEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        Subscription { receiver }
    }

    /// Deliver `event`; returns the number of subscribers reached.
    pub fn publish(&self, event: StoreEvent) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
        tracing::debug!(event = event.name(), store_id = %event.store_id(), delivered = subscribers.len(), "Published store event");
        subscribers.len()
    }
}
