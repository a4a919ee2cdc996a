//! Forms and auto-save for Transformer Test Studio.
//!
//! - [`form`]: controls and forms addressed by id.
//! - [`dropdown`]: select options with placeholder and selection restore.
//! - [`binding`]: form ⇄ flat JSON object conversion.
//! - [`events`]: store change notifications between modules.
//! - [`binder`]: hydrate-then-listen wiring of a form to a store.

pub mod binder;
pub mod binding;
pub mod dropdown;
pub mod events;
pub mod form;

pub use binder::{
    ComputeTransformerInputs, FormBinding, MergeFormData, PersistenceBinder, SaveStrategy,
};
pub use binding::{PopulateReport, form_text, populate, serialize};
pub use dropdown::{Dropdown, DropdownOption, PLACEHOLDER_LABEL};
pub use events::{EventBus, MODULE_DATA_UPDATED, StoreEvent, Subscription, TRANSFORMER_DATA_UPDATED};
pub use form::{Control, ControlKind, Document, Form, InteractionKind, Listeners};
