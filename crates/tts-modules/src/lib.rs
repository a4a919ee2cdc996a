//! Module pages of Transformer Test Studio.
//!
//! - [`catalog`]: module names, their stores and data reset.
//! - [`info_panel`]: the transformer summary shown on module pages.
//! - [`inputs`]: the canonical transformer inputs page.
//! - [`controller`]: hydration, event handling and server calculations of
//!   one module page.

pub mod catalog;
pub mod controller;
pub mod error;
pub mod info_panel;
pub mod inputs;

pub use catalog::{
    MODULE_CACHE_VERSION, ModuleId, VERSIONED_CACHE_MODULES, clean_startup_caches,
    clear_all_modules_data, clear_module_data, store_id_for,
};
pub use controller::ModuleController;
pub use error::{ModuleError, Result};
pub use info_panel::{
    InfoRow, InfoSection, LOSSES_INHERITED_FIELDS, MISSING_VALUE, TransformerInfoPanel,
    basic_data, display_value,
};
pub use inputs::TransformerInputsController;
