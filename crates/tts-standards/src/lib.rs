//! Insulation levels and dependent dropdowns for Transformer Test Studio.
//!
//! - [`table`]: the IEC / NBR / IEEE insulation level table and the options
//!   derived from it.
//! - [`visibility`]: when SIL and neutral bushing fields are shown.
//! - [`resolver`]: keeps a form's class, NBI, SIL and test voltage
//!   dropdowns consistent as selections change.
//!
//! # Example
//!
//! ```rust,ignore
//! use tts_standards::{DependentDropdownResolver, Winding};
//!
//! let resolver = DependentDropdownResolver::embedded()?;
//! resolver.initialize(&mut form);
//!
//! form.set_value("classe_tensao_at", "245");
//! resolver.handle_change(&mut form, &Winding::At.voltage_class_field());
//! ```

pub mod embedded;
pub mod error;
pub mod resolver;
pub mod table;
pub mod visibility;

pub use error::{Result, StandardsError};
pub use resolver::{DependentDropdownResolver, STANDARD_FIELD, Winding};
pub use table::{
    InsulationLevel, InsulationTable, LevelOptions, NOT_APPLICABLE_LABEL, RatedValue,
    StandardFamily, format_kv, kv_options,
};
pub use visibility::{
    Connection, SIL_MIN_UM_KV_IEC, SIL_MIN_UM_KV_IEEE, neutral_visible, sil_threshold,
    sil_visible,
};
