//! Module catalogue and module data reset.

use std::fmt;
use std::str::FromStr;

use tts_persistence::{LocalStore, PersistenceContext, SaveOutcome, clean_module_cache};

use crate::error::{ModuleError, Result};

/// Cache version recorded by [`clean_startup_caches`].
pub const MODULE_CACHE_VERSION: &str = "1.0.0";

/// Modules whose local keys are cleaned at startup.
pub const VERSIONED_CACHE_MODULES: [&str; 2] = ["history", "standards"];

/// An application module and the store it persists to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleId {
    TransformerInputs,
    Losses,
    Impulse,
    AppliedVoltage,
    InducedVoltage,
    ShortCircuit,
    TemperatureRise,
    DielectricAnalysis,
    /// Saved sessions (the history page).
    History,
    Standards,
}

impl ModuleId {
    pub const ALL: [Self; 10] = [
        Self::TransformerInputs,
        Self::Losses,
        Self::Impulse,
        Self::AppliedVoltage,
        Self::InducedVoltage,
        Self::ShortCircuit,
        Self::TemperatureRise,
        Self::DielectricAnalysis,
        Self::History,
        Self::Standards,
    ];

    /// Name used by navigation and the reset actions (`applied_voltage`).
    pub fn name(self) -> &'static str {
        match self {
            Self::TransformerInputs => "transformer_inputs",
            Self::Losses => "losses",
            Self::Impulse => "impulse",
            Self::AppliedVoltage => "applied_voltage",
            Self::InducedVoltage => "induced_voltage",
            Self::ShortCircuit => "short_circuit",
            Self::TemperatureRise => "temperature_rise",
            Self::DielectricAnalysis => "dielectric_analysis",
            Self::History => "history",
            Self::Standards => "standards",
        }
    }

    /// Backing store id (`appliedVoltage`).
    pub fn store_id(self) -> &'static str {
        match self {
            Self::TransformerInputs => "transformerInputs",
            Self::Losses => "losses",
            Self::Impulse => "impulse",
            Self::AppliedVoltage => "appliedVoltage",
            Self::InducedVoltage => "inducedVoltage",
            Self::ShortCircuit => "shortCircuit",
            Self::TemperatureRise => "temperatureRise",
            Self::DielectricAnalysis => "dielectricAnalysis",
            Self::History => "sessions",
            Self::Standards => "standards",
        }
    }

    /// Whether the server has a calculation for this module.
    pub fn is_processable(self) -> bool {
        !matches!(self, Self::TransformerInputs | Self::History | Self::Standards)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|module| module.name() == name)
    }

    pub fn from_store_id(store_id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|module| module.store_id() == store_id)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts a module name or a store id.
impl FromStr for ModuleId {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
            .or_else(|| Self::from_store_id(s))
            .ok_or_else(|| ModuleError::UnknownModule {
                name: s.to_string(),
            })
    }
}

/// Store id for a module name. Names outside the catalogue are used as
/// store ids unchanged.
pub fn store_id_for(module: &str) -> &str {
    ModuleId::from_name(module).map_or(module, |known| known.store_id())
}

/// Delete one module's data remotely and locally and drop its cached value.
pub async fn clear_module_data(context: &PersistenceContext, module: &str) -> Result<SaveOutcome> {
    let store_id = store_id_for(module);
    tracing::info!(%module, %store_id, "Clearing module data");
    Ok(context.clear_store(store_id).await?)
}

/// Delete every store remotely and locally and forget all data stores.
pub async fn clear_all_modules_data(context: &PersistenceContext) -> Result<SaveOutcome> {
    tracing::info!("Clearing data of all modules");
    Ok(context.clear_all().await?)
}

/// Drop stale local keys of [`VERSIONED_CACHE_MODULES`]. Returns the number
/// of keys removed.
pub fn clean_startup_caches(local: &dyn LocalStore) -> Result<usize> {
    let mut removed = 0;
    for module in VERSIONED_CACHE_MODULES {
        removed += clean_module_cache(local, module, MODULE_CACHE_VERSION)?;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use tts_persistence::MemoryLocalStore;

    use super::*;

    #[test]
    fn test_name_and_store_id_mapping() {
        assert_eq!(store_id_for("applied_voltage"), "appliedVoltage");
        assert_eq!(store_id_for("history"), "sessions");
        assert_eq!(store_id_for("customStore"), "customStore");
        assert_eq!("shortCircuit".parse::<ModuleId>().unwrap(), ModuleId::ShortCircuit);
        assert_eq!("losses".parse::<ModuleId>().unwrap(), ModuleId::Losses);
        assert!("nope".parse::<ModuleId>().is_err());
    }

    #[test]
    fn test_processable_modules() {
        let processable: Vec<_> = ModuleId::ALL
            .into_iter()
            .filter(|module| module.is_processable())
            .map(ModuleId::store_id)
            .collect();
        assert_eq!(
            processable,
            [
                "losses",
                "impulse",
                "appliedVoltage",
                "inducedVoltage",
                "shortCircuit",
                "temperatureRise",
                "dielectricAnalysis"
            ]
        );
    }

    #[test]
    fn test_startup_cache_cleanup_runs_once() {
        let local = MemoryLocalStore::new();
        local.set("history_filters", "{}").unwrap();
        local.set("store_standards", "{}").unwrap();
        local.set("store_losses", "{}").unwrap();

        assert_eq!(clean_startup_caches(&local).unwrap(), 2);
        assert_eq!(local.get("store_losses").unwrap().as_deref(), Some("{}"));
        assert_eq!(clean_startup_caches(&local).unwrap(), 0);
    }
}
