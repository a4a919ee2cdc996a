//! Dependent insulation dropdowns.
//!
//! The standard selector drives the voltage class lists; each winding's
//! voltage class drives its NBI, SIL and test voltage lists. Connection
//! selectors decide whether the neutral bushing fields are shown.

use tts_forms::{DropdownOption, Form};

use crate::error::Result;
use crate::table::{InsulationLevel, InsulationTable, LevelOptions, StandardFamily};
use crate::visibility::{neutral_visible, sil_visible};

/// Id of the standard selector.
pub const STANDARD_FIELD: &str = "norma_iso";

/// A transformer winding and its field id suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winding {
    /// High voltage.
    At,
    /// Low voltage.
    Bt,
    Terciario,
}

impl Winding {
    pub const ALL: [Self; 3] = [Self::At, Self::Bt, Self::Terciario];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::At => "at",
            Self::Bt => "bt",
            Self::Terciario => "terciario",
        }
    }

    pub fn voltage_class_field(self) -> String {
        format!("classe_tensao_{}", self.prefix())
    }

    pub fn nbi_field(self) -> String {
        format!("nbi_{}", self.prefix())
    }

    pub fn sil_field(self) -> String {
        format!("sil_{}", self.prefix())
    }

    pub fn applied_voltage_field(self) -> String {
        format!("teste_tensao_aplicada_{}", self.prefix())
    }

    /// Only the high voltage winding carries an induced voltage test.
    pub fn induced_voltage_field(self) -> Option<String> {
        matches!(self, Self::At).then(|| format!("teste_tensao_induzida_{}", self.prefix()))
    }

    pub fn connection_field(self) -> String {
        format!("conexao_{}", self.prefix())
    }

    pub fn neutral_class_field(self) -> String {
        format!("tensao_bucha_neutro_{}", self.prefix())
    }

    pub fn neutral_nbi_field(self) -> String {
        format!("nbi_neutro_{}", self.prefix())
    }

    pub fn neutral_sil_field(self) -> String {
        format!("sil_neutro_{}", self.prefix())
    }
}

/// Keeps the insulation dropdowns of a form consistent with the table.
#[derive(Debug, Clone, Copy)]
pub struct DependentDropdownResolver<'t> {
    table: &'t InsulationTable,
}

impl DependentDropdownResolver<'static> {
    /// Resolver over the embedded table.
    pub fn embedded() -> Result<Self> {
        Ok(Self::new(InsulationTable::embedded()?))
    }
}

impl<'t> DependentDropdownResolver<'t> {
    pub fn new(table: &'t InsulationTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'t InsulationTable {
        self.table
    }

    /// Family selected in the form; IEC when there is no selector.
    pub fn standard(&self, form: &Form) -> StandardFamily {
        StandardFamily::from_selector(form.value(STANDARD_FIELD).unwrap_or_default())
    }

    /// Populate every dependent list from the current form state.
    ///
    /// Run after hydration so restored selections survive the rebuilds.
    pub fn initialize(&self, form: &mut Form) {
        tracing::debug!(form = form.id(), "Initializing insulation dropdowns");
        self.on_standard_changed(form);
    }

    /// Rebuild the voltage class lists, then every winding's levels.
    pub fn on_standard_changed(&self, form: &mut Form) {
        let family = self.standard(form);
        let classes = self.table.voltage_class_options(family);
        tracing::debug!(%family, classes = classes.len(), "Refreshing voltage classes");

        for winding in Winding::ALL {
            rebuild(form, &winding.voltage_class_field(), &classes);
            rebuild(form, &winding.neutral_class_field(), &classes);
        }
        for winding in Winding::ALL {
            self.on_voltage_class_changed(form, winding);
        }
    }

    /// Rebuild the level lists of `winding` for its selected voltage class.
    pub fn on_voltage_class_changed(&self, form: &mut Form, winding: Winding) {
        let family = self.standard(form);
        let um_kv = parse_kv(form.value(&winding.voltage_class_field()));
        let options = LevelOptions::for_level(self.level(family, um_kv), family);

        rebuild(form, &winding.nbi_field(), &options.nbi);
        rebuild_sil(form, &winding.sil_field(), &options);
        rebuild(form, &winding.applied_voltage_field(), &options.applied_voltage);
        if let Some(induced) = winding.induced_voltage_field() {
            rebuild(form, &induced, &options.induced_voltage);
        }

        let show_sil = sil_visible(family, um_kv, options.sil_applicable);
        set_shown(form, &winding.sil_field(), show_sil);
        tracing::trace!(winding = winding.prefix(), ?um_kv, show_sil, "Voltage class resolved");

        self.refresh_neutral_levels(form, winding, &options);
        self.on_connection_changed(form, winding);
    }

    /// Rebuild the neutral NBI and SIL lists for the selected neutral class.
    pub fn on_neutral_class_changed(&self, form: &mut Form, winding: Winding) {
        let family = self.standard(form);
        let um_kv = parse_kv(form.value(&winding.voltage_class_field()));
        let options = LevelOptions::for_level(self.level(family, um_kv), family);

        self.refresh_neutral_levels(form, winding, &options);
        self.on_connection_changed(form, winding);
    }

    /// Show or hide the neutral fields of `winding`.
    ///
    /// Hidden neutral fields are cleared. Forms without a connection selector
    /// for the winding are left alone.
    pub fn on_connection_changed(&self, form: &mut Form, winding: Winding) {
        let Some(connection) = form.value(&winding.connection_field()) else {
            return;
        };
        let has_neutral = neutral_visible(connection);

        set_shown(form, &winding.neutral_class_field(), has_neutral);
        set_shown(form, &winding.neutral_nbi_field(), has_neutral);
        if !has_neutral {
            set_shown(form, &winding.neutral_sil_field(), false);
            return;
        }

        let family = self.standard(form);
        let neutral_kv = parse_kv(form.value(&winding.neutral_class_field()));
        let sil_applicable = self
            .level(family, neutral_kv)
            .is_some_and(|level| !level.switching_impulse_kvp(family).is_empty());
        set_shown(
            form,
            &winding.neutral_sil_field(),
            sil_visible(family, neutral_kv, sil_applicable),
        );
    }

    /// Dispatch a change of `control_id`. Returns `false` for controls that
    /// drive nothing.
    pub fn handle_change(&self, form: &mut Form, control_id: &str) -> bool {
        if control_id == STANDARD_FIELD {
            self.on_standard_changed(form);
            return true;
        }
        for winding in Winding::ALL {
            if control_id == winding.voltage_class_field() {
                self.on_voltage_class_changed(form, winding);
                return true;
            }
            if control_id == winding.neutral_class_field() {
                self.on_neutral_class_changed(form, winding);
                return true;
            }
            if control_id == winding.connection_field() {
                self.on_connection_changed(form, winding);
                return true;
            }
        }
        false
    }

    fn level(&self, family: StandardFamily, um_kv: Option<f64>) -> Option<&'t InsulationLevel> {
        um_kv.and_then(|kv| self.table.find(family, kv))
    }

    // Without a neutral class of its own the neutral lists mirror the winding's.
    fn refresh_neutral_levels(&self, form: &mut Form, winding: Winding, winding_options: &LevelOptions) {
        let family = self.standard(form);
        let neutral_kv = parse_kv(form.value(&winding.neutral_class_field()));
        let neutral_options = self
            .level(family, neutral_kv)
            .map(|level| LevelOptions::for_level(Some(level), family));
        let options = neutral_options.as_ref().unwrap_or(winding_options);

        rebuild(form, &winding.neutral_nbi_field(), &options.nbi);
        rebuild_sil(form, &winding.neutral_sil_field(), options);
    }
}

fn parse_kv(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|text| text.trim().parse::<f64>().ok())
        .filter(|kv| kv.is_finite() && *kv > 0.0)
}

fn rebuild(form: &mut Form, id: &str, options: &[DropdownOption]) {
    if let Some(dropdown) = form.dropdown_mut(id) {
        dropdown.rebuild(options.iter().cloned(), true, None);
    }
}

// "Not Applicable" already is the placeholder of a class without SIL.
fn rebuild_sil(form: &mut Form, id: &str, options: &LevelOptions) {
    if let Some(dropdown) = form.dropdown_mut(id) {
        dropdown.rebuild(options.sil.iter().cloned(), options.sil_applicable, None);
    }
}

fn set_shown(form: &mut Form, id: &str, shown: bool) {
    if let Some(control) = form.control_mut(id) {
        control.set_visible(shown);
        if !shown {
            control.clear();
        }
    }
}
