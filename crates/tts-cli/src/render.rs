//! Rendering of command output.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use tts_forms::DropdownOption;
use tts_persistence::{PersistError, RestoreReport, SaveOutcome};
use tts_standards::{InsulationLevel, InsulationTable, LevelOptions, StandardFamily, format_kv};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

/// One row per voltage class of `family` with its rated levels.
pub fn classes_table(table: &InsulationTable, family: StandardFamily) -> Table {
    let mut out = Table::new();
    out.set_header(vec![
        "Um (kV)",
        "NBI (kVp)",
        sil_header(family),
        "Applied (kVrms)",
        "Induced (kVrms)",
    ]);
    apply_table_style(&mut out);

    for um_kv in table.voltage_classes(family) {
        let Some(level) = table.find(family, um_kv) else {
            continue;
        };
        out.add_row(vec![
            format_kv(um_kv),
            join_kv(&level.bil_kvp),
            join_kv(&level.switching_impulse_kvp(family)),
            join_kv(&level.acsd_kv_rms),
            join_kv(&level.acld_kv_rms),
        ]);
    }
    out
}

/// The dropdown options offered for one voltage class.
pub fn level_table(level: &InsulationLevel, family: StandardFamily) -> Table {
    let options = LevelOptions::for_level(Some(level), family);
    let mut out = Table::new();
    out.set_header(vec!["Field", "Options"]);
    apply_table_style(&mut out);
    out.add_row(vec!["Standard".to_string(), level.standard.clone()]);
    out.add_row(vec!["Um".to_string(), format!("{} kV", format_kv(level.um_kv))]);
    out.add_row(vec!["NBI".to_string(), labels(&options.nbi)]);
    out.add_row(vec![sil_header(family).to_string(), labels(&options.sil)]);
    out.add_row(vec!["Applied voltage".to_string(), labels(&options.applied_voltage)]);
    out.add_row(vec!["Induced voltage".to_string(), labels(&options.induced_voltage)]);
    out
}

pub fn stores_table(store_ids: &[String]) -> Table {
    let mut out = Table::new();
    out.set_header(vec!["Store"]);
    apply_table_style(&mut out);
    for id in store_ids {
        out.add_row(vec![id.as_str()]);
    }
    out
}

pub fn restore_summary(report: &RestoreReport) -> String {
    format!(
        "Restored {} store(s): {} ({} stores on the server)",
        report.restored_stores.len(),
        report.restored_stores.join(", "),
        report.total_stores
    )
}

fn labels(options: &[DropdownOption]) -> String {
    options
        .iter()
        .map(|option| option.label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn sil_header(family: StandardFamily) -> &'static str {
    match family {
        StandardFamily::Ieee => "BSL (kVp)",
        StandardFamily::Iec | StandardFamily::Nbr => "SIL (kVp)",
    }
}

fn join_kv(values: &[f64]) -> String {
    if values.is_empty() {
        return "-".to_string();
    }
    values
        .iter()
        .map(|value| format_kv(*value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// User-facing description of a persistence failure with its suggestion.
pub fn explain(error: &PersistError) -> String {
    match error.suggestion() {
        Some(suggestion) => format!("{} {suggestion}", error.user_message()),
        None => error.user_message(),
    }
}

pub fn describe_outcome(outcome: SaveOutcome) -> &'static str {
    match outcome {
        SaveOutcome::Remote => "saved to the backend",
        SaveOutcome::LocalFallback => "saved locally (backend unavailable)",
        SaveOutcome::EmergencyLocal => "backend write failed, saved locally",
    }
}
