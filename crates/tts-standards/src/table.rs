//! Insulation level lookup table.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tts_forms::DropdownOption;

use crate::embedded::INSULATION_LEVELS_JSON;
use crate::error::{Result, StandardsError};

/// Label of the single SIL option offered when a class has no switching impulse level.
pub const NOT_APPLICABLE_LABEL: &str = "Not Applicable";

/// Family of standards an insulation entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StandardFamily {
    #[default]
    Iec,
    Nbr,
    Ieee,
}

impl StandardFamily {
    pub const ALL: [Self; 3] = [Self::Iec, Self::Nbr, Self::Ieee];

    /// Prefix that entry `standard` names start with.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Iec => "IEC",
            Self::Nbr => "NBR",
            Self::Ieee => "IEEE",
        }
    }

    /// Family for the value of the standard selector; empty or unknown means IEC.
    pub fn from_selector(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    /// Whether entry name `standard` belongs to this family.
    pub fn matches(self, standard: &str) -> bool {
        standard.to_uppercase().starts_with(self.prefix())
    }
}

impl fmt::Display for StandardFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for StandardFamily {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|family| upper.starts_with(family.prefix()))
            .ok_or_else(|| format!("unknown standard '{s}' (expected IEC, NBR or IEEE)"))
    }
}

/// A rated value that may be a sentinel such as `"NA_SIL"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatedValue {
    Kv(f64),
    Sentinel(String),
}

/// Insulation levels of one voltage class under one standard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsulationLevel {
    pub standard: String,
    pub um_kv: f64,
    /// Lightning impulse (NBI/BIL), kV peak.
    #[serde(default)]
    pub bil_kvp: Vec<f64>,
    /// Switching impulse (SIL), kV peak. May hold `null` or `"NA_SIL"`.
    #[serde(default)]
    pub sil_kvp: Vec<Option<RatedValue>>,
    /// Switching impulse under IEEE naming (BSL), kV peak.
    #[serde(default)]
    pub bsl_kvp: Vec<f64>,
    /// Applied voltage test, kV rms.
    #[serde(default)]
    pub acsd_kv_rms: Vec<f64>,
    /// Induced voltage test, kV rms.
    #[serde(default)]
    pub acld_kv_rms: Vec<f64>,
}

impl InsulationLevel {
    /// Switching impulse levels, sentinels removed. IEEE entries use BSL.
    pub fn switching_impulse_kvp(&self, family: StandardFamily) -> Vec<f64> {
        match family {
            StandardFamily::Ieee => self.bsl_kvp.clone(),
            StandardFamily::Iec | StandardFamily::Nbr => self
                .sil_kvp
                .iter()
                .filter_map(|value| match value {
                    Some(RatedValue::Kv(kv)) => Some(*kv),
                    Some(RatedValue::Sentinel(_)) | None => None,
                })
                .collect(),
        }
    }
}

/// Dropdown options derived from one insulation entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelOptions {
    pub nbi: Vec<DropdownOption>,
    /// A single "Not Applicable" option when the class has no SIL.
    pub sil: Vec<DropdownOption>,
    pub sil_applicable: bool,
    pub applied_voltage: Vec<DropdownOption>,
    pub induced_voltage: Vec<DropdownOption>,
}

impl LevelOptions {
    /// Options for `level`; `None` yields empty lists and a "Not Applicable" SIL.
    pub fn for_level(level: Option<&InsulationLevel>, family: StandardFamily) -> Self {
        let Some(level) = level else {
            return Self {
                sil: vec![not_applicable()],
                ..Self::default()
            };
        };

        let sil_values = level.switching_impulse_kvp(family);
        let sil_applicable = !sil_values.is_empty();
        let sil = if sil_applicable {
            kv_options(&sil_values, "kVp")
        } else {
            vec![not_applicable()]
        };

        Self {
            nbi: kv_options(&level.bil_kvp, "kVp"),
            sil,
            sil_applicable,
            applied_voltage: kv_options(&level.acsd_kv_rms, "kVrms"),
            induced_voltage: kv_options(&level.acld_kv_rms, "kVrms"),
        }
    }
}

/// Format a kV value the way option values are written (`72.5`, `145`).
pub fn format_kv(value: f64) -> String {
    value.to_string()
}

/// One option per value, labelled with `unit`.
pub fn kv_options(values: &[f64], unit: &str) -> Vec<DropdownOption> {
    values
        .iter()
        .map(|value| {
            let text = format_kv(*value);
            DropdownOption::new(text.clone(), format!("{text} {unit}"))
        })
        .collect()
}

fn not_applicable() -> DropdownOption {
    DropdownOption::new("", NOT_APPLICABLE_LABEL)
}

#[derive(Deserialize)]
struct TableFile {
    insulation_levels: Vec<InsulationLevel>,
}

static EMBEDDED: OnceLock<InsulationTable> = OnceLock::new();

/// Immutable insulation level table.
#[derive(Debug, Clone, PartialEq)]
pub struct InsulationTable {
    levels: Vec<InsulationLevel>,
}

impl InsulationTable {
    /// Parse a table in the `{"insulation_levels": [...]}` layout.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: TableFile =
            serde_json::from_str(json).map_err(|source| StandardsError::Parse { source })?;

        if file.insulation_levels.is_empty() {
            return Err(StandardsError::EmptyTable);
        }
        if let Some(bad) = file
            .insulation_levels
            .iter()
            .find(|level| !(level.um_kv.is_finite() && level.um_kv > 0.0))
        {
            return Err(StandardsError::InvalidVoltageClass {
                standard: bad.standard.clone(),
                um_kv: bad.um_kv,
            });
        }

        tracing::debug!(entries = file.insulation_levels.len(), "Loaded insulation table");
        Ok(Self {
            levels: file.insulation_levels,
        })
    }

    /// The table embedded in this crate, parsed once per process.
    pub fn embedded() -> Result<&'static Self> {
        if let Some(table) = EMBEDDED.get() {
            return Ok(table);
        }
        let table = Self::from_json(INSULATION_LEVELS_JSON)?;
        Ok(EMBEDDED.get_or_init(|| table))
    }

    pub fn levels(&self) -> &[InsulationLevel] {
        &self.levels
    }

    /// Distinct voltage classes of `family`, ascending.
    pub fn voltage_classes(&self, family: StandardFamily) -> Vec<f64> {
        let mut classes: Vec<f64> = self
            .levels
            .iter()
            .filter(|level| family.matches(&level.standard))
            .map(|level| level.um_kv)
            .collect();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        classes
    }

    /// Voltage class options (`"72.5"` labelled `"72.5 kV"`).
    pub fn voltage_class_options(&self, family: StandardFamily) -> Vec<DropdownOption> {
        kv_options(&self.voltage_classes(family), "kV")
    }

    /// The entry for `(family, um_kv)`.
    pub fn find(&self, family: StandardFamily, um_kv: f64) -> Option<&InsulationLevel> {
        self.levels.iter().find(|level| {
            family.matches(&level.standard) && (level.um_kv - um_kv).abs() < 1e-9
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> &'static InsulationTable {
        InsulationTable::embedded().unwrap()
    }

    #[test]
    fn test_family_parsing() {
        assert_eq!(StandardFamily::from_selector("ieee"), StandardFamily::Ieee);
        assert_eq!(StandardFamily::from_selector("NBR 5356"), StandardFamily::Nbr);
        assert_eq!(StandardFamily::from_selector(""), StandardFamily::Iec);
        assert!("ANSI".parse::<StandardFamily>().is_err());
        assert!(!StandardFamily::Iec.matches("IEEE C57.12.00"));
    }

    #[test]
    fn test_voltage_classes_sorted_and_distinct() {
        let classes = table().voltage_classes(StandardFamily::Iec);
        assert_eq!(classes.first(), Some(&3.6));
        assert!(classes.windows(2).all(|pair| pair[0] < pair[1]));

        let nbr = table().voltage_class_options(StandardFamily::Nbr);
        assert_eq!(nbr[0], DropdownOption::new("15", "15 kV"));
    }

    #[test]
    fn test_sil_sentinels_filtered() {
        let level = table().find(StandardFamily::Iec, 72.5).unwrap();
        let options = LevelOptions::for_level(Some(level), StandardFamily::Iec);

        assert!(!options.sil_applicable);
        assert_eq!(options.sil, vec![DropdownOption::new("", NOT_APPLICABLE_LABEL)]);
        assert_eq!(options.nbi, vec![DropdownOption::new("325", "325 kVp")]);
        assert_eq!(options.applied_voltage[0].label, "140 kVrms");
    }

    #[test]
    fn test_ieee_uses_bsl() {
        let level = table().find(StandardFamily::Ieee, 230.0).unwrap();
        assert_eq!(
            level.switching_impulse_kvp(StandardFamily::Ieee),
            vec![620.0, 685.0, 745.0]
        );
    }

    #[test]
    fn test_rejects_empty_and_invalid_tables() {
        assert!(matches!(
            InsulationTable::from_json(r#"{"insulation_levels": []}"#),
            Err(StandardsError::EmptyTable)
        ));
        assert!(matches!(
            InsulationTable::from_json(r#"{"insulation_levels": [{"standard": "IEC", "um_kv": -1}]}"#),
            Err(StandardsError::InvalidVoltageClass { .. })
        ));
        assert!(matches!(
            InsulationTable::from_json("[]"),
            Err(StandardsError::Parse { .. })
        ));
    }
}
