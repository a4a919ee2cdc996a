//! Read-only transformer summary shown on every module page.

use std::fmt;

use serde_json::Value;
use tts_persistence::JsonObject;

/// Text shown for a field without a value.
pub const MISSING_VALUE: &str = "-";

/// Transformer inputs the losses calculations reuse.
pub const LOSSES_INHERITED_FIELDS: [&str; 6] = [
    "potencia_mva",
    "frequencia",
    "impedancia",
    "tensao_bt",
    "corrente_nominal_bt",
    "tipo_transformador",
];

type RowDef = (&'static str, &'static str, &'static str);

const SECTIONS: [(&str, &[RowDef]); 6] = [
    (
        "General",
        &[
            ("Power", "potencia_mva", "MVA"),
            ("Frequency", "frequencia", "Hz"),
            ("Type", "tipo_transformador", ""),
            ("Vector group", "grupo_ligacao", ""),
            ("Insulating liquid", "liquido_isolante", ""),
            ("Standard", "norma_iso", ""),
        ],
    ),
    (
        "Temperatures and weights",
        &[
            ("Top oil rise", "elevacao_oleo_topo", "°C"),
            ("Winding rise", "elevacao_enrol", "°C"),
            ("Active part", "peso_parte_ativa", "ton"),
            ("Tank and accessories", "peso_tanque_acessorios", "ton"),
            ("Oil", "peso_oleo", "ton"),
            ("Total", "peso_total", "ton"),
        ],
    ),
    (
        "High voltage",
        &[
            ("Voltage", "tensao_at", "kV"),
            ("Voltage class", "classe_tensao_at", "kV"),
            ("Nominal current", "corrente_nominal_at", "A"),
            ("Impedance", "impedancia", "%"),
            ("NBI", "nbi_at", "kVp"),
            ("SIL", "sil_at", "kVp"),
            ("Connection", "conexao_at", ""),
            ("Neutral class", "tensao_bucha_neutro_at", "kVp"),
            ("Neutral NBI", "nbi_neutro_at", "kVp"),
        ],
    ),
    (
        "Low voltage",
        &[
            ("Voltage", "tensao_bt", "kV"),
            ("Voltage class", "classe_tensao_bt", "kV"),
            ("Nominal current", "corrente_nominal_bt", "A"),
            ("NBI", "nbi_bt", "kVp"),
            ("SIL", "sil_bt", "kVp"),
            ("Connection", "conexao_bt", ""),
        ],
    ),
    (
        "Tertiary",
        &[
            ("Voltage", "tensao_terciario", "kV"),
            ("Voltage class", "classe_tensao_terciario", "kV"),
            ("Nominal current", "corrente_nominal_terciario", "A"),
            ("NBI", "nbi_terciario", "kVp"),
            ("Connection", "conexao_terciario", ""),
        ],
    ),
    (
        "Test voltages",
        &[
            ("Applied HV", "teste_tensao_aplicada_at", "kVrms"),
            ("Induced HV", "teste_tensao_induzida_at", "kVrms"),
            ("Applied LV", "teste_tensao_aplicada_bt", "kVrms"),
            ("Applied tertiary", "teste_tensao_aplicada_terciario", "kVrms"),
        ],
    ),
];

/// One labelled value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoRow {
    pub label: &'static str,
    pub field: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoSection {
    pub title: &'static str,
    pub rows: Vec<InfoRow>,
}

impl fmt::Display for InfoSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for row in &self.rows {
            writeln!(f, "  {}: {}", row.label, row.text)?;
        }
        Ok(())
    }
}

/// Summary of the canonical transformer inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformerInfoPanel {
    sections: Vec<InfoSection>,
    inherited_for_losses: Vec<&'static str>,
    has_data: bool,
}

impl TransformerInfoPanel {
    /// Build the panel from the `transformerInputs` store value.
    pub fn from_store_value(value: &Value) -> Self {
        let data = basic_data(value);

        let sections = SECTIONS
            .iter()
            .map(|&(title, rows)| InfoSection {
                title,
                rows: rows
                    .iter()
                    .map(|&(label, field, unit)| InfoRow {
                        label,
                        field,
                        text: display_value(data.get(field), unit),
                    })
                    .collect(),
            })
            .collect();

        let inherited_for_losses = LOSSES_INHERITED_FIELDS
            .into_iter()
            .filter(|field| data.get(*field).is_some_and(has_value))
            .collect();

        Self {
            sections,
            inherited_for_losses,
            has_data: !data.is_empty(),
        }
    }

    pub fn sections(&self) -> &[InfoSection] {
        &self.sections
    }

    pub fn section(&self, title: &str) -> Option<&InfoSection> {
        self.sections.iter().find(|section| section.title == title)
    }

    /// Displayed text of `field`.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.sections
            .iter()
            .flat_map(|section| &section.rows)
            .find(|row| row.field == field)
            .map(|row| row.text.as_str())
    }

    /// Losses inputs that carry a value and are highlighted on the losses page.
    pub fn inherited_for_losses(&self) -> &[&'static str] {
        &self.inherited_for_losses
    }

    pub fn has_data(&self) -> bool {
        self.has_data
    }
}

impl fmt::Display for TransformerInfoPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            write!(f, "{section}")?;
        }
        Ok(())
    }
}

/// The transformer data inside a `transformerInputs` value.
///
/// Prefers `formData`, then `inputs.dados_basicos`, then the root object.
pub fn basic_data(value: &Value) -> JsonObject {
    let candidate = value
        .get("formData")
        .filter(|form_data| form_data.is_object())
        .or_else(|| {
            value
                .get("inputs")
                .and_then(|inputs| inputs.get("dados_basicos"))
                .filter(|basic| basic.is_object())
        })
        .unwrap_or(value);

    match candidate {
        Value::Object(map) => map.clone(),
        _ => JsonObject::new(),
    }
}

/// Numbers with two decimals, text as is, both followed by `unit`.
pub fn display_value(value: Option<&Value>, unit: &str) -> String {
    let text = match value {
        Some(Value::Number(n)) => match n.as_f64() {
            Some(number) => format!("{number:.2}"),
            None => n.to_string(),
        },
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Bool(true)) => "true".to_string(),
        Some(other @ (Value::Array(_) | Value::Object(_))) => other.to_string(),
        _ => return MISSING_VALUE.to_string(),
    };

    if unit.is_empty() {
        text
    } else {
        format!("{text} {unit}")
    }
}

fn has_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(Some(&json!(50)), "MVA"), "50.00 MVA");
        assert_eq!(display_value(Some(&json!(209.1846)), "A"), "209.18 A");
        assert_eq!(display_value(Some(&json!("145")), "kV"), "145 kV");
        assert_eq!(display_value(Some(&json!("Trifásico")), ""), "Trifásico");
        assert_eq!(display_value(Some(&json!("")), "kV"), "-");
        assert_eq!(display_value(Some(&json!(null)), "kV"), "-");
        assert_eq!(display_value(None, ""), "-");
    }

    #[test]
    fn test_basic_data_precedence() {
        let nested = json!({"inputs": {"dados_basicos": {"potencia_mva": 10}}, "potencia_mva": 99});
        assert_eq!(basic_data(&nested)["potencia_mva"], json!(10));

        let both = json!({"formData": {"potencia_mva": 20}, "inputs": {"dados_basicos": {}}});
        assert_eq!(basic_data(&both)["potencia_mva"], json!(20));

        let root = json!({"potencia_mva": 30});
        assert_eq!(basic_data(&root)["potencia_mva"], json!(30));
        assert!(basic_data(&json!([])).is_empty());
    }

    #[test]
    fn test_inherited_losses_fields() {
        let panel = TransformerInfoPanel::from_store_value(&json!({
            "formData": {"potencia_mva": 50, "frequencia": "", "tensao_bt": "13.8"}
        }));
        assert_eq!(panel.inherited_for_losses(), ["potencia_mva", "tensao_bt"]);
        assert!(panel.has_data());
    }

    #[test]
    fn test_high_voltage_section() {
        let panel = TransformerInfoPanel::from_store_value(&json!({
            "formData": {
                "tensao_at": 138,
                "classe_tensao_at": "145",
                "corrente_nominal_at": 209.18,
                "impedancia": "12.5",
                "nbi_at": "650",
                "conexao_at": "estrela"
            }
        }));

        insta::assert_snapshot!(panel.section("High voltage").unwrap().to_string().trim_end(), @r"
        High voltage
          Voltage: 138.00 kV
          Voltage class: 145 kV
          Nominal current: 209.18 A
          Impedance: 12.5 %
          NBI: 650 kVp
          SIL: -
          Connection: estrela
          Neutral class: -
          Neutral NBI: -
        ");
    }
}
