//! Conversion between a [`Form`] and a flat JSON object.
//!
//! | Control  | Serialized as                                         |
//! |----------|-------------------------------------------------------|
//! | checkbox | `id → bool`                                           |
//! | radio    | `name → value` of the checked member, absent if none  |
//! | number   | `id → raw text`, `null` when empty                    |
//! | others   | `id → raw text`                                       |
//!
//! Controls without an id are ignored.

use serde_json::Value;
use tts_persistence::JsonObject;

use crate::form::{ControlKind, Form};

/// Outcome of [`populate`], per data key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Keys written to a control.
    pub applied: Vec<String>,
    /// Keys with no matching control.
    pub missing: Vec<String>,
    /// Select keys whose value is not among the options yet.
    pub unmatched: Vec<String>,
}

impl PopulateReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.unmatched.is_empty()
    }
}

/// Read every identified control of `form` into an object.
pub fn serialize(form: &Form) -> JsonObject {
    let mut data = JsonObject::new();
    for control in form.controls() {
        if control.id().is_empty() {
            continue;
        }
        match control.kind() {
            ControlKind::Checkbox => {
                data.insert(control.id().to_string(), Value::Bool(control.is_checked()));
            }
            ControlKind::Radio => {
                if control.is_checked() {
                    data.insert(
                        control.name().to_string(),
                        Value::String(control.value().to_string()),
                    );
                }
            }
            ControlKind::Number if control.value().is_empty() => {
                data.insert(control.id().to_string(), Value::Null);
            }
            _ => {
                data.insert(
                    control.id().to_string(),
                    Value::String(control.value().to_string()),
                );
            }
        }
    }
    data
}

/// Write `data` into `form`, key by key.
///
/// Keys are matched to control ids; a key naming a radio group checks the
/// member with that value. Missing controls and select values not (yet)
/// offered are logged and reported, never fatal.
pub fn populate(form: &mut Form, data: &JsonObject) -> PopulateReport {
    let mut report = PopulateReport::default();

    for (key, value) in data {
        if form.control(key).is_none() {
            if form.has_radio_group(key) {
                if let Value::String(text) = value
                    && form.check_radio(key, text)
                {
                    report.applied.push(key.clone());
                }
            } else {
                tracing::warn!(field = %key, form = %form.id(), "Field not found in form");
                report.missing.push(key.clone());
            }
            continue;
        }
        let Some(control) = form.control_mut(key) else {
            continue;
        };

        match control.kind() {
            ControlKind::Checkbox => {
                control.set_checked(is_truthy(value));
                report.applied.push(key.clone());
            }
            ControlKind::Radio => {
                let matches = matches!(value, Value::String(text) if text == control.value());
                if matches {
                    let name = control.name().to_string();
                    let text = control.value().to_string();
                    form.check_radio(&name, &text);
                    report.applied.push(key.clone());
                }
            }
            ControlKind::Select(_) => {
                if value.is_null() {
                    continue;
                }
                let text = form_text(value);
                let stuck = control.set_value(&text)
                    || value.as_f64().is_some_and(|number| {
                        control
                            .dropdown_mut()
                            .is_some_and(|dropdown| dropdown.select_numeric_match(number))
                    });
                if stuck {
                    report.applied.push(key.clone());
                } else {
                    tracing::warn!(
                        field = %key,
                        value = %text,
                        current = %control.value(),
                        "Option not available for select"
                    );
                    report.unmatched.push(key.clone());
                }
            }
            ControlKind::Number => {
                let text = match value {
                    Value::Number(number) => number
                        .as_f64()
                        .map_or_else(|| number.to_string(), |n| format!("{n:.2}")),
                    other => form_text(other),
                };
                control.set_value(&text);
                report.applied.push(key.clone());
            }
            ControlKind::Text | ControlKind::TextArea => {
                control.set_value(&form_text(value));
                report.applied.push(key.clone());
            }
        }
    }

    report
}

/// Text shown by a control for a stored value. `null` clears the control.
pub fn form_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
