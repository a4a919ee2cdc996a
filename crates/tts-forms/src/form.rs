//! Form and control model.
//!
//! A [`Form`] is an ordered list of [`Control`]s, mirroring the inputs,
//! selects and textareas beneath a form element. Controls are addressed by
//! id; radio buttons additionally share a group `name`.

use crate::dropdown::Dropdown;

/// Input type of a [`Control`].
#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    Text,
    Number,
    Checkbox,
    Radio,
    TextArea,
    Select(Dropdown),
}

impl ControlKind {
    /// Whether the control also reports every keystroke, not only committed changes.
    pub fn reports_input(&self) -> bool {
        matches!(self, Self::Text | Self::Number)
    }
}

/// Which change notifications a control is wired to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Listeners {
    pub change: bool,
    pub input: bool,
}

/// Kind of user interaction with a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    /// Committed change (blur, selection, toggle).
    Change,
    /// Keystroke in a text or number field.
    Input,
}

/// One form control.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    id: String,
    name: String,
    kind: ControlKind,
    value: String,
    checked: bool,
    visible: bool,
    listeners: Option<Listeners>,
}

impl Control {
    fn new(id: &str, kind: ControlKind) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            value: String::new(),
            checked: false,
            visible: true,
            listeners: None,
        }
    }

    pub fn text(id: &str) -> Self {
        Self::new(id, ControlKind::Text)
    }

    pub fn number(id: &str) -> Self {
        Self::new(id, ControlKind::Number)
    }

    pub fn checkbox(id: &str) -> Self {
        Self::new(id, ControlKind::Checkbox)
    }

    pub fn textarea(id: &str) -> Self {
        Self::new(id, ControlKind::TextArea)
    }

    pub fn select(id: &str, dropdown: Dropdown) -> Self {
        Self::new(id, ControlKind::Select(dropdown))
    }

    /// A radio button of group `name` carrying `value`.
    pub fn radio(id: &str, name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            ..Self::new(id, ControlKind::Radio)
        }
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.set_value(value);
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ControlKind {
        &self.kind
    }

    /// Current value; for selects, the selected option's value.
    pub fn value(&self) -> &str {
        match &self.kind {
            ControlKind::Select(dropdown) => dropdown.value(),
            _ => &self.value,
        }
    }

    /// Set the value. Selects keep their selection when `value` is not offered.
    pub fn set_value(&mut self, value: &str) -> bool {
        match &mut self.kind {
            ControlKind::Select(dropdown) => dropdown.set_value(value),
            _ => {
                self.value = value.to_string();
                true
            }
        }
    }

    /// Reset to the empty value (placeholder for selects).
    pub fn clear(&mut self) {
        match &mut self.kind {
            ControlKind::Select(dropdown) => dropdown.clear_selection(),
            _ => self.value.clear(),
        }
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn dropdown(&self) -> Option<&Dropdown> {
        match &self.kind {
            ControlKind::Select(dropdown) => Some(dropdown),
            _ => None,
        }
    }

    pub fn dropdown_mut(&mut self) -> Option<&mut Dropdown> {
        match &mut self.kind {
            ControlKind::Select(dropdown) => Some(dropdown),
            _ => None,
        }
    }

    /// Listeners attached by a binder, `None` while unbound.
    pub fn listeners(&self) -> Option<Listeners> {
        self.listeners
    }

    /// Whether an interaction of `kind` reaches a bound listener.
    pub fn listens_to(&self, kind: InteractionKind) -> bool {
        self.listeners.is_some_and(|listeners| match kind {
            InteractionKind::Change => listeners.change,
            InteractionKind::Input => listeners.input,
        })
    }

    /// Attach listeners once. Returns `false` when already bound.
    pub(crate) fn bind_listeners(&mut self) -> bool {
        if self.listeners.is_some() {
            return false;
        }
        self.listeners = Some(Listeners {
            change: true,
            input: self.kind.reports_input(),
        });
        true
    }
}

/// A form: an id and its controls in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    id: String,
    controls: Vec<Control>,
}

impl Form {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            controls: Vec::new(),
        }
    }

    /// Append a control.
    pub fn with(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }

    pub fn push(&mut self, control: Control) {
        self.controls.push(control);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> impl Iterator<Item = &mut Control> {
        self.controls.iter_mut()
    }

    /// First control with the given non-empty id.
    pub fn control(&self, id: &str) -> Option<&Control> {
        if id.is_empty() {
            return None;
        }
        self.controls.iter().find(|control| control.id == id)
    }

    pub fn control_mut(&mut self, id: &str) -> Option<&mut Control> {
        if id.is_empty() {
            return None;
        }
        self.controls.iter_mut().find(|control| control.id == id)
    }

    pub fn value(&self, id: &str) -> Option<&str> {
        self.control(id).map(Control::value)
    }

    /// Set a control's value. Returns `false` when the control is missing or
    /// a select does not offer `value`.
    pub fn set_value(&mut self, id: &str, value: &str) -> bool {
        self.control_mut(id)
            .is_some_and(|control| control.set_value(value))
    }

    pub fn dropdown_mut(&mut self, id: &str) -> Option<&mut Dropdown> {
        self.control_mut(id).and_then(Control::dropdown_mut)
    }

    pub fn set_visible(&mut self, id: &str, visible: bool) {
        if let Some(control) = self.control_mut(id) {
            control.set_visible(visible);
        }
    }

    /// Whether the radio group `name` has a member.
    pub fn has_radio_group(&self, name: &str) -> bool {
        self.controls
            .iter()
            .any(|control| control.kind == ControlKind::Radio && control.name == name)
    }

    /// Check the member of radio group `name` whose value equals `value`,
    /// unchecking the rest. Returns `false` when no member matches.
    pub fn check_radio(&mut self, name: &str, value: &str) -> bool {
        let found = self.controls.iter().any(|control| {
            control.kind == ControlKind::Radio && control.name == name && control.value == value
        });
        if found {
            for control in &mut self.controls {
                if control.kind == ControlKind::Radio && control.name == name {
                    control.checked = control.value == value;
                }
            }
        }
        found
    }
}

/// The set of forms currently on screen, addressable by id.
#[derive(Debug, Clone, Default)]
pub struct Document {
    forms: Vec<Form>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(mut self, form: Form) -> Self {
        self.forms.push(form);
        self
    }

    pub fn form(&self, id: &str) -> Option<&Form> {
        self.forms.iter().find(|form| form.id == id)
    }

    pub fn form_mut(&mut self, id: &str) -> Option<&mut Form> {
        self.forms.iter_mut().find(|form| form.id == id)
    }
}
