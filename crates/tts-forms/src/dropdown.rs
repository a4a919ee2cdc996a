//! Select control model.

/// Label of the empty placeholder option.
pub const PLACEHOLDER_LABEL: &str = "Select...";

/// One `<option>` of a [`Dropdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
    temporary: bool,
}

impl DropdownOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            temporary: false,
        }
    }

    /// The empty-valued "select" option.
    pub fn placeholder() -> Self {
        Self::new("", PLACEHOLDER_LABEL)
    }

    /// Whether this option was inserted only to hold a value that was not offered.
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

/// A select control: an ordered option list and at most one selected option.
///
/// The value of a dropdown is the value of its selected option, or `""`
/// when nothing is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dropdown {
    options: Vec<DropdownOption>,
    selected: Option<usize>,
}

impl Dropdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dropdown with a placeholder followed by `options`, placeholder selected.
    pub fn with_options(options: impl IntoIterator<Item = DropdownOption>) -> Self {
        let mut dropdown = Self::new();
        dropdown.rebuild(options, true, None);
        dropdown
    }

    pub fn options(&self) -> &[DropdownOption] {
        &self.options
    }

    /// Value of the selected option.
    pub fn value(&self) -> &str {
        self.selected_option()
            .map_or("", |option| option.value.as_str())
    }

    pub fn selected_option(&self) -> Option<&DropdownOption> {
        self.selected.and_then(|index| self.options.get(index))
    }

    pub fn contains(&self, value: &str) -> bool {
        self.position(value).is_some()
    }

    /// Select the option whose value equals `value`.
    ///
    /// Returns `false` and leaves the selection unchanged when no option matches.
    pub fn set_value(&mut self, value: &str) -> bool {
        match self.position(value) {
            Some(index) => {
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }

    /// Select the first option whose value is numerically equal to `value`.
    ///
    /// Covers stored numbers whose text differs from the option text
    /// (`245.0` against an option `245`).
    pub fn select_numeric_match(&mut self, value: f64) -> bool {
        let found = self.options.iter().position(|option| {
            option
                .value
                .trim()
                .parse::<f64>()
                .is_ok_and(|candidate| (candidate - value).abs() < 1e-9)
        });
        match found {
            Some(index) => {
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }

    /// Select `value`, appending a temporary option for it when it is not offered.
    ///
    /// Temporary options disappear on the next [`rebuild`](Self::rebuild).
    pub fn set_value_or_insert_temporary(&mut self, value: &str) {
        if self.set_value(value) {
            return;
        }
        self.options.push(DropdownOption {
            value: value.to_string(),
            label: value.to_string(),
            temporary: true,
        });
        self.selected = Some(self.options.len() - 1);
    }

    /// Replace all options and restore the previous selection when possible.
    ///
    /// `keep` overrides the value to restore (defaults to the current value).
    /// When it is no longer offered the placeholder is selected, or the first
    /// option when there is no placeholder.
    pub fn rebuild(
        &mut self,
        options: impl IntoIterator<Item = DropdownOption>,
        with_placeholder: bool,
        keep: Option<&str>,
    ) {
        let previous = keep.map_or_else(|| self.value().to_string(), str::to_string);

        self.options.clear();
        if with_placeholder {
            self.options.push(DropdownOption::placeholder());
        }
        self.options.extend(options);

        self.selected = if self.options.is_empty() {
            None
        } else {
            Some(0)
        };
        if !previous.is_empty() {
            self.set_value(&previous);
        }
    }

    /// Select the placeholder (or nothing when there is none).
    pub fn clear_selection(&mut self) {
        if !self.set_value("") {
            self.selected = None;
        }
    }

    fn position(&self, value: &str) -> Option<usize> {
        self.options.iter().position(|option| option.value == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<DropdownOption> {
        ["72.5", "145", "245"]
            .into_iter()
            .map(|kv| DropdownOption::new(kv, format!("{kv} kV")))
            .collect()
    }

    #[test]
    fn test_rebuild_restores_previous_value() {
        let mut dropdown = Dropdown::with_options(classes());
        assert!(dropdown.set_value("145"));

        dropdown.rebuild(classes().into_iter().skip(1), true, None);
        assert_eq!(dropdown.value(), "145");
        assert_eq!(dropdown.options().len(), 3);
    }

    #[test]
    fn test_rebuild_falls_back_to_placeholder() {
        let mut dropdown = Dropdown::with_options(classes());
        dropdown.set_value("72.5");

        dropdown.rebuild(classes().into_iter().skip(1), true, None);
        assert_eq!(dropdown.value(), "");
        assert_eq!(dropdown.selected_option().unwrap().label, PLACEHOLDER_LABEL);
    }

    #[test]
    fn test_rebuild_without_placeholder_selects_first() {
        let mut dropdown = Dropdown::new();
        dropdown.rebuild(classes(), false, Some("999"));
        assert_eq!(dropdown.value(), "72.5");
    }

    #[test]
    fn test_set_value_missing_leaves_selection() {
        let mut dropdown = Dropdown::with_options(classes());
        dropdown.set_value("245");
        assert!(!dropdown.set_value("800"));
        assert_eq!(dropdown.value(), "245");
    }

    #[test]
    fn test_numeric_match() {
        let mut dropdown = Dropdown::with_options(classes());
        assert!(dropdown.select_numeric_match(245.0));
        assert_eq!(dropdown.value(), "245");
        assert!(!dropdown.select_numeric_match(800.0));
    }

    #[test]
    fn test_temporary_option_dropped_on_rebuild() {
        let mut dropdown = Dropdown::with_options(classes());
        dropdown.set_value_or_insert_temporary("800");
        assert_eq!(dropdown.value(), "800");
        assert!(dropdown.selected_option().unwrap().is_temporary());

        dropdown.rebuild(classes(), true, None);
        assert!(!dropdown.contains("800"));
        assert_eq!(dropdown.value(), "");
    }
}
