//! Field visibility rules.

use crate::table::StandardFamily;

/// Lowest voltage class (Um, kV) with a switching impulse level under
/// IEC 60076-3 and NBR 5356-3.
pub const SIL_MIN_UM_KV_IEC: f64 = 245.0;

/// Lowest voltage class (kV) with a switching impulse (BSL) level under
/// IEEE C57.12.00.
pub const SIL_MIN_UM_KV_IEEE: f64 = 161.0;

/// Voltage class from which the SIL field is shown for `family`.
pub fn sil_threshold(family: StandardFamily) -> f64 {
    match family {
        StandardFamily::Ieee => SIL_MIN_UM_KV_IEEE,
        StandardFamily::Iec | StandardFamily::Nbr => SIL_MIN_UM_KV_IEC,
    }
}

/// Whether the SIL field is shown.
///
/// Requires a selected class at or above the family threshold and at least
/// one switching impulse value for it.
pub fn sil_visible(family: StandardFamily, um_kv: Option<f64>, sil_applicable: bool) -> bool {
    sil_applicable && um_kv.is_some_and(|kv| kv >= sil_threshold(family))
}

/// Winding connection as stored by the connection selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    /// `estrela` (Y)
    Star,
    /// `triangulo` (D)
    Delta,
    /// `ziguezague` (Z)
    Zigzag,
}

impl Connection {
    /// Parse a selector value; unknown values yield `None`.
    pub fn from_form_value(value: &str) -> Option<Self> {
        match value {
            "estrela" => Some(Self::Star),
            "triangulo" => Some(Self::Delta),
            "ziguezague" => Some(Self::Zigzag),
            _ => None,
        }
    }

    /// Whether the connection brings out a neutral with its own insulation.
    pub fn has_accessible_neutral(self) -> bool {
        matches!(self, Self::Star | Self::Zigzag)
    }
}

/// Whether the neutral fields are shown for a connection selector value.
pub fn neutral_visible(connection: &str) -> bool {
    Connection::from_form_value(connection).is_some_and(Connection::has_accessible_neutral)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sil_threshold_per_family() {
        assert!(sil_visible(StandardFamily::Iec, Some(245.0), true));
        assert!(!sil_visible(StandardFamily::Nbr, Some(170.0), true));
        assert!(sil_visible(StandardFamily::Ieee, Some(161.0), true));
        assert!(!sil_visible(StandardFamily::Ieee, Some(138.0), true));
    }

    #[test]
    fn test_sil_hidden_without_values_or_class() {
        assert!(!sil_visible(StandardFamily::Iec, Some(550.0), false));
        assert!(!sil_visible(StandardFamily::Iec, None, true));
    }

    #[test]
    fn test_neutral_visibility() {
        assert!(neutral_visible("estrela"));
        assert!(neutral_visible("ziguezague"));
        assert!(!neutral_visible("triangulo"));
        assert!(!neutral_visible(""));
    }
}
