//! Printer profiles and their push-off templates
//!
//! A profile maps a printer identifier to the motion lines that sweep a
//! finished part off the bed. Built-in profiles come from [`PrinterModel`];
//! more can be registered at runtime (e.g. from the settings file) through
//! [`ProfileRegistry::insert`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LooperError, LooperResult};

/// Push-off template for one printer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterProfile {
    /// Stable identifier, e.g. `centauri-carbon`
    pub id: String,
    /// Display name used in generated comments
    pub name: String,
    /// Commands inserted between repetitions
    pub push_off: Vec<String>,
}

impl PrinterProfile {
    /// Create a profile
    pub fn new(id: impl Into<String>, name: impl Into<String>, push_off: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            push_off,
        }
    }

    /// Elegoo Centauri Carbon (256 mm bed, sweep along Y=220)
    pub fn centauri_carbon() -> Self {
        Self::new(
            PrinterModel::CentauriCarbon.id(),
            PrinterModel::CentauriCarbon.to_string(),
            to_lines(&[
                "G91                     ; Relative positioning",
                "G1 Z10 F3000           ; Raise Z by 10mm",
                "G90                     ; Absolute positioning",
                "G1 X0 Y220 F9000       ; Move to front-left position",
                "G1 Z10 F3000           ; Lower to push height",
                "G1 X220 Y220 F3000     ; Sweep across to push print off",
                "G1 X220 Y0 F9000       ; Move back",
                "G28 X Y                ; Home X and Y",
            ]),
        )
    }

    /// Creality Ender 3 V3 SE (220 mm bed, slower Z)
    pub fn ender3_v3_se() -> Self {
        Self::new(
            PrinterModel::Ender3V3Se.id(),
            PrinterModel::Ender3V3Se.to_string(),
            to_lines(&[
                "G91                     ; Relative positioning",
                "G1 Z10 F1200           ; Raise Z by 10mm",
                "G90                     ; Absolute positioning",
                "G1 X0 Y200 F3000       ; Move to front position",
                "G1 Z5 F1200            ; Lower to push height",
                "G1 X200 Y200 F2000     ; Sweep across to push print off",
                "G1 X200 Y0 F3000       ; Move back",
                "G28 X Y                ; Home X and Y",
                "G28 Z                  ; Home Z",
            ]),
        )
    }

    /// Reject profiles that cannot be used for assembly
    pub fn validate(&self) -> LooperResult<()> {
        let invalid = |reason: &str| LooperError::InvalidProfile {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("identifier is empty"));
        }
        if self.id.chars().any(char::is_whitespace) {
            return Err(invalid("identifier contains whitespace"));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.push_off.iter().all(|l| l.trim().is_empty()) {
            return Err(invalid("push-off template is empty"));
        }
        Ok(())
    }
}

fn to_lines(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

/// Printers with a built-in profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrinterModel {
    CentauriCarbon,
    Ender3V3Se,
}

impl PrinterModel {
    /// All built-in models, in menu order
    pub const ALL: [PrinterModel; 2] = [PrinterModel::CentauriCarbon, PrinterModel::Ender3V3Se];

    pub fn id(&self) -> &'static str {
        match self {
            Self::CentauriCarbon => "centauri-carbon",
            Self::Ender3V3Se => "ender3-v3-se",
        }
    }

    pub fn profile(&self) -> PrinterProfile {
        match self {
            Self::CentauriCarbon => PrinterProfile::centauri_carbon(),
            Self::Ender3V3Se => PrinterProfile::ender3_v3_se(),
        }
    }
}

impl fmt::Display for PrinterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CentauriCarbon => write!(f, "Centauri Carbon"),
            Self::Ender3V3Se => write!(f, "Ender 3 V3 SE"),
        }
    }
}

impl FromStr for PrinterModel {
    type Err = LooperError;

    /// Accepts the identifier or the display name, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.id().eq_ignore_ascii_case(s) || m.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| LooperError::UnknownPrinter { id: s.to_string() })
    }
}

/// Ordered set of printer profiles, keyed by id
///
/// Built once per run and passed to the assembler by reference.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: Vec<PrinterProfile>,
}

impl ProfileRegistry {
    /// Registry without any profiles
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every [`PrinterModel`] profile
    pub fn builtin() -> Self {
        Self {
            profiles: PrinterModel::ALL.iter().map(PrinterModel::profile).collect(),
        }
    }

    /// Add a profile, replacing any existing profile with the same id
    pub fn insert(&mut self, profile: PrinterProfile) -> LooperResult<()> {
        profile.validate()?;
        match self.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => {
                tracing::debug!("Replacing printer profile '{}'", profile.id);
                *existing = profile;
            }
            None => self.profiles.push(profile),
        }
        Ok(())
    }

    /// Look up a profile by id, falling back to a built-in display name
    pub fn get(&self, id: &str) -> LooperResult<&PrinterProfile> {
        let id = id.trim();
        self.profiles
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id))
            .or_else(|| {
                let model = id.parse::<PrinterModel>().ok()?;
                self.profiles.iter().find(|p| p.id == model.id())
            })
            .ok_or_else(|| LooperError::UnknownPrinter { id: id.to_string() })
    }

    /// Profile at a zero-based menu position
    pub fn get_index(&self, index: usize) -> Option<&PrinterProfile> {
        self.profiles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrinterProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles() {
        let registry = ProfileRegistry::builtin();
        assert_eq!(registry.len(), 2);

        let carbon = registry.get("centauri-carbon").unwrap();
        assert_eq!(carbon.name, "Centauri Carbon");
        assert_eq!(carbon.push_off.len(), 8);
        assert!(carbon.push_off.iter().any(|l| l.contains("X220 Y220")));

        let ender = registry.get("Ender 3 V3 SE").unwrap();
        assert_eq!(ender.id, "ender3-v3-se");
        assert_eq!(ender.push_off.len(), 9);
        assert!(ender.push_off.iter().any(|l| l.starts_with("G28 Z")));
    }

    #[test]
    fn test_model_from_str() {
        assert_eq!(
            "centauri-carbon".parse::<PrinterModel>().unwrap(),
            PrinterModel::CentauriCarbon
        );
        assert_eq!(
            "ender 3 v3 se".parse::<PrinterModel>().unwrap(),
            PrinterModel::Ender3V3Se
        );
        assert!(matches!(
            "bambu-x1c".parse::<PrinterModel>(),
            Err(LooperError::UnknownPrinter { .. })
        ));
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let mut registry = ProfileRegistry::builtin();
        let custom = PrinterProfile::new(
            "ender3-v3-se",
            "Ender 3 V3 SE (tall sweep)",
            vec!["G1 Z20 F1200".to_string()],
        );
        registry.insert(custom).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("ender3-v3-se").unwrap().push_off.len(), 1);

        registry
            .insert(PrinterProfile::new(
                "prusa-mk4",
                "Prusa MK4",
                vec!["G1 X0 Y210".to_string()],
            ))
            .unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get_index(2).unwrap().id, "prusa-mk4");
    }

    #[test]
    fn test_validate_rejects_bad_profiles() {
        let empty = PrinterProfile::new("x", "X", vec!["  ".to_string()]);
        assert!(matches!(
            empty.validate(),
            Err(LooperError::InvalidProfile { .. })
        ));

        let spaced = PrinterProfile::new("my printer", "X", vec!["G28".to_string()]);
        assert!(spaced.validate().is_err());

        let mut registry = ProfileRegistry::new();
        assert!(registry.insert(empty).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_printer() {
        let registry = ProfileRegistry::builtin();
        let err = registry.get("voron").unwrap_err();
        assert_eq!(err.to_string(), "Unknown printer: voron");
    }

    #[test]
    fn test_profile_serde_roundtrip() {
        let profile = PrinterProfile::centauri_carbon();
        let json = serde_json::to_string(&profile).unwrap();
        let back: PrinterProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
