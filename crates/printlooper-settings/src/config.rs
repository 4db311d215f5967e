//! Configuration for PrintLooper
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML files; the default location is `<config dir>/printlooper/config.toml`.
//!
//! Configuration is organized into sections:
//! - General settings (default printer, banner, output directory, loop limit)
//! - End-sequence detection (marker patterns, shutdown commands, fallback)
//! - Extra printer profiles, merged over the built-in ones

use printlooper_core::locator::{
    DEFAULT_CLUSTER_GAP, DEFAULT_COMMENT_MARKERS, DEFAULT_SHUTDOWN_COMMANDS, DEFAULT_TAIL_WINDOW,
};
use printlooper_core::{
    CommentMarkerMatcher, EndSequenceLocator, FallbackPolicy, PrinterProfile, ProfileRegistry,
    ShutdownCommandMatcher, MAX_LOOPS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{SettingsError, SettingsResult};

/// Directory name under the platform config directory
pub const APP_DIR: &str = "printlooper";

/// Default config file name
pub const CONFIG_FILE: &str = "config.toml";

/// Hard ceiling for `general.max_loops`
pub const LOOP_LIMIT: u32 = 999;

/// General settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Printer id used when none is given on the command line
    pub default_printer: Option<String>,
    /// Write the descriptive banner at the top of the output
    pub include_banner: bool,
    /// Where looped files are written (defaults to the primary file's directory)
    pub output_dir: Option<PathBuf>,
    /// Largest loop count accepted from the user
    pub max_loops: u32,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            default_printer: None,
            include_banner: true,
            output_dir: None,
            max_loops: MAX_LOOPS,
        }
    }
}

/// What to do when no end-sequence marker is found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Loop the whole file; no end sequence
    #[default]
    WholeBody,
    /// Treat the last `tail_window` lines as the end sequence
    TailWindow,
}

impl std::fmt::Display for FallbackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WholeBody => write!(f, "whole_body"),
            Self::TailWindow => write!(f, "tail_window"),
        }
    }
}

/// End-sequence detection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Case-insensitive regexes matched against the comment text after `;`
    pub comment_markers: Vec<String>,
    /// Command patterns such as `M104 S0`
    pub shutdown_commands: Vec<String>,
    /// Maximum distance between shutdown commands of the trailing cluster
    pub cluster_gap: usize,
    pub fallback: FallbackMode,
    /// Lines treated as end sequence by the `tail_window` fallback
    pub tail_window: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            comment_markers: DEFAULT_COMMENT_MARKERS.iter().map(|s| s.to_string()).collect(),
            shutdown_commands: DEFAULT_SHUTDOWN_COMMANDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cluster_gap: DEFAULT_CLUSTER_GAP,
            fallback: FallbackMode::default(),
            tail_window: DEFAULT_TAIL_WINDOW,
        }
    }
}

impl DetectionSettings {
    pub fn fallback_policy(&self) -> FallbackPolicy {
        match self.fallback {
            FallbackMode::WholeBody => FallbackPolicy::WholeBody,
            FallbackMode::TailWindow => FallbackPolicy::TailWindow(self.tail_window),
        }
    }

    /// Build a locator from these settings
    ///
    /// Empty pattern lists disable the corresponding matcher.
    pub fn build_locator(&self) -> SettingsResult<EndSequenceLocator> {
        let mut locator = EndSequenceLocator::empty().with_fallback(self.fallback_policy());

        if !self.comment_markers.is_empty() {
            let matcher = CommentMarkerMatcher::with_patterns(&self.comment_markers)?;
            locator.register(Arc::new(matcher));
        }
        if !self.shutdown_commands.is_empty() {
            let matcher = ShutdownCommandMatcher::with_commands(&self.shutdown_commands)
                .with_cluster_gap(self.cluster_gap);
            locator.register(Arc::new(matcher));
        }

        Ok(locator)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralSettings,
    pub detection: DetectionSettings,
    /// Profiles added to (or replacing) the built-in printers
    pub printers: Vec<PrinterProfile>,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform default config path
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no configuration directory on this platform".into())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path`, or the platform default; a missing file yields defaults
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!("{}, using default configuration", e);
                    return Ok(Self::default());
                }
            },
        };

        if path.exists() {
            Self::load_from_file(&path)
        } else {
            tracing::debug!(
                "No configuration at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => self.to_toml()?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Serialize as TOML
    pub fn to_toml(&self) -> SettingsResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.general.max_loops == 0 || self.general.max_loops > LOOP_LIMIT {
            return Err(SettingsError::invalid(
                "general.max_loops",
                format!("must be between 1 and {}", LOOP_LIMIT),
            ));
        }

        if self.detection.cluster_gap == 0 {
            return Err(SettingsError::invalid(
                "detection.cluster_gap",
                "must be > 0",
            ));
        }

        if self.detection.fallback == FallbackMode::TailWindow && self.detection.tail_window == 0 {
            return Err(SettingsError::invalid(
                "detection.tail_window",
                "must be > 0 when fallback is tail_window",
            ));
        }

        // Patterns must compile
        CommentMarkerMatcher::with_patterns(&self.detection.comment_markers)?;

        let mut seen = HashSet::new();
        for profile in &self.printers {
            profile.validate()?;
            if !seen.insert(profile.id.to_ascii_lowercase()) {
                return Err(SettingsError::invalid(
                    "printers",
                    format!("duplicate printer id '{}'", profile.id),
                ));
            }
        }

        if let Some(id) = &self.general.default_printer {
            self.build_registry()?.get(id)?;
        }

        Ok(())
    }

    /// Built-in profiles with the configured printers merged in
    pub fn build_registry(&self) -> SettingsResult<ProfileRegistry> {
        let mut registry = ProfileRegistry::builtin();
        for profile in &self.printers {
            registry.insert(profile.clone())?;
        }
        Ok(registry)
    }

    /// Locator configured by the `detection` section
    pub fn build_locator(&self) -> SettingsResult<EndSequenceLocator> {
        self.detection.build_locator()
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}
