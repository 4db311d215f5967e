//! PrintLooper Settings Crate
//!
//! Handles application configuration: file loading and validation, the
//! end-sequence detection tuning, and user-defined printer profiles.

pub mod config;
pub mod error;

pub use config::{Config, DetectionSettings, FallbackMode, GeneralSettings};
pub use error::{SettingsError, SettingsResult};
