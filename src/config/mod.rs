//! Configuration module for factcube.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, NumberingSettings, OutputSettings, RenderSettings, Settings, SettingsError,
    SettingsResult,
};
