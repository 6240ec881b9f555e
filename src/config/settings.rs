//! TOML-based configuration for factcube.
//!
//! Supports a config file (factcube.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [output]
//! formats = ["html", "xml"]
//! folder = "${FILING_DIR}/Reports"
//! excel = false
//!
//! [numbering]
//! first_file_number = 1
//! first_uncategorized_file_number = 9999
//!
//! [render]
//! debug = false
//! verbose_headings = false
//! row_separator = " | "
//! title_separator = " - "
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub output: OutputSettings,
    pub numbering: NumberingSettings,
    pub render: RenderSettings,
}

/// Where and how reports are written.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Report formats to produce: `html`, `xml`, or both.
    pub formats: Vec<String>,

    /// Output folder (supports ${ENV_VAR} expansion).
    pub folder: String,

    /// Also produce a spreadsheet with one worksheet per report.
    pub excel: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            formats: vec!["html".to_string(), "xml".to_string()],
            folder: "Reports".to_string(),
            excel: false,
        }
    }
}

impl OutputSettings {
    /// The output folder with environment variables expanded.
    pub fn resolved_folder(&self) -> SettingsResult<PathBuf> {
        Ok(PathBuf::from(expand_env_vars(&self.folder)?))
    }

    pub fn html(&self) -> bool {
        self.formats.iter().any(|f| f.eq_ignore_ascii_case("html"))
    }

    pub fn xml(&self) -> bool {
        self.formats.iter().any(|f| f.eq_ignore_ascii_case("xml"))
    }
}

/// Report file numbering.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NumberingSettings {
    /// Number of the first `R<n>` report file.
    pub first_file_number: u32,

    /// Number given to the uncategorized report; counts down per filing.
    pub first_uncategorized_file_number: u32,
}

impl Default for NumberingSettings {
    fn default() -> Self {
        Self {
            first_file_number: 1,
            first_uncategorized_file_number: 9999,
        }
    }
}

/// Heading and debug options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Log cube and embedding state after each phase.
    pub debug: bool,

    /// Include qualified names in headings.
    pub verbose_headings: bool,

    pub row_separator: String,

    pub title_separator: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            debug: false,
            verbose_headings: false,
            row_separator: " | ".to_string(),
            title_separator: " - ".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `FACTCUBE_CONFIG`
    /// 2. `./factcube.toml`
    /// 3. `~/.config/factcube/config.toml`
    pub fn load() -> SettingsResult<Self> {
        if let Ok(path) = env::var("FACTCUBE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("factcube.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("factcube").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> SettingsResult<()> {
        match self
            .output
            .formats
            .iter()
            .find(|f| !f.eq_ignore_ascii_case("html") && !f.eq_ignore_ascii_case("xml"))
        {
            Some(format) => Err(SettingsError::UnsupportedFormat(format.clone())),
            None => Ok(()),
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> SettingsResult<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    var_name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }
        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
