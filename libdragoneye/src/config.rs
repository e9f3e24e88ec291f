//! Loading and rendering of configuration records
//!
//! Calibration profiles, segmentation settings and reference populations are
//! plain serde records. They can be stored as TOML, JSON or YAML; the format
//! is picked from the file extension.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{GradeError, Result};

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Guess the format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(GradeError::InvalidConfig(format!(
                "Unsupported configuration file extension: {}",
                path.display()
            ))),
        }
    }

    /// Parse a record from text
    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T> {
        match self {
            Self::Toml => toml::from_str(text)
                .map_err(|e| GradeError::InvalidConfig(format!("TOML parse error: {e}"))),
            Self::Json => serde_json::from_str(text)
                .map_err(|e| GradeError::InvalidConfig(format!("JSON parse error: {e}"))),
            Self::Yaml => serde_yaml::from_str(text)
                .map_err(|e| GradeError::InvalidConfig(format!("YAML parse error: {e}"))),
        }
    }

    /// Render a record as text
    pub fn render<T: Serialize>(self, value: &T, pretty: bool) -> Result<String> {
        match self {
            Self::Toml => {
                let rendered = if pretty {
                    toml::to_string_pretty(value)
                } else {
                    toml::to_string(value)
                };
                rendered.map_err(|e| GradeError::InvalidConfig(format!("TOML render error: {e}")))
            }
            Self::Json => {
                let rendered = if pretty {
                    serde_json::to_string_pretty(value)
                } else {
                    serde_json::to_string(value)
                };
                rendered.map_err(|e| GradeError::InvalidConfig(format!("JSON render error: {e}")))
            }
            Self::Yaml => serde_yaml::to_string(value)
                .map_err(|e| GradeError::InvalidConfig(format!("YAML render error: {e}"))),
        }
    }
}

/// Read and parse a record from a file
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = ConfigFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    format.parse(&text)
}

/// Render a record and write it to a file
pub fn save<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let format = ConfigFormat::from_path(path)?;
    let text = format.render(value, true)?;
    std::fs::write(path, text)?;
    Ok(())
}
