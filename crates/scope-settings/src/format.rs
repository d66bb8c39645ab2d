//! Settings file formats

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Structured-text formats a settings document can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsFormat {
    Toml,
    Json,
    Yaml,
}

impl SettingsFormat {
    /// Detect the format from a file extension:
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");
        match extension.to_lowercase().as_str() {
            "toml" => Ok(SettingsFormat::Toml),
            "json" => Ok(SettingsFormat::Json),
            "yaml" | "yml" => Ok(SettingsFormat::Yaml),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(&self, content: &str, origin: &str) -> Result<T> {
        let parsed = match self {
            SettingsFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            SettingsFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            SettingsFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| Error::Parse {
            origin: origin.to_string(),
            format: self.to_string(),
            message,
        })
    }
}

impl fmt::Display for SettingsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsFormat::Toml => write!(f, "TOML"),
            SettingsFormat::Json => write!(f, "JSON"),
            SettingsFormat::Yaml => write!(f, "YAML"),
        }
    }
}
