//! Project configuration (`cartridge.config.json`)
//!
//! Every field is optional in the file; missing fields take the defaults
//! below. The `PORT` environment variable overrides `port`.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::serializer::SerializerConfig;
use crate::utils;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "cartridge.config.json";

pub const DEFAULT_PORT: u32 = 3002;
pub const DEFAULT_STYLE_SHEETS_FOLDER: &str = "./.cartridge/ct-stylesheets";
pub const DEFAULT_TITLE: &str = "Cartridge";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid port number {0}. Port must be an integer between 1 and 65535.")]
    InvalidPort(String),

    #[error("Folder for storing stylesheets is not defined. Please create a cartridge.config.json file and set the stylesSheetsFolder property.")]
    NoStyleSheetsFolder,
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartridgeConfig {
    /// Port the HTTP server listens on
    pub port: u32,
    /// Base path of the application
    pub base: String,
    /// Folder for generated style sheets; its last segment is the public URL prefix
    pub styles_sheets_folder: Option<String>,
    /// Keep generated sheets on disk instead of in memory
    pub persist_styles_to_disk: bool,
    /// Router module handed to the renderer
    pub router: Option<String>,
    /// Inline component styles into every shadow root
    pub inline_all_component_styles: bool,
    /// Initial `<title>` of every page
    pub title: String,
}

impl Default for CartridgeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            base: "/".to_string(),
            styles_sheets_folder: Some(DEFAULT_STYLE_SHEETS_FOLDER.to_string()),
            persist_styles_to_disk: false,
            router: None,
            inline_all_component_styles: false,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl CartridgeConfig {
    /// Load and validate a configuration file
    ///
    /// A missing file is not an error: the defaults are used instead.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(text) => Self::from_json(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = ?path, "no configuration file, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        config.apply_port_override(std::env::var("PORT").ok().as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration JSON without touching the environment
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the port with a value taken from the environment
    pub fn apply_port_override(&mut self, port: Option<&str>) -> Result<(), ConfigError> {
        if let Some(raw) = port {
            self.port = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.to_string()))?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=65535).contains(&self.port) {
            return Err(ConfigError::InvalidPort(self.port.to_string()));
        }
        if self.persist_styles_to_disk && self.styles_sheets_folder.is_none() {
            return Err(ConfigError::NoStyleSheetsFolder);
        }
        Ok(())
    }

    /// Public URL prefix of linked style sheets
    pub fn style_base(&self) -> String {
        utils::style_base_from_folder(self.styles_sheets_folder.as_deref())
    }

    /// Settings the tree serializer needs
    pub fn serializer_config(&self) -> SerializerConfig {
        SerializerConfig {
            style_base: self.style_base(),
            inline_all_component_styles: self.inline_all_component_styles,
            ..SerializerConfig::default()
        }
    }
}
