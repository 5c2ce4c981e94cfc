//! Reader configuration, optionally loaded from TOML:
//!
//! ```toml
//! # spe-reader.toml
//! require_spe_extension = false
//! verify_data_block = true
//!
//! [[extra_settings]]
//! name = "TRIGGER_SOURCE"
//! path = "datahistories/datahistory/origin/experiment/devices/cameras/camera/hardwareio/trigger/source"
//! value_type = "text"
//! ```

use crate::error::SpeError;
use crate::parser::SettingRule;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for opening SPE files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct ReaderConfig {
    /// Reject paths without the `.spe` extension
    #[builder(default = true)]
    pub require_spe_extension: bool,

    /// Check that the data block fits in the file and stays clear of the footer
    #[builder(default = true)]
    pub verify_data_block: bool,

    /// Setting rules appended after the built-in table
    #[builder(default)]
    pub extra_settings: Vec<SettingRule>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            require_spe_extension: true,
            verify_data_block: true,
            extra_settings: Vec::new(),
        }
    }
}

impl ReaderConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SpeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SpeError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, SpeError> {
        Ok(toml::from_str(content)?)
    }
}
