//! Confirmation configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Confirmation engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmConfig {
    /// Measurement name used for a planned thickness
    pub thickness_measurement_name: String,
    /// Reject explicit performed times later than now
    pub reject_future_performed: bool,
    /// Largest number of labware accepted in one request
    pub max_labware_per_request: usize,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for this shape
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfirmConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With measurement name for thickness
    #[inline]
    #[must_use]
    pub fn with_thickness_measurement_name(mut self, name: impl Into<String>) -> Self {
        self.thickness_measurement_name = name.into();
        self
    }

    /// With future performed-time check on or off
    #[inline]
    #[must_use]
    pub fn with_reject_future_performed(mut self, reject: bool) -> Self {
        self.reject_future_performed = reject;
        self
    }

    /// With request size limit
    #[inline]
    #[must_use]
    pub fn with_max_labware(mut self, max: usize) -> Self {
        self.max_labware_per_request = max;
        self
    }

    /// Parse TOML; missing keys keep their defaults
    ///
    /// # Errors
    /// Returns error on malformed TOML or wrongly typed keys
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load TOML config file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            thickness_measurement_name: "Thickness".to_string(),
            reject_future_performed: true,
            max_labware_per_request: 100,
        }
    }
}
