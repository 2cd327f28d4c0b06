//! Error types for the settings crate.
//!
//! This module provides structured error types for configuration loading
//! and validation.

use std::io;
use thiserror::Error;

/// Errors that can occur during settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A configuration validation error occurred.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to configuration validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The configuration file format is not supported.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A configuration value is out of valid range.
    #[error("Value out of range for '{key}': {value}")]
    ValueOutOfRange { key: String, value: String },

    /// A color value could not be parsed.
    #[error("Invalid color for '{key}': {value}")]
    InvalidColor { key: String, value: String },

    /// An override named a key that does not exist.
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// An override value could not be parsed for its key.
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

impl ConfigError {
    pub(crate) fn out_of_range(key: &str, value: impl ToString) -> Self {
        Self::ValueOutOfRange {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_error_display() {
        let err: SettingsError = ConfigError::UnknownKey("parser.speed".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Config error: Unknown configuration key: parser.speed"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::out_of_range("playback.batch_size", 0);
        assert_eq!(
            err.to_string(),
            "Value out of range for 'playback.batch_size': 0"
        );

        let err = ConfigError::InvalidColor {
            key: "color.progress_color".to_string(),
            value: "#XYZ".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid color for 'color.progress_color': #XYZ"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: SettingsError = ConfigError::UnsupportedFormat("yaml".to_string()).into();
        assert!(matches!(err, SettingsError::Config(_)));

        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: SettingsError = io_err.into();
        assert!(matches!(err, SettingsError::IoError(_)));
    }
}
