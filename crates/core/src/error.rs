//! Core error types for configuration and manifest handling.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use std::path::PathBuf;

use thiserror::Error;

/// The standard Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type.
#[derive(Debug, Error)]
pub enum Error {
    // I/O errors
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    // Parsing errors
    #[error("TOML parse error in '{path}': {reason}")]
    TomlParseFailed { path: PathBuf, reason: String },

    #[error("YAML parse error: {reason}")]
    YamlParseFailed { reason: String },

    // Configuration errors
    #[error("invalid value for {key}: {reason}")]
    InvalidEnvValue { key: String, reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a TOML parse error.
    pub fn toml_parse_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::TomlParseFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a YAML parse error.
    pub fn yaml_parse_failed(reason: impl Into<String>) -> Self {
        Self::YamlParseFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid environment value error.
    pub fn invalid_env_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEnvValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
