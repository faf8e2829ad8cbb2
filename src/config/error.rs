//! Configuration Error Types
//!
//! Specific, actionable errors for configuration and catalog loading.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Configuration file not found at expected location
    #[error("Configuration file not found. Searched paths: {searched_paths:?}")]
    ConfigFileNotFound { searched_paths: Vec<PathBuf> },

    /// Layered sources could not be read or merged
    #[error("Failed to load configuration from '{source_path}': {error}")]
    LoadFailed { source_path: String, error: String },

    /// Loaded values do not fit the configuration structure
    #[error("Failed to deserialize {context}: {error}")]
    DeserializationFailed { context: String, error: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// Catalog entries reference each other inconsistently
    #[error("Invalid catalog entry '{entry}': {reason}")]
    InvalidCatalog { entry: String, reason: String },
}

impl ConfigurationError {
    pub fn config_file_not_found(searched_paths: Vec<PathBuf>) -> Self {
        Self::ConfigFileNotFound { searched_paths }
    }

    pub fn load_failed(source_path: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::LoadFailed {
            source_path: source_path.into(),
            error: error.to_string(),
        }
    }

    pub fn deserialization_failed(
        context: impl Into<String>,
        error: impl std::fmt::Display,
    ) -> Self {
        Self::DeserializationFailed {
            context: context.into(),
            error: error.to_string(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    pub fn invalid_catalog(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
