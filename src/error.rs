//! Error taxonomy for configuration loading and expansion.
//!
//! Every failure surfaces synchronously at load or construction time;
//! an expansion either fully succeeds or the whole operation fails.

use std::path::PathBuf;

/// Errors raised while loading or expanding an experiment configuration
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// A required metadata key is absent from the configuration
    #[error("Missing required field '{field}'")]
    MissingRequiredField { field: String },

    /// A search-space value is neither atomic, sequence, nor mapping,
    /// or a mapping was required and something else was found
    #[error("Unsupported value type at '{key}': {kind}")]
    UnsupportedValueType { key: String, kind: &'static str },

    /// A metadata key is present but holds the wrong type
    #[error("Field '{field}' must be {expected}, got {found}")]
    InvalidFieldType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A metadata value is outside its allowed range
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),
}

impl GridError {
    /// Missing-field constructor, to keep call sites short
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        GridError::MissingRequiredField {
            field: field.into(),
        }
    }
}
