//! Experiment configuration documents
//!
//! A configuration document is a YAML mapping holding shared experiment
//! metadata at the top level and, typically, a `grid` section describing
//! the hyperparameter search space. Loading preserves key order exactly
//! as written in the file; expansion order depends on it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};

use crate::error::GridError;

/// Provenance of a configuration document loaded from disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Path the document was loaded from
    pub path: String,
    /// Hex-encoded SHA-256 of the raw file contents
    pub digest: String,
}

/// A parsed experiment configuration document.
///
/// Wraps the root mapping of a YAML file together with optional source
/// provenance. The root of the document must be a mapping; anything else
/// is rejected at load time.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    mapping: Mapping,
    source: Option<SourceInfo>,
}

impl ExperimentConfig {
    /// Load a configuration document from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, GridError> {
        if !path.exists() {
            return Err(GridError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        config.source = Some(SourceInfo {
            path: path.display().to_string(),
            digest: sha256_hex(content.as_bytes()),
        });
        Ok(config)
    }

    /// Parse a configuration document from YAML text
    pub fn from_str(content: &str) -> Result<Self, GridError> {
        let root: Value = serde_yaml::from_str(content)?;
        match root {
            Value::Mapping(mapping) => Ok(Self {
                mapping,
                source: None,
            }),
            other => Err(GridError::UnsupportedValueType {
                key: "$".to_string(),
                kind: value_kind(&other),
            }),
        }
    }

    /// Wrap an already-parsed root mapping
    pub fn from_mapping(mapping: Mapping) -> Self {
        Self {
            mapping,
            source: None,
        }
    }

    /// Look up a top-level key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.mapping.get(key)
    }

    /// The root mapping, in document order
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Where this document came from, if it was loaded from disk
    pub fn source(&self) -> Option<&SourceInfo> {
        self.source.as_ref()
    }

    /// Consume the document, yielding the root mapping
    pub fn into_mapping(self) -> Mapping {
        self.mapping
    }
}

/// Human-readable name for a YAML value's kind, used in error messages
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
