//! Expansion manifests
//!
//! A manifest is the JSON record of one expansion: the resolved
//! configurations plus enough provenance to detect drift between the
//! manifest and the document it was produced from.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SourceInfo;
use crate::error::GridError;
use crate::grid::{Grid, ResolvedConfig};

pub const SCHEMA_VERSION: u32 = 1;
pub const SCHEMA_ID: &str = "gridconf/expansion@1";

/// JSON record of a single grid expansion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionManifest {
    pub schema_id: String,
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    /// Joined experiment name: `<exp_name>_<dataset_name>`
    pub exp_name: String,
    pub dataset_name: String,
    pub num_configs: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overridden_keys: Vec<String>,
    pub configs: Vec<ResolvedConfig>,
}

impl ExpansionManifest {
    /// Snapshot a grid into a manifest
    pub fn from_grid(grid: &Grid) -> Self {
        Self {
            schema_id: SCHEMA_ID.to_string(),
            schema_version: SCHEMA_VERSION,
            created_at: Utc::now(),
            exp_name: grid.experiment_name(),
            dataset_name: grid.metadata().dataset_name.clone(),
            num_configs: grid.len(),
            seed: grid.seed(),
            source: grid.source().cloned(),
            overridden_keys: grid.overridden_keys().to_vec(),
            configs: grid.configs().to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<String, GridError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self, GridError> {
        let manifest: Self = serde_json::from_str(content)?;
        if manifest.schema_id != SCHEMA_ID {
            return Err(GridError::InvalidValue {
                field: "schema_id".to_string(),
                reason: format!("expected '{}', found '{}'", SCHEMA_ID, manifest.schema_id),
            });
        }
        Ok(manifest)
    }

    pub fn from_file(path: &Path) -> Result<Self, GridError> {
        if !path.exists() {
            return Err(GridError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the manifest atomically: serialize to a temp file next to
    /// the target, then rename into place.
    pub fn write_to_file(&self, path: &Path) -> Result<(), GridError> {
        let json = self.to_json()?;
        let tmp = path.with_extension(format!("tmp.{}", Uuid::new_v4()));
        fs::write(&tmp, json.as_bytes())?;
        if let Err(err) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }

    /// Compare this manifest against a freshly expanded grid.
    ///
    /// Returns one line per mismatch; an empty result means the manifest
    /// still describes the document exactly.
    pub fn verify_against(&self, grid: &Grid) -> Vec<String> {
        let mut mismatches = Vec::new();

        if self.exp_name != grid.experiment_name() {
            mismatches.push(format!(
                "experiment name changed: manifest has '{}', document has '{}'",
                self.exp_name,
                grid.experiment_name()
            ));
        }
        if self.dataset_name != grid.metadata().dataset_name {
            mismatches.push(format!(
                "dataset changed: manifest has '{}', document has '{}'",
                self.dataset_name,
                grid.metadata().dataset_name
            ));
        }
        if self.num_configs != grid.len() {
            mismatches.push(format!(
                "config count changed: manifest has {}, document expands to {}",
                self.num_configs,
                grid.len()
            ));
            return mismatches;
        }

        for (index, (stored, fresh)) in self.configs.iter().zip(grid.iter()).enumerate() {
            if stored != fresh {
                mismatches.push(format!("config {index} differs from the manifest"));
            }
        }
        mismatches
    }
}
