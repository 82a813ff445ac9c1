//! Grid search over experiment configuration documents
//!
//! A [`Grid`] is built from a configuration document whose `grid`
//! section describes the hyperparameter search space. Construction
//! eagerly computes every combination, injects the shared metadata into
//! each one, and caches the result; iteration and indexing never
//! re-expand.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::config::{value_kind, ExperimentConfig, SourceInfo};
use crate::error::GridError;

mod expand;
mod metadata;

pub use expand::expand;
pub use metadata::{keys, ClassSpec, SharedMetadata};

/// All concrete configurations produced by a configuration document
#[derive(Debug, Clone)]
pub struct Grid {
    metadata: SharedMetadata,
    configs: Vec<ResolvedConfig>,
    overridden_keys: Vec<String>,
    source: Option<SourceInfo>,
}

impl Grid {
    /// Load a configuration document from disk and expand it
    pub fn from_file(path: &Path) -> Result<Self, GridError> {
        Self::from_config(ExperimentConfig::from_file(path)?)
    }

    /// Parse a configuration document from YAML text and expand it
    pub fn from_str(content: &str) -> Result<Self, GridError> {
        Self::from_config(ExperimentConfig::from_str(content)?)
    }

    /// Expand an already-parsed configuration document.
    ///
    /// Fails if a required metadata field is missing or mistyped, if the
    /// `grid` section is absent or not a mapping, or if the search space
    /// holds a value kind the expansion cannot enumerate.
    pub fn from_config(config: ExperimentConfig) -> Result<Self, GridError> {
        let source = config.source().cloned();
        let document = config.into_mapping();
        let metadata = SharedMetadata::from_mapping(&document)?;

        let space = match document.get(keys::GRID) {
            None => return Err(GridError::missing(keys::GRID)),
            Some(Value::Mapping(space)) => space,
            Some(other) => {
                return Err(GridError::UnsupportedValueType {
                    key: keys::GRID.to_string(),
                    kind: value_kind(other),
                })
            }
        };

        let mut overridden_keys: Vec<String> = Vec::new();
        let mut configs = Vec::new();
        for mut expanded in expand::expand_mapping(space, keys::GRID)? {
            for key in metadata.apply(&mut expanded) {
                if !overridden_keys.contains(&key) {
                    overridden_keys.push(key);
                }
            }
            configs.push(ResolvedConfig(expanded));
        }

        Ok(Self {
            metadata,
            configs,
            overridden_keys,
            source,
        })
    }

    /// Every resolved configuration, in expansion order
    pub fn configs(&self) -> &[ResolvedConfig] {
        &self.configs
    }

    /// Number of configurations in the grid
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// The configuration at `index`, if in range
    pub fn get(&self, index: usize) -> Option<&ResolvedConfig> {
        self.configs.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedConfig> {
        self.configs.iter()
    }

    /// Name of the experiment root folder: `<exp_name>_<dataset_name>`
    pub fn experiment_name(&self) -> String {
        self.metadata.experiment_name()
    }

    /// The shared metadata extracted from the document
    pub fn metadata(&self) -> &SharedMetadata {
        &self.metadata
    }

    /// Seed forwarded to downstream runs, if one was configured
    pub fn seed(&self) -> Option<i64> {
        self.metadata.seed
    }

    /// Search-space keys that metadata injection overwrote, if any
    pub fn overridden_keys(&self) -> &[String] {
        &self.overridden_keys
    }

    /// Where the document came from, if it was loaded from disk
    pub fn source(&self) -> Option<&SourceInfo> {
        self.source.as_ref()
    }
}

impl<'a> IntoIterator for &'a Grid {
    type Item = &'a ResolvedConfig;
    type IntoIter = std::slice::Iter<'a, ResolvedConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.configs.iter()
    }
}

/// One concrete configuration: a point of the search space plus the
/// injected shared fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedConfig(Mapping);

impl ResolvedConfig {
    /// The configuration as a key-ordered mapping
    pub fn mapping(&self) -> &Mapping {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn into_mapping(self) -> Mapping {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
exp_name: grid_demo
data_root: DATA/
dataset_class: datasets.TUDataset
dataset_name: PROTEINS
dataset_getter: providers.DataProvider
device: cpu
experiment: tasks.SupervisedTask
higher_results_are_better: true
evaluate_every: 5
grid:
  model: models.GIN
  lr: [0.1, 0.01]
  layers: [2, 3]
"#;

    #[test]
    fn test_expansion_count_and_order() {
        let grid = Grid::from_str(DOC).unwrap();
        assert_eq!(grid.len(), 4);
        assert!(!grid.is_empty());

        let pairs: Vec<(f64, i64)> = grid
            .iter()
            .map(|c| (c.get_f64("lr").unwrap(), c.get_i64("layers").unwrap()))
            .collect();
        assert_eq!(pairs, vec![(0.1, 2), (0.1, 3), (0.01, 2), (0.01, 3)]);
    }

    #[test]
    fn test_metadata_is_injected_into_every_config() {
        let grid = Grid::from_str(DOC).unwrap();
        for config in &grid {
            assert_eq!(config.get_str("model"), Some("models.GIN"));
            assert_eq!(config.get_str("dataset"), Some("PROTEINS"));
            assert_eq!(config.get_str("device"), Some("cpu"));
            assert_eq!(config.get_bool("higher_results_are_better"), Some(true));
            assert_eq!(config.get_u64("evaluate_every"), Some(5));
            assert_eq!(config.get("data_loader"), Some(&Value::Null));
        }
    }

    #[test]
    fn test_config_key_order_is_grid_then_injected() {
        let grid = Grid::from_str(DOC).unwrap();
        let keys: Vec<&str> = grid.get(0).unwrap().mapping().keys()
            .map(|k| k.as_str().unwrap())
            .collect();
        assert_eq!(
            keys,
            vec![
                "model",
                "lr",
                "layers",
                "dataset",
                "dataset_getter",
                "data_loader",
                "data_loader_args",
                "dataset_class",
                "data_root",
                "device",
                "experiment",
                "higher_results_are_better",
                "evaluate_every",
            ]
        );
    }

    #[test]
    fn test_experiment_name() {
        let grid = Grid::from_str(DOC).unwrap();
        assert_eq!(grid.experiment_name(), "grid_demo_PROTEINS");
    }

    #[test]
    fn test_missing_grid_section() {
        let doc = DOC.replace("grid:", "other:");
        let err = Grid::from_str(&doc).unwrap_err();
        match err {
            GridError::MissingRequiredField { field } => assert_eq!(field, "grid"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_grid_section_must_be_a_mapping() {
        let doc = r#"
exp_name: e
data_root: d
dataset_class: c
dataset_name: n
dataset_getter: g
device: cpu
experiment: x
higher_results_are_better: false
evaluate_every: 1
grid: [1, 2]
"#;
        let err = Grid::from_str(doc).unwrap_err();
        match err {
            GridError::UnsupportedValueType { key, kind } => {
                assert_eq!(key, "grid");
                assert_eq!(kind, "sequence");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_grid_yields_metadata_only_config() {
        let doc = DOC.replace(
            "grid:\n  model: models.GIN\n  lr: [0.1, 0.01]\n  layers: [2, 3]",
            "grid: {}",
        );
        let grid = Grid::from_str(&doc).unwrap();
        assert_eq!(grid.len(), 1);
        let config = grid.get(0).unwrap();
        assert_eq!(config.mapping().len(), 10);
        assert_eq!(config.get_str("dataset"), Some("PROTEINS"));
    }

    #[test]
    fn test_overridden_keys_are_reported_once() {
        let doc = DOC.replace("  model: models.GIN", "  device: [cuda, mps]");
        let grid = Grid::from_str(&doc).unwrap();
        assert_eq!(grid.overridden_keys(), ["device".to_string()]);
        // injection wins in every config
        for config in &grid {
            assert_eq!(config.get_str("device"), Some("cpu"));
        }
    }

    #[test]
    fn test_error_paths_are_rooted_at_grid() {
        let doc = DOC.replace("  model: models.GIN", "  model: !cls GIN");
        let err = Grid::from_str(&doc).unwrap_err();
        match err {
            GridError::UnsupportedValueType { key, .. } => assert_eq!(key, "grid.model"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_get_out_of_range() {
        let grid = Grid::from_str(DOC).unwrap();
        assert!(grid.get(4).is_none());
    }

    #[test]
    fn test_seed_defaults_to_none() {
        let grid = Grid::from_str(DOC).unwrap();
        assert_eq!(grid.seed(), None);
        let doc = DOC.replace("exp_name: grid_demo", "exp_name: grid_demo\nseed: 7");
        let grid = Grid::from_str(&doc).unwrap();
        assert_eq!(grid.seed(), Some(7));
    }
}
