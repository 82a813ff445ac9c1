//! Shared experiment metadata
//!
//! Every configuration document carries a set of top-level fields that
//! apply to all expanded configurations: dataset identity, device,
//! experiment driver, evaluation cadence. These are extracted and
//! type-checked once, then injected into each expanded configuration.

use serde_yaml::{Mapping, Value};

use crate::config::value_kind;
use crate::error::GridError;

/// Reserved top-level keys in a configuration document
pub mod keys {
    /// Section holding the hyperparameter search space
    pub const GRID: &str = "grid";
    pub const EXP_NAME: &str = "exp_name";
    pub const SEED: &str = "seed";
    pub const DATA_ROOT: &str = "data_root";
    pub const DATASET_CLASS: &str = "dataset_class";
    pub const DATASET_NAME: &str = "dataset_name";
    /// Key under which the dataset name is injected into each config
    pub const DATASET: &str = "dataset";
    pub const DATASET_GETTER: &str = "dataset_getter";
    pub const DATA_LOADER: &str = "data_loader";
    pub const DATA_LOADER_ARGS: &str = "data_loader_args";
    pub const DEVICE: &str = "device";
    pub const EXPERIMENT: &str = "experiment";
    pub const HIGHER_RESULTS_ARE_BETTER: &str = "higher_results_are_better";
    pub const EVALUATE_EVERY: &str = "evaluate_every";
}

/// A class reference with optional constructor arguments.
///
/// Accepts either a bare string (`data_loader: loaders.DataLoader`) or a
/// mapping with `class_name` and optional `args`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSpec {
    pub class_name: String,
    pub args: Mapping,
}

impl ClassSpec {
    /// Parse a class reference, treating null as absent
    pub fn from_value(value: &Value, field: &str) -> Result<Option<Self>, GridError> {
        match value {
            Value::Null => Ok(None),
            Value::String(class_name) => Ok(Some(Self {
                class_name: class_name.clone(),
                args: Mapping::new(),
            })),
            Value::Mapping(mapping) => {
                let class_name = match mapping.get("class_name") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => {
                        return Err(GridError::InvalidFieldType {
                            field: format!("{field}.class_name"),
                            expected: "a string",
                            found: value_kind(other),
                        })
                    }
                    None => return Err(GridError::missing(format!("{field}.class_name"))),
                };
                let args = match mapping.get("args") {
                    None | Some(Value::Null) => Mapping::new(),
                    Some(Value::Mapping(args)) => args.clone(),
                    Some(other) => {
                        return Err(GridError::InvalidFieldType {
                            field: format!("{field}.args"),
                            expected: "a mapping",
                            found: value_kind(other),
                        })
                    }
                };
                Ok(Some(Self { class_name, args }))
            }
            other => Err(GridError::InvalidFieldType {
                field: field.to_string(),
                expected: "a string or mapping",
                found: value_kind(other),
            }),
        }
    }
}

/// Top-level fields shared by every expanded configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SharedMetadata {
    /// Base experiment name, joined with the dataset name for display
    pub exp_name: String,
    /// Optional seed forwarded to downstream runs
    pub seed: Option<i64>,
    pub data_root: String,
    pub dataset_class: String,
    pub dataset_name: String,
    pub dataset_getter: String,
    pub data_loader: Option<ClassSpec>,
    pub device: String,
    pub experiment: String,
    pub higher_results_are_better: bool,
    /// Epoch interval between evaluations, always at least 1
    pub evaluate_every: u64,
}

impl SharedMetadata {
    /// Extract and type-check the shared fields of a configuration document
    pub fn from_mapping(mapping: &Mapping) -> Result<Self, GridError> {
        let evaluate_every = require_u64(mapping, keys::EVALUATE_EVERY)?;
        if evaluate_every == 0 {
            return Err(GridError::InvalidValue {
                field: keys::EVALUATE_EVERY.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let data_loader = match mapping.get(keys::DATA_LOADER) {
            Some(value) => ClassSpec::from_value(value, keys::DATA_LOADER)?,
            None => None,
        };

        Ok(Self {
            exp_name: require_str(mapping, keys::EXP_NAME)?,
            seed: optional_i64(mapping, keys::SEED)?,
            data_root: require_str(mapping, keys::DATA_ROOT)?,
            dataset_class: require_str(mapping, keys::DATASET_CLASS)?,
            dataset_name: require_str(mapping, keys::DATASET_NAME)?,
            dataset_getter: require_str(mapping, keys::DATASET_GETTER)?,
            data_loader,
            device: require_str(mapping, keys::DEVICE)?,
            experiment: require_str(mapping, keys::EXPERIMENT)?,
            higher_results_are_better: require_bool(mapping, keys::HIGHER_RESULTS_ARE_BETTER)?,
            evaluate_every,
        })
    }

    /// Name of the experiment root folder: `<exp_name>_<dataset_name>`
    pub fn experiment_name(&self) -> String {
        format!("{}_{}", self.exp_name, self.dataset_name)
    }

    /// Inject the shared fields into an expanded configuration.
    ///
    /// Injection wins on collision: a key produced by the expansion is
    /// overwritten in place, keeping its position. Returns the names of
    /// the keys that were overwritten so callers can warn about them.
    pub fn apply(&self, config: &mut Mapping) -> Vec<String> {
        let mut overridden = Vec::new();
        for (key, value) in self.injected_entries() {
            if config.contains_key(key) {
                overridden.push(key.to_string());
            }
            config.insert(Value::from(key), value);
        }
        overridden
    }

    /// Injected key/value pairs, in injection order
    fn injected_entries(&self) -> Vec<(&'static str, Value)> {
        let (loader_class, loader_args) = match &self.data_loader {
            Some(loader) => (
                Value::from(loader.class_name.clone()),
                Value::Mapping(loader.args.clone()),
            ),
            None => (Value::Null, Value::Null),
        };
        vec![
            (keys::DATASET, Value::from(self.dataset_name.clone())),
            (keys::DATASET_GETTER, Value::from(self.dataset_getter.clone())),
            (keys::DATA_LOADER, loader_class),
            (keys::DATA_LOADER_ARGS, loader_args),
            (keys::DATASET_CLASS, Value::from(self.dataset_class.clone())),
            (keys::DATA_ROOT, Value::from(self.data_root.clone())),
            (keys::DEVICE, Value::from(self.device.clone())),
            (keys::EXPERIMENT, Value::from(self.experiment.clone())),
            (
                keys::HIGHER_RESULTS_ARE_BETTER,
                Value::from(self.higher_results_are_better),
            ),
            (keys::EVALUATE_EVERY, Value::from(self.evaluate_every)),
        ]
    }
}

fn require_str(mapping: &Mapping, field: &str) -> Result<String, GridError> {
    match mapping.get(field) {
        None => Err(GridError::missing(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(GridError::InvalidFieldType {
            field: field.to_string(),
            expected: "a string",
            found: value_kind(other),
        }),
    }
}

fn require_bool(mapping: &Mapping, field: &str) -> Result<bool, GridError> {
    match mapping.get(field) {
        None => Err(GridError::missing(field)),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(GridError::InvalidFieldType {
            field: field.to_string(),
            expected: "a boolean",
            found: value_kind(other),
        }),
    }
}

fn require_u64(mapping: &Mapping, field: &str) -> Result<u64, GridError> {
    match mapping.get(field) {
        None => Err(GridError::missing(field)),
        Some(value) => value.as_u64().ok_or_else(|| GridError::InvalidFieldType {
            field: field.to_string(),
            expected: "a non-negative integer",
            found: value_kind(value),
        }),
    }
}

fn optional_i64(mapping: &Mapping, field: &str) -> Result<Option<i64>, GridError> {
    match mapping.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| GridError::InvalidFieldType {
                field: field.to_string(),
                expected: "an integer",
                found: value_kind(value),
            }),
    }
}
