//! Cartesian-product expansion of a search-space mapping
//!
//! The expansion walks the mapping one key at a time, in document order.
//! The first key's alternatives drive the outer loop and the expansions
//! of the remaining keys drive the inner loop, so the output order is a
//! stable function of the input document. Callers that index into the
//! expansion rely on this.

use serde_yaml::{Mapping, Value};

use crate::config::value_kind;
use crate::error::GridError;

/// Expand a search-space mapping into every concrete combination.
///
/// Each key contributes a set of alternatives: an atomic value is a
/// single alternative, a sequence is one alternative per (recursively
/// flattened) element, and a nested mapping contributes one alternative
/// per expansion of that mapping. The result is the Cartesian product
/// over all keys, with every output mapping fully independent of the
/// input and of its siblings.
///
/// An empty mapping expands to a single empty configuration. A key with
/// an empty sequence has no alternatives, so the whole product is empty.
pub fn expand(space: &Mapping) -> Result<Vec<Mapping>, GridError> {
    expand_mapping(space, "")
}

pub(crate) fn expand_mapping(mapping: &Mapping, path: &str) -> Result<Vec<Mapping>, GridError> {
    let (first_key, first_value) = match mapping.iter().next() {
        Some(entry) => entry,
        None => return Ok(vec![Mapping::new()]),
    };

    let rest: Mapping = mapping
        .iter()
        .skip(1)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let key_path = child_path(path, &key_label(first_key));
    let alternatives = value_alternatives(first_value, &key_path)?;
    let tails = expand_mapping(&rest, path)?;

    let mut configs = Vec::with_capacity(alternatives.len() * tails.len());
    for alternative in &alternatives {
        for tail in &tails {
            let mut config = Mapping::new();
            config.insert(first_key.clone(), alternative.clone());
            for (key, value) in tail {
                config.insert(key.clone(), value.clone());
            }
            configs.push(config);
        }
    }
    Ok(configs)
}

/// The set of concrete values a single search-space entry can take
fn value_alternatives(value: &Value, path: &str) -> Result<Vec<Value>, GridError> {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Ok(vec![value.clone()])
        }
        Value::Sequence(elements) => {
            let mut alternatives = Vec::new();
            flatten_sequence(elements, path, &mut alternatives)?;
            Ok(alternatives)
        }
        Value::Mapping(nested) => {
            let expanded = expand_mapping(nested, path)?;
            Ok(expanded.into_iter().map(Value::Mapping).collect())
        }
        Value::Tagged(_) => Err(GridError::UnsupportedValueType {
            key: path.to_string(),
            kind: value_kind(value),
        }),
    }
}

/// Flatten a sequence of alternatives, recursing into nested sequences
/// at arbitrary depth and expanding mapping elements in place
fn flatten_sequence(
    elements: &[Value],
    path: &str,
    out: &mut Vec<Value>,
) -> Result<(), GridError> {
    for (index, element) in elements.iter().enumerate() {
        let element_path = format!("{path}[{index}]");
        match element {
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                out.push(element.clone());
            }
            Value::Mapping(nested) => {
                for expanded in expand_mapping(nested, &element_path)? {
                    out.push(Value::Mapping(expanded));
                }
            }
            Value::Sequence(nested) => {
                flatten_sequence(nested, &element_path, out)?;
            }
            Value::Tagged(_) => {
                return Err(GridError::UnsupportedValueType {
                    key: element_path,
                    kind: value_kind(element),
                });
            }
        }
    }
    Ok(())
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn key_label(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn str_of(config: &Mapping, key: &str) -> String {
        config.get(key).unwrap().as_str().unwrap().to_string()
    }

    fn i64_of(config: &Mapping, key: &str) -> i64 {
        config.get(key).unwrap().as_i64().unwrap()
    }

    #[test]
    fn test_two_key_product_ordering() {
        let configs = expand(&space("a: [1, 2]\nb: [x, y]\n")).unwrap();
        let pairs: Vec<(i64, String)> = configs
            .iter()
            .map(|c| (i64_of(c, "a"), str_of(c, "b")))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (1, "x".to_string()),
                (1, "y".to_string()),
                (2, "x".to_string()),
                (2, "y".to_string()),
            ]
        );
    }

    #[test]
    fn test_all_atomic_space_expands_to_itself() {
        let input = space("a: 1\nb: two\nc: true\n");
        let configs = expand(&input).unwrap();
        assert_eq!(configs, vec![input]);
    }

    #[test]
    fn test_atomic_value_is_single_alternative() {
        let configs = expand(&space("lr: 0.01\nlayers: [2, 3, 4]\n")).unwrap();
        assert_eq!(configs.len(), 3);
        for config in &configs {
            assert_eq!(config.get("lr").unwrap().as_f64(), Some(0.01));
        }
    }

    #[test]
    fn test_nested_mapping_expands_recursively() {
        let configs = expand(&space(
            "model:\n  lr: [0.1, 0.01]\n  layers: [2, 3]\nbatch: 32\n",
        ))
        .unwrap();
        assert_eq!(configs.len(), 4);

        let inner: Vec<(f64, i64)> = configs
            .iter()
            .map(|c| {
                let model = c.get("model").unwrap().as_mapping().unwrap();
                (
                    model.get("lr").unwrap().as_f64().unwrap(),
                    i64_of(model, "layers"),
                )
            })
            .collect();
        assert_eq!(inner, vec![(0.1, 2), (0.1, 3), (0.01, 2), (0.01, 3)]);

        for config in &configs {
            assert_eq!(i64_of(config, "batch"), 32);
        }
    }

    #[test]
    fn test_nested_sequences_flatten_in_order() {
        let configs = expand(&space("a: [[1, 2], [3, [4]]]\n")).unwrap();
        let values: Vec<i64> = configs.iter().map(|c| i64_of(c, "a")).collect();
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_mapping_element_inside_sequence() {
        let configs = expand(&space(
            "optimizer:\n  - name: sgd\n    momentum: [0.9, 0.5]\n  - adam\n",
        ))
        .unwrap();
        assert_eq!(configs.len(), 3);

        let first = configs[0].get("optimizer").unwrap().as_mapping().unwrap();
        assert_eq!(str_of(first, "name"), "sgd");
        assert_eq!(first.get("momentum").unwrap().as_f64(), Some(0.9));

        let second = configs[1].get("optimizer").unwrap().as_mapping().unwrap();
        assert_eq!(second.get("momentum").unwrap().as_f64(), Some(0.5));

        assert_eq!(configs[2].get("optimizer").unwrap().as_str(), Some("adam"));
    }

    #[test]
    fn test_empty_space_is_single_empty_config() {
        let configs = expand(&Mapping::new()).unwrap();
        assert_eq!(configs, vec![Mapping::new()]);
    }

    #[test]
    fn test_empty_sequence_empties_the_product() {
        let configs = expand(&space("a: []\nb: [1, 2]\n")).unwrap();
        assert!(configs.is_empty());
    }

    #[test]
    fn test_empty_nested_mapping_is_one_alternative() {
        let configs = expand(&space("a: {}\nb: [1, 2]\n")).unwrap();
        assert_eq!(configs.len(), 2);
        for config in &configs {
            assert_eq!(config.get("a").unwrap().as_mapping(), Some(&Mapping::new()));
        }
    }

    #[test]
    fn test_output_preserves_document_key_order() {
        let configs = expand(&space("zebra: 1\nalpha: [1, 2]\nmango: 2\n")).unwrap();
        for config in &configs {
            let keys: Vec<&str> = config.keys().map(|k| k.as_str().unwrap()).collect();
            assert_eq!(keys, vec!["zebra", "alpha", "mango"]);
        }
    }

    #[test]
    fn test_null_is_a_valid_alternative() {
        let configs = expand(&space("a: [null, 1]\n")).unwrap();
        assert_eq!(configs.len(), 2);
        assert!(configs[0].get("a").unwrap().is_null());
        assert_eq!(i64_of(&configs[1], "a"), 1);
    }

    #[test]
    fn test_tagged_value_is_rejected_with_path() {
        let err = expand(&space("model:\n  kind: !cls Foo\n")).unwrap_err();
        match err {
            GridError::UnsupportedValueType { key, kind } => {
                assert_eq!(key, "model.kind");
                assert_eq!(kind, "tagged");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_tagged_sequence_element_is_rejected_with_index() {
        let err = expand(&space("a: [1, !t 2]\n")).unwrap_err();
        match err {
            GridError::UnsupportedValueType { key, kind } => {
                assert_eq!(key, "a[1]");
                assert_eq!(kind, "tagged");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_outputs_do_not_alias_each_other() {
        let mut configs = expand(&space("a: [1, 1]\n")).unwrap();
        configs[0].insert(Value::from("extra"), Value::from(true));
        assert!(!configs[1].contains_key("extra"));
    }

    #[test]
    fn test_product_count_multiplies() {
        let configs = expand(&space("a: [1, 2, 3]\nb: [1, 2]\nc: [1, 2]\n")).unwrap();
        assert_eq!(configs.len(), 12);
    }
}
