//! Module providing YAML IO for Models
//!
//! Models written by COBRA tools wrap every mapping in an ordered map (`!!omap`), a
//! sequence of single entry mappings. These are flattened back into plain mappings
//! before the COBRA schema is applied.
use std::fs;
use std::path::Path;

use log::debug;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::io::json::JsonModel;
use crate::metabolic_model::model::{Model, ModelError};

impl Model {
    /// Read a model in COBRA YAML format
    pub fn read_yaml<P: AsRef<Path>>(path: P) -> Result<Model, YamlError> {
        let model_str = fs::read_to_string(path)?;
        Model::from_yaml_str(&model_str)
    }

    /// Parse a model from a string in COBRA YAML format
    pub fn from_yaml_str(data: &str) -> Result<Model, YamlError> {
        let raw: Value = serde_yaml::from_str(data)?;
        let yaml_model: JsonModel =
            serde_yaml::from_value(restore_entity_lists(flatten_ordered_maps(raw)))?;
        let model = yaml_model.into_model()?;
        debug!(
            "Parsed YAML model with {} reactions and {} metabolites",
            model.reactions.len(),
            model.metabolites.len()
        );
        Ok(model)
    }
}

/// Entity lists of the COBRA schema, never ordered maps themselves
const ENTITY_LISTS: [&str; 3] = ["metabolites", "reactions", "genes"];

/// Turn ordered maps back into mappings
///
/// The `!!omap` tag itself is not kept by the parser, so ordered maps are recognised by
/// shape: a non-empty sequence of single entry mappings with distinct keys.
fn flatten_ordered_maps(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) => flatten_ordered_maps(tagged.value),
        Value::Sequence(items) => {
            let items: Vec<Value> = items.into_iter().map(flatten_ordered_maps).collect();
            if is_ordered_map(&items) {
                let mut mapping = Mapping::new();
                for item in items {
                    if let Value::Mapping(entry) = item {
                        mapping.extend(entry);
                    }
                }
                Value::Mapping(mapping)
            } else {
                Value::Sequence(items)
            }
        }
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .into_iter()
                .map(|(k, v)| (k, flatten_ordered_maps(v)))
                .collect(),
        ),
        other => other,
    }
}

fn is_ordered_map(items: &[Value]) -> bool {
    let mut keys = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Mapping(entry) if entry.len() == 1 => {
                let key = entry.keys().next();
                if keys.contains(&key) {
                    return false;
                }
                keys.push(key);
            }
            _ => return false,
        }
    }
    !items.is_empty()
}

/// A list holding a single one-key entity looks like an ordered map, put it back in a list
fn restore_entity_lists(value: Value) -> Value {
    match value {
        Value::Mapping(mut model) => {
            for list in ENTITY_LISTS {
                if let Some(entry) = model.get_mut(list) {
                    if entry.is_mapping() {
                        let entity = std::mem::take(entry);
                        *entry = Value::Sequence(vec![entity]);
                    }
                }
            }
            Value::Mapping(model)
        }
        other => other,
    }
}

#[derive(Error, Debug)]
pub enum YamlError {
    #[error("Unable to read file: {0}")]
    UnableToRead(#[from] std::io::Error),
    #[error("Unable to parse yaml: {0}")]
    UnableToParse(#[from] serde_yaml::Error),
    #[error("Invalid model: {0}")]
    InvalidModel(#[from] ModelError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn plain_mappings() {
        let data = r#"
metabolites:
  - id: a_c
    compartment: c
reactions:
  - id: DM_a_c
    metabolites:
      a_c: -1.0
    lower_bound: 0.0
    upper_bound: 1000.0
    objective_coefficient: 1.0
id: plain
"#;
        let model = Model::from_yaml_str(data).unwrap();
        assert_eq!(model.id.as_deref(), Some("plain"));
        assert!((model.reaction("DM_a_c").unwrap().metabolites["a_c"] + 1.).abs() < 1e-25);
        assert!((model.objective["DM_a_c"] - 1.).abs() < 1e-25);
    }

    #[test]
    fn ordered_maps_are_flattened() {
        let data = r#"
!!omap
- metabolites:
  - !!omap
    - id: a_c
    - compartment: c
- reactions:
  - !!omap
    - id: R1
    - metabolites: !!omap
      - a_c: -1.0
    - lower_bound: -5.0
    - upper_bound: 5.0
- id: ordered
"#;
        let model = Model::from_yaml_str(data).unwrap();
        assert_eq!(model.id.as_deref(), Some("ordered"));
        let reaction = model.reaction("R1").unwrap();
        assert!((reaction.lower_bound + 5.).abs() < 1e-25);
        assert!((reaction.metabolites["a_c"] + 1.).abs() < 1e-25);
    }

    #[test]
    fn single_entity_lists_survive() {
        let data = r#"
!!omap
- metabolites:
  - !!omap
    - id: a_c
- reactions:
  - !!omap
    - id: DM_a_c
    - metabolites: !!omap
      - a_c: -1.0
- genes: []
- id: single
"#;
        let model = Model::from_yaml_str(data).unwrap();
        assert_eq!(model.id.as_deref(), Some("single"));
        assert_eq!(model.metabolites.len(), 1);
        assert!((model.reaction("DM_a_c").unwrap().metabolites["a_c"] + 1.).abs() < 1e-25);
    }

    #[test]
    fn ordered_map_shape() {
        let omap: Value = serde_yaml::from_str("!!omap\n- id: x\n- name: y\n").unwrap();
        let flat = flatten_ordered_maps(omap);
        assert_eq!(flat.get("id").and_then(Value::as_str), Some("x"));
        assert_eq!(flat.get("name").and_then(Value::as_str), Some("y"));
        // Repeated keys and multi key items stay lists
        let list: Value = serde_yaml::from_str("- id: x\n- id: y\n").unwrap();
        assert!(flatten_ordered_maps(list).is_sequence());
        let entities: Value = serde_yaml::from_str("- id: x\n  name: y\n").unwrap();
        assert!(flatten_ordered_maps(entities).is_sequence());
        let empty: Value = serde_yaml::from_str("[]").unwrap();
        assert!(flatten_ordered_maps(empty).is_sequence());
    }

    #[test]
    fn read_toy_model() {
        let data_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("test_models")
            .join("toy_atp.yml");
        let model = Model::read_yaml(data_path).unwrap();
        assert_eq!(model.name.as_deref(), Some("Toy ATP model"));
        assert_eq!(model.metabolites.len(), 12);
        assert_eq!(model.reactions.len(), 13);
        // Parenthesis compartment tags are kept as written
        assert!(model.metabolites.contains_key("atp(c)"));
        let synthase = model.reaction("ATPS4m").unwrap();
        assert!((synthase.metabolites["h(i)"] + 4.).abs() < 1e-25);
        assert_eq!(model.version.as_deref(), Some("1"));
    }

    #[test]
    fn invalid_yaml() {
        assert!(matches!(
            Model::from_yaml_str("reactions: [unclosed"),
            Err(YamlError::UnableToParse(_))
        ));
    }
}
