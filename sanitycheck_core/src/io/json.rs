//! Module providing JSON IO for Models
//!
//! The COBRA JSON schema is also used for YAML models, see [`crate::io::yaml`].
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::configuration;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::{Model, ModelError};
use crate::metabolic_model::reaction::ReactionBuilder;

// region JSON Model
/// Represents a serialized model in the COBRA JSON/YAML schema
#[derive(Deserialize)]
pub(crate) struct JsonModel {
    #[serde(default)]
    metabolites: Vec<JsonMetabolite>,
    #[serde(default)]
    reactions: Vec<JsonReaction>,
    id: Option<String>,
    name: Option<String>,
    compartments: Option<IndexMap<String, String>>,
    version: Option<Value>,
}

#[derive(Deserialize)]
struct JsonMetabolite {
    id: String,
    name: Option<String>,
    compartment: Option<String>,
    charge: Option<f64>,
    formula: Option<String>,
    notes: Option<Value>,
    annotation: Option<Value>,
}

#[derive(Deserialize)]
struct JsonReaction {
    id: String,
    name: Option<String>,
    #[serde(default)]
    metabolites: IndexMap<String, f64>,
    lower_bound: Option<f64>,
    upper_bound: Option<f64>,
    gene_reaction_rule: Option<String>,
    objective_coefficient: Option<f64>,
    subsystem: Option<String>,
    notes: Option<Value>,
    annotation: Option<Value>,
}
// endregion JSON Model

// region Conversions
impl From<JsonMetabolite> for Metabolite {
    fn from(m: JsonMetabolite) -> Self {
        Self {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
            charge: m.charge.map(|c| c as i32).unwrap_or_default(),
            formula: m.formula,
            notes: m.notes.map(|v| v.to_string()),
            annotation: m.annotation.map(|v| v.to_string()),
        }
    }
}

impl JsonModel {
    /// Convert into a [`Model`], validating every reaction against the metabolites
    pub(crate) fn into_model(self) -> Result<Model, ModelError> {
        let config = configuration::current();
        let mut model = Model::new_empty();
        for met in self.metabolites {
            model.add_metabolite(Metabolite::from(met))?;
        }
        for rxn in self.reactions {
            let new_reaction = ReactionBuilder::default()
                .id(rxn.id.clone())
                .metabolites(rxn.metabolites)
                .name(rxn.name)
                .lower_bound(rxn.lower_bound.unwrap_or(config.lower_bound))
                .upper_bound(rxn.upper_bound.unwrap_or(config.upper_bound))
                .gene_reaction_rule(rxn.gene_reaction_rule.filter(|rule| !rule.is_empty()))
                .subsystem(rxn.subsystem)
                .notes(rxn.notes.map(|v| v.to_string()))
                .annotation(rxn.annotation.map(|v| v.to_string()))
                .build()?;
            model.add_reaction(new_reaction)?;
            // Add the reaction to the objective function if desired
            if let Some(coef) = rxn.objective_coefficient.filter(|c| *c != 0.) {
                model.objective.insert(rxn.id, coef);
            }
        }
        model.id = self.id;
        model.name = self.name;
        model.compartments = self.compartments;
        model.version = self.version.map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        });
        Ok(model)
    }
}

impl Model {
    /// Read a model in COBRA JSON format
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Model, JsonError> {
        let model_str = fs::read_to_string(path)?;
        Model::from_json_str(&model_str)
    }

    /// Parse a model from a string in COBRA JSON format
    pub fn from_json_str(data: &str) -> Result<Model, JsonError> {
        let json_model: JsonModel = serde_json::from_str(data)?;
        let model = json_model.into_model()?;
        debug!(
            "Parsed JSON model with {} reactions and {} metabolites",
            model.reactions.len(),
            model.metabolites.len()
        );
        Ok(model)
    }
}
// endregion Conversions

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to read file: {0}")]
    UnableToRead(#[from] std::io::Error),
    #[error("Unable to parse json: {0}")]
    UnableToParse(#[from] serde_json::Error),
    #[error("Invalid model: {0}")]
    InvalidModel(#[from] ModelError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn json_metabolite() {
        let data = r#"{
"id":"glc__D_e",
"name":"D-Glucose",
"compartment":"e",
"charge":0,
"formula":"C6H12O6",
"notes":{
"original_bigg_ids":[
"glc_D_e"
]
},
"annotation":{
"bigg.metabolite":[
"glc__D"
],
"kegg.compound":[
"C00031"
],
"sbo":"SBO:0000247"
}
}"#;
        let met: JsonMetabolite = serde_json::from_str(data).unwrap();
        let met = Metabolite::from(met);
        assert_eq!(met.id, "glc__D_e");
        assert_eq!(met.name.unwrap(), "D-Glucose");
        assert_eq!(met.compartment.unwrap(), "e");
        assert_eq!(met.charge, 0);
        assert_eq!(met.formula.unwrap(), "C6H12O6");
        assert!(met.annotation.unwrap().contains("C00031"));
    }

    #[test]
    fn json_reaction() {
        let data = r#"{
"id":"PFK",
"name":"Phosphofructokinase",
"metabolites":{
"adp_c":1.0,
"atp_c":-1.0,
"f6p_c":-1.0,
"fdp_c":1.0,
"h_c":1.0
},
"lower_bound":0.0,
"upper_bound":1000.0,
"gene_reaction_rule":"b3916 or b1723",
"subsystem":"Glycolysis/Gluconeogenesis"
}"#;
        let reaction: JsonReaction = serde_json::from_str(data).unwrap();
        assert_eq!(reaction.id, "PFK");
        assert_eq!(reaction.name.unwrap(), "Phosphofructokinase");
        assert_eq!(reaction.metabolites.len(), 5);
        assert!((reaction.metabolites["atp_c"] + 1.0).abs() < 1e-25);
        assert!((reaction.lower_bound.unwrap() - 0.0).abs() < 1e-25);
        assert!((reaction.upper_bound.unwrap() - 1000.0).abs() < 1e-25);
        assert_eq!(reaction.gene_reaction_rule.unwrap(), "b3916 or b1723");
        assert_eq!(reaction.subsystem.unwrap(), "Glycolysis/Gluconeogenesis");
    }

    #[test]
    fn reaction_bounds_default_when_missing() {
        let data = r#"{
"metabolites":[{"id":"a_c","compartment":"c"}],
"reactions":[{"id":"DM_a_c","metabolites":{"a_c":-1.0},"objective_coefficient":1.0}]
}"#;
        let model = Model::from_json_str(data).unwrap();
        let reaction = model.reaction("DM_a_c").unwrap();
        assert!((reaction.lower_bound + 1000.).abs() < 1e-25);
        assert!((reaction.upper_bound - 1000.).abs() < 1e-25);
        assert!(reaction.gene_reaction_rule.is_none());
        assert!((model.objective["DM_a_c"] - 1.).abs() < 1e-25);
        assert!(model.name.is_none());
    }

    #[test]
    fn unknown_metabolite_is_rejected() {
        let data = r#"{
"metabolites":[],
"reactions":[{"id":"R","metabolites":{"x_c":-1.0},"lower_bound":0.0,"upper_bound":1.0}]
}"#;
        assert!(matches!(
            Model::from_json_str(data),
            Err(JsonError::InvalidModel(ModelError::UnknownMetabolite { .. }))
        ));
        assert!(matches!(
            Model::from_json_str("{ not json"),
            Err(JsonError::UnableToParse(_))
        ));
    }

    #[test]
    fn read_toy_model() {
        let data_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("test_models")
            .join("toy_atp.json");
        let model = Model::read_json(data_path).unwrap();
        assert_eq!(model.id.as_deref(), Some("toy_atp"));
        assert_eq!(model.metabolites.len(), 12);
        assert_eq!(model.reactions.len(), 13);
        assert_eq!(
            model.compartments.as_ref().unwrap()["e"],
            "extracellular space"
        );
        let glycolysis = model.reaction("GLYC").unwrap();
        assert!((glycolysis.metabolites["pyr_c"] - 2.).abs() < 1e-25);
        assert!((model.reaction("EX_glc_D_e").unwrap().lower_bound + 10.).abs() < 1e-25);
        assert_eq!(model.objective.len(), 0);
    }
}
