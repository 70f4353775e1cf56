//! This module provides the metabolite struct representing a metabolite

use derive_builder::Builder;

/// Represents a metabolite
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Metabolite {
    /// Used to identify the metabolite (must be unique), including its compartment tag,
    /// e.g. `atp[c]`
    pub id: String,
    /// Human Readable name of the metabolite
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Which compartment the metabolite is in
    #[builder(default = "None")]
    pub compartment: Option<String>,
    /// Electrical charge of the Metabolite
    #[builder(default = "0")]
    pub charge: i32,
    /// Chemical Formula of the metabolite
    #[builder(default = "None")]
    pub formula: Option<String>,
    /// Notes about the metabolite
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Metabolite annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Metabolite {
    /// Create a new metabolite with an id, name and compartment
    pub fn new(id: &str, name: &str, compartment: &str) -> Metabolite {
        Metabolite {
            id: id.to_string(),
            name: Some(name.to_string()),
            compartment: Some(compartment.to_string()),
            charge: 0,
            formula: None,
            notes: None,
            annotation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let met = MetaboliteBuilder::default()
            .id("atp[c]".to_string())
            .build()
            .unwrap();
        assert_eq!(met.id, "atp[c]");
        assert!(met.name.is_none());
        assert!(met.compartment.is_none());
        assert_eq!(met.charge, 0);
    }

    #[test]
    fn new_sets_name_and_compartment() {
        let met = Metabolite::new("o2[e]", "Extracellular oxygen", "e");
        assert_eq!(met.name.unwrap(), "Extracellular oxygen");
        assert_eq!(met.compartment.unwrap(), "e");
    }
}
