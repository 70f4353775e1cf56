//! This module provides a struct for representing reactions
use crate::configuration::{default_lower_bound, default_upper_bound};
use derive_builder::Builder;
use indexmap::IndexMap;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Used to identify the reaction
    pub id: String,
    /// Metabolite stoichiometry of the reaction, keyed by metabolite id
    ///
    /// Negative coefficients are consumed, positive coefficients are produced.
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Lower flux bound
    #[builder(default = "default_lower_bound()")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "default_upper_bound()")]
    pub upper_bound: f64,
    /// Gene reaction rule, kept as written in the source file
    #[builder(default = "None")]
    pub gene_reaction_rule: Option<String>,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Notes about the reaction
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Reaction Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Reaction {
    /// Sum of all stoichiometric coefficients
    pub fn coefficient_sum(&self) -> f64 {
        self.metabolites.values().sum()
    }

    /// Whether this is a boundary reaction, i.e. it involves exactly one metabolite
    pub fn is_boundary(&self) -> bool {
        self.metabolites.len() == 1
    }

    /// Whether the reaction can carry flux in both directions
    pub fn is_reversible(&self) -> bool {
        self.lower_bound < 0. && self.upper_bound > 0.
    }

    /// Set both flux bounds at once
    ///
    /// # Note:
    /// No validation happens here, use [`crate::metabolic_model::model::Model::set_bounds`]
    /// when the reaction belongs to a model.
    pub(crate) fn set_bounds(&mut self, lower_bound: f64, upper_bound: f64) {
        self.lower_bound = lower_bound;
        self.upper_bound = upper_bound;
    }
}
