//! This module provides the Model struct for representing an entire metabolic model
use std::fmt::{Display, Formatter};

use crate::configuration;
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::reaction::{Reaction, ReactionBuilder};

use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use thiserror::Error;

/// Compartment ids (and names) recognised as the extracellular compartment
const EXTERNAL_COMPARTMENTS: [&str; 8] = [
    "e",
    "e0",
    "ex",
    "extr",
    "out",
    "extracellular",
    "extracellular space",
    "extraorganism",
];

/// Represents a Genome Scale Metabolic Model
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    /// Map of reaction ids to Reactions
    pub reactions: IndexMap<String, Reaction>,
    /// Map of metabolite ids to Metabolites
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Id associated with the Model
    pub id: Option<String>,
    /// Human readable name of the Model
    pub name: Option<String>,
    /// Compartments in the model
    ///
    /// An IndexMap<String, String> of {short name: long name}
    pub compartments: Option<IndexMap<String, String>>,
    /// A version identifier for the Model, stored as a string
    pub version: Option<String>,
}

/// Kinds of boundary reaction which can be added with [`Model::add_boundary`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BoundaryType {
    /// Reversible exchange with the environment, prefixed `EX_`
    Exchange,
    /// Irreversible removal of a metabolite, prefixed `DM_`
    Demand,
    /// Reversible supply or removal of an internal metabolite, prefixed `SK_`
    Sink,
}

impl BoundaryType {
    fn prefix(&self) -> &'static str {
        match self {
            BoundaryType::Exchange => "EX_",
            BoundaryType::Demand => "DM_",
            BoundaryType::Sink => "SK_",
        }
    }
}

impl Display for BoundaryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryType::Exchange => write!(f, "exchange"),
            BoundaryType::Demand => write!(f, "demand"),
            BoundaryType::Sink => write!(f, "sink"),
        }
    }
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            reactions: IndexMap::new(),
            metabolites: IndexMap::new(),
            objective: IndexMap::new(),
            id: None,
            name: None,
            compartments: None,
            version: None,
        }
    }

    /// Name used when reporting on this model, falls back to the id and then to "Model"
    pub fn display_name(&self) -> &str {
        match (&self.name, &self.id) {
            (Some(name), _) if !name.is_empty() => name.as_str(),
            (_, Some(id)) if !id.is_empty() => id.as_str(),
            _ => "Model",
        }
    }

    // region Adding Components
    /// Add a metabolite to the model
    ///
    /// # Errors
    /// [`ModelError::DuplicateMetabolite`] if a metabolite with the same id is already present
    pub fn add_metabolite(&mut self, metabolite: Metabolite) -> Result<(), ModelError> {
        if self.metabolites.contains_key(&metabolite.id) {
            return Err(ModelError::DuplicateMetabolite(metabolite.id));
        }
        self.metabolites.insert(metabolite.id.clone(), metabolite);
        Ok(())
    }

    /// Add a metabolite unless one with the same id already exists
    ///
    /// Returns true if the metabolite was added
    pub fn ensure_metabolite(&mut self, metabolite: Metabolite) -> bool {
        if self.metabolites.contains_key(&metabolite.id) {
            return false;
        }
        debug!("Adding metabolite {}", metabolite.id);
        self.metabolites.insert(metabolite.id.clone(), metabolite);
        true
    }

    /// Add a reaction to the model
    ///
    /// # Parameters
    /// - reaction: Reaction to add
    ///
    /// # Errors
    /// - [`ModelError::DuplicateReaction`] if the id is already used
    /// - [`ModelError::InvalidBounds`] if lower_bound > upper_bound
    /// - [`ModelError::UnknownMetabolite`] if the stoichiometry references a metabolite
    ///   which is not in the model
    ///
    /// # Examples
    /// ```rust
    /// use sanitycheck_core::metabolic_model::model::Model;
    /// use sanitycheck_core::metabolic_model::reaction::ReactionBuilder;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction".to_string()).build().unwrap();
    /// model.add_reaction(new_reaction).unwrap();
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) -> Result<(), ModelError> {
        if self.reactions.contains_key(&reaction.id) {
            return Err(ModelError::DuplicateReaction(reaction.id));
        }
        if reaction.lower_bound > reaction.upper_bound {
            return Err(ModelError::InvalidBounds {
                reaction: reaction.id,
                lower_bound: reaction.lower_bound,
                upper_bound: reaction.upper_bound,
            });
        }
        if let Some(missing) = reaction
            .metabolites
            .keys()
            .find(|met_id| !self.metabolites.contains_key(*met_id))
        {
            return Err(ModelError::UnknownMetabolite {
                reaction: reaction.id.clone(),
                metabolite: missing.clone(),
            });
        }
        self.reactions.insert(reaction.id.clone(), reaction);
        Ok(())
    }

    /// Add a boundary reaction for an existing metabolite
    ///
    /// The new reaction consumes one unit of the metabolite and is named
    /// `{prefix}{metabolite id}` (e.g. `DM_atp[c]`). If a reaction with that id already
    /// exists it is left as is.
    ///
    /// Returns the id of the boundary reaction
    pub fn add_boundary(
        &mut self,
        metabolite_id: &str,
        boundary_type: BoundaryType,
    ) -> Result<String, ModelError> {
        let metabolite = self
            .metabolites
            .get(metabolite_id)
            .ok_or_else(|| ModelError::MetaboliteNotFound(metabolite_id.to_string()))?;
        let reaction_id = format!("{}{}", boundary_type.prefix(), metabolite_id);
        if self.reactions.contains_key(&reaction_id) {
            debug!("Boundary reaction {} already present", reaction_id);
            return Ok(reaction_id);
        }
        let config = configuration::current();
        let (lower_bound, upper_bound) = match boundary_type {
            BoundaryType::Exchange | BoundaryType::Sink => (config.lower_bound, config.upper_bound),
            BoundaryType::Demand => (0., config.upper_bound),
        };
        let name = format!(
            "{} {}",
            metabolite.name.as_deref().unwrap_or(metabolite_id),
            boundary_type
        );
        let mut stoichiometry = IndexMap::new();
        stoichiometry.insert(metabolite_id.to_string(), -1.);
        let reaction = ReactionBuilder::default()
            .id(reaction_id.clone())
            .name(Some(name))
            .metabolites(stoichiometry)
            .lower_bound(lower_bound)
            .upper_bound(upper_bound)
            .build()?;
        self.add_reaction(reaction)?;
        Ok(reaction_id)
    }
    // endregion Adding Components

    // region Access and Update
    /// Get a reaction by id
    pub fn reaction(&self, reaction_id: &str) -> Result<&Reaction, ModelError> {
        self.reactions
            .get(reaction_id)
            .ok_or_else(|| ModelError::ReactionNotFound(reaction_id.to_string()))
    }

    /// Update both bounds of a reaction
    pub fn set_bounds(
        &mut self,
        reaction_id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ModelError> {
        if lower_bound > upper_bound {
            return Err(ModelError::InvalidBounds {
                reaction: reaction_id.to_string(),
                lower_bound,
                upper_bound,
            });
        }
        let reaction = self
            .reactions
            .get_mut(reaction_id)
            .ok_or_else(|| ModelError::ReactionNotFound(reaction_id.to_string()))?;
        reaction.set_bounds(lower_bound, upper_bound);
        Ok(())
    }

    /// Make a single reaction the (maximized, unit coefficient) objective
    pub fn set_objective(&mut self, reaction_id: &str) -> Result<(), ModelError> {
        if !self.reactions.contains_key(reaction_id) {
            return Err(ModelError::ReactionNotFound(reaction_id.to_string()));
        }
        self.objective.clear();
        self.objective.insert(reaction_id.to_string(), 1.);
        Ok(())
    }
    // endregion Access and Update

    // region Renaming
    /// Rename every metabolite, rewriting the stoichiometry of all reactions to match
    ///
    /// If two metabolites end up with the same id, the first one is kept and the
    /// coefficients referring to either are merged.
    pub fn rename_metabolites<F>(&mut self, mut rename: F)
    where
        F: FnMut(&Metabolite) -> String,
    {
        let mut mapping: IndexMap<String, String> = IndexMap::new();
        let old_metabolites = std::mem::take(&mut self.metabolites);
        for (old_id, mut metabolite) in old_metabolites {
            let new_id = rename(&metabolite);
            if self.metabolites.contains_key(&new_id) {
                warn!(
                    "Metabolite {} is renamed to the existing id {}, merging into the first",
                    old_id, new_id
                );
            } else {
                metabolite.id = new_id.clone();
                self.metabolites.insert(new_id.clone(), metabolite);
            }
            mapping.insert(old_id, new_id);
        }
        if mapping.iter().all(|(old, new)| old == new) {
            return;
        }
        for reaction in self.reactions.values_mut() {
            let old_stoichiometry = std::mem::take(&mut reaction.metabolites);
            for (met_id, coefficient) in old_stoichiometry {
                let new_id = mapping.get(&met_id).cloned().unwrap_or(met_id);
                let merged = match reaction.metabolites.get_mut(&new_id) {
                    Some(existing) => {
                        *existing += coefficient;
                        *existing == 0.
                    }
                    None => {
                        reaction.metabolites.insert(new_id.clone(), coefficient);
                        false
                    }
                };
                if merged {
                    reaction.metabolites.shift_remove(&new_id);
                }
            }
        }
    }

    /// Rename every reaction, keeping the objective in sync
    ///
    /// If two reactions end up with the same id, the first one is kept.
    pub fn rename_reactions<F>(&mut self, mut rename: F)
    where
        F: FnMut(&Reaction) -> String,
    {
        let old_reactions = std::mem::take(&mut self.reactions);
        let mut mapping: IndexMap<String, String> = IndexMap::new();
        for (old_id, mut reaction) in old_reactions {
            let new_id = rename(&reaction);
            if self.reactions.contains_key(&new_id) {
                warn!(
                    "Reaction {} is renamed to the existing id {}, keeping the first",
                    old_id, new_id
                );
                continue;
            }
            reaction.id = new_id.clone();
            self.reactions.insert(new_id.clone(), reaction);
            mapping.insert(old_id, new_id);
        }
        let old_objective = std::mem::take(&mut self.objective);
        for (reaction_id, coefficient) in old_objective {
            if let Some(new_id) = mapping.get(&reaction_id) {
                self.objective.insert(new_id.clone(), coefficient);
            }
        }
    }
    // endregion Renaming

    // region Boundary Classification
    /// Guess which compartment is the extracellular space
    ///
    /// Recognised extracellular ids or names win, otherwise the compartment holding the
    /// most boundary metabolites is used.
    pub fn external_compartment(&self) -> Option<String> {
        let used: IndexSet<&str> = self
            .metabolites
            .values()
            .filter_map(|m| m.compartment.as_deref())
            .collect();
        if let Some(found) = used
            .iter()
            .find(|c| EXTERNAL_COMPARTMENTS.contains(&c.to_lowercase().as_str()))
        {
            return Some(found.to_string());
        }
        if let Some(compartments) = &self.compartments {
            if let Some((id, _)) = compartments
                .iter()
                .find(|(_, name)| EXTERNAL_COMPARTMENTS.contains(&name.to_lowercase().as_str()))
            {
                return Some(id.clone());
            }
        }
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for reaction in self.reactions.values().filter(|r| r.is_boundary()) {
            if let Some(compartment) = self
                .boundary_metabolite(reaction)
                .and_then(|m| m.compartment.as_deref())
            {
                *counts.entry(compartment).or_insert(0) += 1;
            }
        }
        counts
            .into_iter()
            .fold(None, |best: Option<(&str, usize)>, (c, n)| match best {
                Some((_, best_n)) if best_n >= n => best,
                _ => Some((c, n)),
            })
            .map(|(c, _)| c.to_string())
    }

    /// Boundary reactions whose metabolite is in the external compartment
    pub fn exchanges(&self) -> Vec<&Reaction> {
        let external = self.external_compartment();
        self.reactions
            .values()
            .filter(|r| r.is_boundary() && self.is_external(r, external.as_deref()))
            .collect()
    }

    /// Irreversible boundary reactions of internal metabolites
    pub fn demands(&self) -> Vec<&Reaction> {
        let external = self.external_compartment();
        self.reactions
            .values()
            .filter(|r| {
                r.is_boundary() && !self.is_external(r, external.as_deref()) && !r.is_reversible()
            })
            .collect()
    }

    /// Reversible boundary reactions of internal metabolites
    pub fn sinks(&self) -> Vec<&Reaction> {
        let external = self.external_compartment();
        self.reactions
            .values()
            .filter(|r| {
                r.is_boundary() && !self.is_external(r, external.as_deref()) && r.is_reversible()
            })
            .collect()
    }

    fn boundary_metabolite(&self, reaction: &Reaction) -> Option<&Metabolite> {
        if !reaction.is_boundary() {
            return None;
        }
        reaction
            .metabolites
            .keys()
            .next()
            .and_then(|id| self.metabolites.get(id))
    }

    fn is_external(&self, reaction: &Reaction, external: Option<&str>) -> bool {
        match (external, self.boundary_metabolite(reaction)) {
            (Some(external), Some(metabolite)) => {
                metabolite.compartment.as_deref() == Some(external)
            }
            _ => false,
        }
    }
    // endregion Boundary Classification

}

#[derive(Clone, Debug, Error)]
pub enum ModelError {
    #[error("Reaction {0} is already in the model")]
    DuplicateReaction(String),
    #[error("Metabolite {0} is already in the model")]
    DuplicateMetabolite(String),
    #[error("Reaction {reaction} references metabolite {metabolite} which is not in the model")]
    UnknownMetabolite { reaction: String, metabolite: String },
    #[error("Reaction {0} is not in the model")]
    ReactionNotFound(String),
    #[error("Metabolite {0} is not in the model")]
    MetaboliteNotFound(String),
    #[error("Reaction {reaction} has lower bound {lower_bound} > upper bound {upper_bound}")]
    InvalidBounds {
        reaction: String,
        lower_bound: f64,
        upper_bound: f64,
    },
    #[error("Unable to build reaction: {0}")]
    UnableToBuildReaction(String),
}

impl From<crate::metabolic_model::reaction::ReactionBuilderError> for ModelError {
    fn from(err: crate::metabolic_model::reaction::ReactionBuilderError) -> Self {
        ModelError::UnableToBuildReaction(err.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small network with an exchange, a transport, a demand and a sink
    pub(crate) fn setup_model() -> Model {
        let mut model = Model::new_empty();
        model.ensure_metabolite(Metabolite::new("glc_D[e]", "D-Glucose", "e"));
        model.ensure_metabolite(Metabolite::new("glc_D[c]", "D-Glucose", "c"));
        model.ensure_metabolite(Metabolite::new("pyr[c]", "Pyruvate", "c"));
        model.add_boundary("glc_D[e]", BoundaryType::Exchange).unwrap();
        let mut stoichiometry = IndexMap::new();
        stoichiometry.insert("glc_D[e]".to_string(), -1.);
        stoichiometry.insert("glc_D[c]".to_string(), 1.);
        model
            .add_reaction(
                ReactionBuilder::default()
                    .id("GLCt".to_string())
                    .metabolites(stoichiometry)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        model.add_boundary("pyr[c]", BoundaryType::Demand).unwrap();
        model.add_boundary("glc_D[c]", BoundaryType::Sink).unwrap();
        model
    }

    #[test]
    fn add_reaction_checks() {
        let mut model = setup_model();
        // Duplicate
        let dup = ReactionBuilder::default().id("GLCt".to_string()).build().unwrap();
        assert!(matches!(
            model.add_reaction(dup),
            Err(ModelError::DuplicateReaction(_))
        ));
        // Bad bounds
        let bad = ReactionBuilder::default()
            .id("BAD".to_string())
            .lower_bound(10.)
            .upper_bound(-10.)
            .build()
            .unwrap();
        assert!(matches!(
            model.add_reaction(bad),
            Err(ModelError::InvalidBounds { .. })
        ));
        // Unknown metabolite
        let mut stoichiometry = IndexMap::new();
        stoichiometry.insert("nothing[c]".to_string(), -1.);
        let unknown = ReactionBuilder::default()
            .id("UNKNOWN".to_string())
            .metabolites(stoichiometry)
            .build()
            .unwrap();
        assert!(matches!(
            model.add_reaction(unknown),
            Err(ModelError::UnknownMetabolite { .. })
        ));
    }

    #[test]
    fn add_boundary_defaults() {
        let model = setup_model();
        let exchange = model.reaction("EX_glc_D[e]").unwrap();
        assert!((exchange.lower_bound + 1000.).abs() < 1e-25);
        assert!((exchange.upper_bound - 1000.).abs() < 1e-25);
        assert!((exchange.metabolites["glc_D[e]"] + 1.).abs() < 1e-25);
        let demand = model.reaction("DM_pyr[c]").unwrap();
        assert!(demand.lower_bound.abs() < 1e-25);
        assert_eq!(demand.name.clone().unwrap(), "Pyruvate demand");
        assert!(model.reaction("SK_glc_D[c]").is_ok());
    }

    #[test]
    fn add_boundary_existing_is_kept() {
        let mut model = setup_model();
        model.set_bounds("DM_pyr[c]", 0., 5.).unwrap();
        let id = model.add_boundary("pyr[c]", BoundaryType::Demand).unwrap();
        assert_eq!(id, "DM_pyr[c]");
        assert!((model.reaction("DM_pyr[c]").unwrap().upper_bound - 5.).abs() < 1e-25);
        assert!(matches!(
            model.add_boundary("missing[c]", BoundaryType::Demand),
            Err(ModelError::MetaboliteNotFound(_))
        ));
    }

    #[test]
    fn boundary_classification() {
        let model = setup_model();
        assert_eq!(model.external_compartment().unwrap(), "e");
        let exchanges: Vec<&str> = model.exchanges().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(exchanges, vec!["EX_glc_D[e]"]);
        let demands: Vec<&str> = model.demands().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(demands, vec!["DM_pyr[c]"]);
        let sinks: Vec<&str> = model.sinks().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(sinks, vec!["SK_glc_D[c]"]);
    }

    #[test]
    fn external_compartment_by_boundary_count() {
        let mut model = Model::new_empty();
        model.ensure_metabolite(Metabolite::new("a[x]", "A", "x"));
        model.ensure_metabolite(Metabolite::new("b[x]", "B", "x"));
        model.ensure_metabolite(Metabolite::new("a[y]", "A", "y"));
        model.add_boundary("a[x]", BoundaryType::Exchange).unwrap();
        model.add_boundary("b[x]", BoundaryType::Exchange).unwrap();
        model.add_boundary("a[y]", BoundaryType::Exchange).unwrap();
        assert_eq!(model.external_compartment().unwrap(), "x");
    }

    #[test]
    fn set_bounds_and_objective() {
        let mut model = setup_model();
        model.set_bounds("GLCt", -1., -1.).unwrap();
        assert!((model.reaction("GLCt").unwrap().upper_bound + 1.).abs() < 1e-25);
        assert!(model.set_bounds("GLCt", 1., -1.).is_err());
        assert!(model.set_bounds("NOPE", 0., 1.).is_err());
        model.set_objective("DM_pyr[c]").unwrap();
        assert_eq!(model.objective.len(), 1);
        assert!((model.objective["DM_pyr[c]"] - 1.).abs() < 1e-25);
        assert!(model.set_objective("NOPE").is_err());
    }

    #[test]
    fn rename_metabolites_updates_stoichiometry() {
        let mut model = setup_model();
        model.rename_metabolites(|m| m.id.replace("glc_D", "glucose"));
        assert!(model.metabolites.contains_key("glucose[e]"));
        assert!(!model.metabolites.contains_key("glc_D[e]"));
        let transport = model.reaction("GLCt").unwrap();
        assert!((transport.metabolites["glucose[e]"] + 1.).abs() < 1e-25);
        assert!((transport.metabolites["glucose[c]"] - 1.).abs() < 1e-25);
    }

    #[test]
    fn rename_metabolites_merges_collisions() {
        let mut model = setup_model();
        // Collapsing both glucose metabolites cancels the transport stoichiometry
        model.rename_metabolites(|m| m.id.replace("[e]", "[c]"));
        assert_eq!(model.metabolites.len(), 2);
        assert!(model.reaction("GLCt").unwrap().metabolites.is_empty());
    }

    #[test]
    fn rename_reactions_updates_objective() {
        let mut model = setup_model();
        model.set_objective("DM_pyr[c]").unwrap();
        model.rename_reactions(|r| r.id.to_lowercase());
        assert!(model.reactions.contains_key("dm_pyr[c]"));
        assert!(model.objective.contains_key("dm_pyr[c]"));
    }

    #[test]
    fn display_name_fallbacks() {
        let mut model = Model::new_empty();
        assert_eq!(model.display_name(), "Model");
        model.id = Some("e_coli_core".to_string());
        assert_eq!(model.display_name(), "e_coli_core");
        model.name = Some("E. coli core".to_string());
        assert_eq!(model.display_name(), "E. coli core");
    }
}
