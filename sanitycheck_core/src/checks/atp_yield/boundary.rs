//! Identification and closure of boundary reactions
//!
//! Boundary reactions are recognised by several overlapping heuristics, any one of
//! which selects a reaction:
//! - an `EX_`, `DM_`, `SINK_` or `SK_` id prefix (case insensitive)
//! - `bioma` anywhere in the id (case insensitive)
//! - stoichiometric coefficients summing to exactly 1
//! - the model's own exchange, demand and sink classification
use indexmap::IndexSet;
use log::{debug, info, warn};

use crate::checks::atp_yield::{ATP_DEMAND, ATP_METABOLITE, FLUX_LIMIT};
use crate::metabolic_model::metabolite::Metabolite;
use crate::metabolic_model::model::{BoundaryType, Model, ModelError};
use crate::metabolic_model::reaction::Reaction;

const BOUNDARY_PREFIXES: [&str; 4] = ["EX_", "DM_", "SINK_", "SK_"];

pub fn has_boundary_prefix(reaction_id: &str) -> bool {
    let upper = reaction_id.to_uppercase();
    BOUNDARY_PREFIXES
        .iter()
        .any(|prefix| upper.starts_with(prefix))
}

pub fn is_biomass(reaction_id: &str) -> bool {
    reaction_id.to_lowercase().contains("bioma")
}

pub fn has_unit_coefficient_sum(reaction: &Reaction) -> bool {
    reaction.coefficient_sum() == 1.
}

/// Reactions selected for closure
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundarySelection {
    /// Every selected reaction, their lower bound is forced to 0
    pub selected: IndexSet<String>,
    /// Selected because the coefficients sum to 1, their upper bound is opened
    pub unit_sum: IndexSet<String>,
}

impl BoundarySelection {
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, reaction_id: &str) -> bool {
        self.selected.contains(reaction_id)
    }
}

/// Apply every boundary heuristic to the model
pub fn boundary_candidates(model: &Model) -> BoundarySelection {
    let mut selection = BoundarySelection::default();
    for reaction in model.reactions.values() {
        let unit_sum = has_unit_coefficient_sum(reaction);
        if unit_sum {
            selection.unit_sum.insert(reaction.id.clone());
        }
        if unit_sum || has_boundary_prefix(&reaction.id) || is_biomass(&reaction.id) {
            selection.selected.insert(reaction.id.clone());
        }
    }
    for reaction in model
        .exchanges()
        .into_iter()
        .chain(model.demands())
        .chain(model.sinks())
    {
        selection.selected.insert(reaction.id.clone());
    }
    selection
}

/// Build the closed baseline model
///
/// Every boundary candidate gets a lower bound of 0, candidates whose coefficients sum to
/// 1 also get their upper bound raised to at least [`FLUX_LIMIT`]. A cytosolic ATP
/// metabolite and its demand reaction are then added, and the demand becomes the
/// objective. The input model is left untouched.
pub fn close_exchanges(model: &Model) -> Result<Model, ModelError> {
    let mut closed = model.clone();
    let selection = boundary_candidates(&closed);
    for reaction_id in &selection.selected {
        let mut upper_bound = closed.reaction(reaction_id)?.upper_bound;
        if selection.unit_sum.contains(reaction_id) {
            upper_bound = upper_bound.max(FLUX_LIMIT);
        } else if upper_bound < 0. {
            warn!(
                "Raising upper bound of {} from {} to 0 while closing it",
                reaction_id, upper_bound
            );
            upper_bound = 0.;
        }
        debug!("Closing {} to [0, {}]", reaction_id, upper_bound);
        closed.set_bounds(reaction_id, 0., upper_bound)?;
    }

    closed.ensure_metabolite(Metabolite::new(ATP_METABOLITE, "Cytosolic ATP", "c"));
    let demand = closed.add_boundary(ATP_METABOLITE, BoundaryType::Demand)?;
    closed.set_objective(&demand)?;
    debug_assert_eq!(demand, ATP_DEMAND);
    info!(
        "Closed {} boundary reactions of {}, objective is {}",
        selection.len(),
        closed.display_name(),
        demand
    );
    Ok(closed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::model::tests::setup_model;
    use crate::metabolic_model::reaction::ReactionBuilder;
    use indexmap::IndexMap;

    fn add_reaction(model: &mut Model, id: &str, stoichiometry: &[(&str, f64)], lb: f64, ub: f64) {
        let metabolites: IndexMap<String, f64> = stoichiometry
            .iter()
            .map(|(met, coef)| (met.to_string(), *coef))
            .collect();
        model
            .add_reaction(
                ReactionBuilder::default()
                    .id(id.to_string())
                    .metabolites(metabolites)
                    .lower_bound(lb)
                    .upper_bound(ub)
                    .build()
                    .unwrap(),
            )
            .unwrap();
    }

    /// setup_model plus a biomass reaction, a unit sum reaction, and oddly named boundaries
    fn boundary_model() -> Model {
        let mut model = setup_model();
        add_reaction(
            &mut model,
            "Biomass_core",
            &[("glc_D[c]", -1.), ("pyr[c]", -1.)],
            0.,
            1000.,
        );
        add_reaction(&mut model, "PYRSYN", &[("pyr[c]", 1.)], -20., 20.);
        add_reaction(&mut model, "sink_glc_D[c]", &[("glc_D[c]", -1.)], -5., -1.);
        add_reaction(&mut model, "uptake", &[("glc_D[e]", -1.)], -10., 10.);
        model
    }

    #[test]
    fn prefix_and_biomass_predicates() {
        assert!(has_boundary_prefix("EX_glc_D[e]"));
        assert!(has_boundary_prefix("ex_glc_D[e]"));
        assert!(has_boundary_prefix("DM_atp[c]"));
        assert!(has_boundary_prefix("SINK_pyr[c]"));
        assert!(has_boundary_prefix("sk_pyr[c]"));
        assert!(!has_boundary_prefix("GLCt"));
        assert!(!has_boundary_prefix("TEX_x"));
        assert!(is_biomass("BIOMASS_Ec_core"));
        assert!(is_biomass("r_biomass"));
        assert!(!is_biomass("PFK"));
    }

    #[test]
    fn unit_coefficient_sum_predicate() {
        let model = boundary_model();
        assert!(has_unit_coefficient_sum(model.reaction("PYRSYN").unwrap()));
        assert!(!has_unit_coefficient_sum(model.reaction("GLCt").unwrap()));
        assert!(!has_unit_coefficient_sum(model.reaction("EX_glc_D[e]").unwrap()));
    }

    #[test]
    fn candidates_union_every_rule() {
        let model = boundary_model();
        let selection = boundary_candidates(&model);
        for id in [
            "EX_glc_D[e]",
            "DM_pyr[c]",
            "SK_glc_D[c]",
            "Biomass_core",
            "PYRSYN",
            "sink_glc_D[c]",
            // Found only through the exchange classification
            "uptake",
        ] {
            assert!(selection.contains(id), "{id} should be selected");
        }
        assert!(!selection.contains("GLCt"));
        assert_eq!(selection.unit_sum.len(), 1);
        assert!(selection.unit_sum.contains("PYRSYN"));
    }

    #[test]
    fn closure_bounds() {
        let model = boundary_model();
        let closed = close_exchanges(&model).unwrap();
        let selection = boundary_candidates(&model);
        for id in &selection.selected {
            let before = model.reaction(id).unwrap();
            let after = closed.reaction(id).unwrap();
            assert!(after.lower_bound.abs() < 1e-25, "{id} lower bound");
            if selection.unit_sum.contains(id) {
                assert!(after.upper_bound >= before.upper_bound);
                assert!(after.upper_bound >= 1000.);
            } else if before.upper_bound >= 0. {
                assert!((after.upper_bound - before.upper_bound).abs() < 1e-25);
            }
        }
        // Negative upper bound is raised so the bounds stay ordered
        assert!(closed.reaction("sink_glc_D[c]").unwrap().upper_bound.abs() < 1e-25);
        // Internal reactions keep their bounds
        assert_eq!(closed.reaction("GLCt").unwrap(), model.reaction("GLCt").unwrap());
        // The input is not modified
        assert!((model.reaction("EX_glc_D[e]").unwrap().lower_bound + 1000.).abs() < 1e-25);
    }

    #[test]
    fn closure_adds_atp_demand_objective() {
        let closed = close_exchanges(&setup_model()).unwrap();
        let atp = &closed.metabolites[ATP_METABOLITE];
        assert_eq!(atp.compartment.as_deref(), Some("c"));
        let demand = closed.reaction(ATP_DEMAND).unwrap();
        assert!((demand.metabolites[ATP_METABOLITE] + 1.).abs() < 1e-25);
        assert!(demand.lower_bound.abs() < 1e-25);
        assert_eq!(closed.objective.len(), 1);
        assert!((closed.objective[ATP_DEMAND] - 1.).abs() < 1e-25);
    }

    #[test]
    fn existing_atp_is_reused() {
        let mut model = setup_model();
        model.ensure_metabolite(Metabolite::new(ATP_METABOLITE, "ATP", "c"));
        let closed = close_exchanges(&model).unwrap();
        assert_eq!(closed.metabolites[ATP_METABOLITE].name.as_deref(), Some("ATP"));
        assert_eq!(closed.metabolites.len(), model.metabolites.len());
    }

    #[test]
    fn nothing_to_close() {
        let mut model = Model::new_empty();
        model.ensure_metabolite(Metabolite::new("a[c]", "A", "c"));
        model.ensure_metabolite(Metabolite::new("b[c]", "B", "c"));
        add_reaction(&mut model, "AB", &[("a[c]", -1.), ("b[c]", 1.)], -10., 10.);
        assert!(boundary_candidates(&model).is_empty());
        let closed = close_exchanges(&model).unwrap();
        assert_eq!(closed.reaction("AB").unwrap(), model.reaction("AB").unwrap());
        assert_eq!(closed.reactions.len(), 2);
    }
}
