//! Flux Balance Analysis on a [`Model`]
//!
//! FBA: [https://pubmed.ncbi.nlm.nih.gov/20212490/](https://pubmed.ncbi.nlm.nih.gov/20212490/)
use indexmap::IndexMap;
use log::debug;

use crate::metabolic_model::model::Model;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::OptimizationStatus;

/// Result of optimizing a model
#[derive(Clone, Debug, PartialEq)]
pub struct FluxSolution {
    pub status: OptimizationStatus,
    /// Objective value, `None` unless the solver found an (almost) optimal point
    pub objective_value: Option<f64>,
    /// Flux through every reaction, keyed by reaction id, empty when not solved
    pub fluxes: IndexMap<String, f64>,
}

impl FluxSolution {
    /// Set every flux (and the objective value) with an absolute value below
    /// `tolerance` to exactly 0
    pub fn clean(&mut self, tolerance: f64) {
        for flux in self.fluxes.values_mut() {
            if flux.abs() < tolerance {
                *flux = 0.;
            }
        }
        if let Some(value) = self.objective_value.as_mut() {
            if value.abs() < tolerance {
                *value = 0.;
            }
        }
    }

    /// Flux through a reaction, `None` if the model was not solved or has no such reaction
    pub fn flux(&self, reaction_id: &str) -> Option<f64> {
        self.fluxes.get(reaction_id).copied()
    }

    pub fn is_optimal(&self) -> bool {
        self.status.has_solution()
    }
}

impl Model {
    /// Formulate the FBA linear program
    ///
    /// One variable per reaction (bounded by the reaction bounds), one steady state
    /// equality per metabolite taking part in a reaction, and the model objective
    /// maximized.
    pub fn build_problem(&self) -> Result<Problem, ProblemError> {
        let mut problem = Problem::new_maximization();
        for reaction in self.reactions.values() {
            problem.add_new_variable(
                &reaction.id,
                reaction.name.as_deref(),
                reaction.lower_bound,
                reaction.upper_bound,
            )?;
        }
        // Build a constraint (stoichiometry) table metabolites x reactions
        let mut stoichiometry: IndexMap<&str, (Vec<&str>, Vec<f64>)> = IndexMap::new();
        for (reaction_id, reaction) in self.reactions.iter() {
            for (met_id, coefficient) in reaction.metabolites.iter() {
                let (variables, coefficients) = stoichiometry
                    .entry(met_id.as_str())
                    .or_insert_with(|| (Vec::new(), Vec::new()));
                variables.push(reaction_id.as_str());
                coefficients.push(*coefficient);
            }
        }
        for (met_id, (variables, coefficients)) in stoichiometry.iter() {
            problem.add_new_equality_constraint(met_id, variables, coefficients, 0.)?;
        }
        for (reaction_id, coefficient) in self.objective.iter() {
            problem.add_new_linear_objective_term(reaction_id, *coefficient)?;
        }
        Ok(problem)
    }

    /// Optimize the model according to Flux Balance Analysis
    ///
    /// A solver which fails to reach optimality is not an error, the returned solution
    /// carries the status and no fluxes.
    pub fn optimize(&self, solver: &dyn Solver) -> Result<FluxSolution, SolverError> {
        let problem = self.build_problem()?;
        debug!(
            "Optimizing {} with {} ({} reactions, {} metabolites)",
            self.display_name(),
            solver.name(),
            self.reactions.len(),
            self.metabolites.len()
        );
        let solution = solver.solve(&problem)?;
        Ok(FluxSolution {
            status: solution.status,
            objective_value: solution.objective_value,
            fluxes: solution.variable_values.unwrap_or_default(),
        })
    }
}
