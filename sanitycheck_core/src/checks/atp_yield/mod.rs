//! ATP yield sanity check
//!
//! A genome scale model should not produce more ATP from a carbon source than the
//! biochemistry allows. The check closes every boundary reaction of the model, opens a
//! single carbon source at a fixed uptake of 1, with and without oxygen, and maximizes
//! a cytosolic ATP demand. The optimal demand flux and the flux through the ATP synthase
//! are then compared to the theoretical yield of that carbon source.
//!
//! # Examples
//! ```rust,no_run
//! use sanitycheck_core::checks::atp_yield::AtpYield;
//! use sanitycheck_core::configuration::{Organism, SolverKind};
//! use sanitycheck_core::io::load_model;
//! use sanitycheck_core::optimize::solvers::new_solver;
//!
//! let model = load_model("model.json").unwrap();
//! let solver = new_solver(SolverKind::Clarabel).unwrap();
//! let mut check = AtpYield::new(&model, Organism::NonHuman, solver, 1e-6).unwrap();
//! check.run_panel().unwrap();
//! println!("{}", check.results());
//! ```
pub mod boundary;
pub mod carbon_source;
pub mod harmonize;
pub mod results;
pub mod substrates;

use log::{info, warn};
use thiserror::Error;

use crate::checks::atp_yield::boundary::close_exchanges;
use crate::checks::atp_yield::carbon_source::{configure_carbon_source, Experiment};
use crate::checks::atp_yield::harmonize::harmonize;
use crate::checks::atp_yield::results::{ResultCell, ResultColumn, ResultsTable};
use crate::configuration::{self, Organism};
use crate::metabolic_model::model::{Model, ModelError};
use crate::optimize::solvers::{new_solver, Solver, SolverError};

/// Cytosolic ATP, consumed by the objective
pub const ATP_METABOLITE: &str = "atp[c]";
/// Demand reaction for [`ATP_METABOLITE`], the objective of every experiment
pub const ATP_DEMAND: &str = "DM_atp[c]";
/// Flux bound treated as unbounded
pub const FLUX_LIMIT: f64 = 1000.;
/// Fixed exchange flux of the carbon source
pub const SUBSTRATE_UPTAKE: f64 = -1.;

/// Runs ATP yield experiments against a closed copy of a model
#[derive(Debug)]
pub struct AtpYield {
    baseline: Model,
    organism: Organism,
    solver: Box<dyn Solver>,
    tolerance: f64,
    results: ResultsTable,
}

impl AtpYield {
    /// Prepare the closed baseline of `model`
    ///
    /// The model is copied, harmonized to bracket compartment tags and closed, see
    /// [`boundary::close_exchanges`]. Fluxes with an absolute value below `tolerance`
    /// are reported as 0.
    ///
    /// # Errors
    /// [`AtpYieldError::MissingReaction`] if the model has no ATP synthase reaction for
    /// the organism
    pub fn new(
        model: &Model,
        organism: Organism,
        solver: Box<dyn Solver>,
        tolerance: f64,
    ) -> Result<Self, AtpYieldError> {
        let mut harmonized = model.clone();
        harmonize(&mut harmonized);
        let synthase = organism.atp_synthase();
        if !harmonized.reactions.contains_key(synthase) {
            return Err(AtpYieldError::MissingReaction(synthase.to_string()));
        }
        let baseline = close_exchanges(&harmonized)?;
        info!(
            "Prepared ATP yield check of {} using the {} solver",
            baseline.display_name(),
            solver.name()
        );
        let results = ResultsTable::new(baseline.display_name(), synthase);
        Ok(AtpYield {
            baseline,
            organism,
            solver,
            tolerance,
            results,
        })
    }

    /// Prepare the check with the solver and tolerance of the global
    /// [`configuration`](crate::configuration)
    pub fn from_configuration(model: &Model, organism: Organism) -> Result<Self, AtpYieldError> {
        let config = configuration::current();
        let solver = new_solver(config.solver)?;
        AtpYield::new(model, organism, solver, config.tolerance)
    }

    /// The closed model every experiment starts from
    pub fn baseline(&self) -> &Model {
        &self.baseline
    }

    pub fn organism(&self) -> Organism {
        self.organism
    }

    pub fn results(&self) -> &ResultsTable {
        &self.results
    }

    pub fn into_results(self) -> ResultsTable {
        self.results
    }

    /// Run a single experiment, append its column to the results and return it
    ///
    /// An infeasible or otherwise unsolved model is recorded as
    /// [`ResultCell::NotANumber`] rather than an error.
    ///
    /// # Errors
    /// - [`AtpYieldError::UnknownSubstrate`] if the substrate exchange is missing from the
    ///   model and the substrate is not part of the panel
    /// - [`AtpYieldError::Solver`] if the solver could not be set up for the problem
    /// - [`AtpYieldError::DuplicateColumn`] if the experiment was already run
    pub fn run_experiment(
        &mut self,
        experiment: &Experiment,
    ) -> Result<ResultColumn, AtpYieldError> {
        let label = experiment.column_label();
        info!("Running experiment {}", label);
        let configured = configure_carbon_source(&self.baseline, experiment)?;
        let mut solution = configured.optimize(self.solver.as_ref())?;
        solution.clean(self.tolerance);

        let synthase = self.organism.atp_synthase();
        let (atp_yield, synthase_flux) = match solution.objective_value {
            Some(value) if solution.is_optimal() && value.is_finite() => (
                ResultCell::Value(value),
                solution
                    .flux(synthase)
                    .map_or(ResultCell::Missing, ResultCell::Value),
            ),
            _ => {
                warn!(
                    "Experiment {} could not be solved ({:?})",
                    label, solution.status
                );
                (ResultCell::NotANumber, ResultCell::NotANumber)
            }
        };
        let column = ResultColumn {
            label,
            atp_yield,
            synthase_flux,
            theoretical: experiment.theoretical_yield().into(),
        };
        info!(
            "Experiment {} finished with an ATP yield of {}",
            column.label, column.atp_yield
        );
        self.results.push_column(column.clone())?;
        Ok(column)
    }

    /// Run every experiment of [`Experiment::panel`], in order
    pub fn run_panel(&mut self) -> Result<&ResultsTable, AtpYieldError> {
        for experiment in Experiment::panel() {
            self.run_experiment(&experiment)?;
        }
        Ok(&self.results)
    }
}

#[derive(Error, Debug)]
pub enum AtpYieldError {
    #[error("Substrate exchange {0} is not in the substrate table")]
    UnknownSubstrate(String),
    #[error("Reaction {0} is not in the model")]
    MissingReaction(String),
    #[error("A results column named {0} already exists")]
    DuplicateColumn(String),
    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),
    #[error("Unable to optimize model: {0}")]
    Solver(#[from] SolverError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::load_model;
    use crate::metabolic_model::metabolite::Metabolite;
    use crate::optimize::solvers::clarabel::ClarabelSolver;
    use std::path::PathBuf;

    fn toy_model(file_name: &str) -> Model {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("test_models")
            .join(file_name);
        load_model(path).unwrap()
    }

    fn check(file_name: &str) -> AtpYield {
        AtpYield::new(
            &toy_model(file_name),
            Organism::NonHuman,
            Box::new(ClarabelSolver::default()),
            1e-6,
        )
        .unwrap()
    }

    fn assert_close(cell: ResultCell, expected: f64) {
        let value = cell.value().unwrap();
        assert!((value - expected).abs() < 1e-4, "{value} != {expected}");
    }

    #[test]
    fn baseline_is_closed() {
        let check = check("toy_atp.json");
        let baseline = check.baseline();
        assert!((baseline.objective[ATP_DEMAND] - 1.).abs() < 1e-25);
        for exchange in ["EX_glc_D[e]", "EX_o2[e]", "EX_pyr[e]"] {
            assert!(baseline.reaction(exchange).unwrap().lower_bound.abs() < 1e-25);
        }
    }

    #[test]
    fn glucose_aerobic() {
        let mut check = check("toy_atp.json");
        let column = check
            .run_experiment(&Experiment::new("EX_glc_D[e]", true))
            .unwrap();
        assert_eq!(column.label, "glc - aerobic");
        assert_close(column.atp_yield, 30.);
        assert_close(column.synthase_flux, 28.);
        assert_eq!(column.theoretical, ResultCell::Value(31.));
    }

    #[test]
    fn glucose_anaerobic() {
        let mut check = check("toy_atp.json");
        let column = check
            .run_experiment(&Experiment::new("EX_glc_D[e]", false))
            .unwrap();
        assert_eq!(column.label, "glc - anaerobic");
        assert_close(column.atp_yield, 2.);
        assert_eq!(column.synthase_flux, ResultCell::Value(0.));
        assert_eq!(column.theoretical, ResultCell::Value(2.));
    }

    #[test]
    fn repeated_experiment_is_rejected() {
        let mut check = check("toy_atp.json");
        let experiment = Experiment::new("EX_glc_D[e]", true);
        check.run_experiment(&experiment).unwrap();
        assert!(matches!(
            check.run_experiment(&experiment),
            Err(AtpYieldError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn full_panel() {
        let mut check = check("toy_atp.json");
        let baseline = check.baseline().clone();
        let table = check.run_panel().unwrap();
        assert_eq!(table.len(), 30);
        let expected: Vec<String> = Experiment::panel()
            .iter()
            .map(Experiment::column_label)
            .collect();
        let labels: Vec<String> = table.columns().map(|c| c.label.clone()).collect();
        assert_eq!(labels, expected);
        // No fructose in the toy model, its empty exchange leaves the model feasible
        let fructose = table.column("fru - aerobic").unwrap();
        assert_eq!(fructose.atp_yield, ResultCell::Value(0.));
        assert_eq!(fructose.theoretical, ResultCell::Value(31.));
        assert_close(table.column("glc - aerobic").unwrap().atp_yield, 30.);
        assert_eq!(check.baseline(), &baseline);
    }

    #[test]
    fn absent_and_dead_end_substrates_differ() {
        let experiment = Experiment::new("EX_fru[e]", true);
        let mut absent = check("toy_atp.json");
        let column = absent.run_experiment(&experiment).unwrap();
        assert_eq!(column.atp_yield, ResultCell::Value(0.));

        // Forced uptake into a metabolite nothing else uses has no solution
        let mut model = toy_model("toy_atp.json");
        model.ensure_metabolite(Metabolite::new("fru[e]", "D-Fructose", "e"));
        let mut dead_end = AtpYield::new(
            &model,
            Organism::NonHuman,
            Box::new(ClarabelSolver::default()),
            1e-6,
        )
        .unwrap();
        let column = dead_end.run_experiment(&experiment).unwrap();
        assert_eq!(column.atp_yield, ResultCell::NotANumber);
        assert_eq!(column.synthase_flux, ResultCell::NotANumber);
    }

    #[test]
    fn yaml_model_gives_the_same_yield() {
        let mut check = check("toy_atp.yml");
        assert!(check.baseline().reactions.contains_key("ATPS4m"));
        assert!(check.baseline().metabolites.contains_key("h[i]"));
        let column = check
            .run_experiment(&Experiment::new("EX_glc_D[e]", true))
            .unwrap();
        assert_close(column.atp_yield, 30.);
        assert_close(column.synthase_flux, 28.);
    }

    #[test]
    fn default_configuration_uses_clarabel() {
        let check =
            AtpYield::from_configuration(&toy_model("toy_atp.json"), Organism::NonHuman).unwrap();
        assert_eq!(check.solver.name(), "clarabel");
        assert!((check.tolerance - 1e-6).abs() < 1e-25);
        assert_eq!(check.organism(), Organism::NonHuman);
    }

    #[test]
    fn missing_synthase_is_fatal() {
        let result = AtpYield::new(
            &toy_model("toy_atp.json"),
            Organism::Human,
            Box::new(ClarabelSolver::default()),
            1e-6,
        );
        assert!(matches!(result, Err(AtpYieldError::MissingReaction(id)) if id == "ATPS4mi"));
    }
}
