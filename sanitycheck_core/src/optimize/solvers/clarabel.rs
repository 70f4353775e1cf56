//! Implements a solver interface for Clarabel
//!
//! Clarabel solves conic programs of the form
//!
//! minimize `1/2 x'Px + q'x` subject to `Ax + s = b`, `s ∈ K`
//!
//! A linear [`Problem`] maps onto this with `P = 0`, equality constraints (and fixed
//! variables) in the zero cone, and every finite inequality or variable bound as a row of
//! the nonnegative cone.
use clarabel::algebra::CscMatrix as ClarabelMatrix;
use clarabel::solver::{DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};
use indexmap::IndexMap;
use log::debug;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

#[derive(Clone, Debug, Default)]
pub struct ClarabelSolver {
    /// Print Clarabel's iteration log
    pub verbose: bool,
}

/// One row of the constraint matrix, as (column, coefficient) pairs plus the right hand side
type Row = (Vec<(usize, f64)>, f64);

/// Constraint rows split by the cone they belong to
#[derive(Default)]
struct ConicRows {
    zero: Vec<Row>,
    nonnegative: Vec<Row>,
}

impl ConicRows {
    fn from_problem(problem: &Problem) -> Result<Self, SolverError> {
        let mut rows = ConicRows::default();
        for constraint in problem.constraints().values() {
            let mut terms = Vec::with_capacity(constraint.get_terms().len());
            for term in constraint.get_terms() {
                let col = problem.variable_index(&term.variable).ok_or_else(|| {
                    SolverError::Backend(format!("Unknown variable {}", term.variable))
                })?;
                terms.push((col, term.coefficient));
            }
            match constraint {
                Constraint::Equality { equals, .. } => rows.zero.push((terms, *equals)),
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if lower_bound == upper_bound {
                        rows.zero.push((terms, *lower_bound));
                        continue;
                    }
                    if upper_bound.is_finite() {
                        rows.nonnegative.push((terms.clone(), *upper_bound));
                    }
                    if lower_bound.is_finite() {
                        let negated = terms.iter().map(|(c, v)| (*c, -v)).collect();
                        rows.nonnegative.push((negated, -lower_bound));
                    }
                }
            }
        }
        for variable in problem.variables().values() {
            let col = variable.index;
            if variable.is_fixed() {
                rows.zero.push((vec![(col, 1.)], variable.lower_bound));
                continue;
            }
            if variable.upper_bound.is_finite() {
                rows.nonnegative.push((vec![(col, 1.)], variable.upper_bound));
            }
            if variable.lower_bound.is_finite() {
                rows.nonnegative.push((vec![(col, -1.)], -variable.lower_bound));
            }
        }
        Ok(rows)
    }

    /// Assemble `A` and `b`, zero cone rows first
    fn assemble(&self, num_variables: usize) -> (ClarabelMatrix<f64>, Vec<f64>) {
        let num_rows = self.zero.len() + self.nonnegative.len();
        let mut coo = CooMatrix::new(num_rows, num_variables);
        let mut b = Vec::with_capacity(num_rows);
        for (row, (terms, rhs)) in self.zero.iter().chain(self.nonnegative.iter()).enumerate() {
            for (col, coefficient) in terms {
                coo.push(row, *col, *coefficient);
            }
            b.push(*rhs);
        }
        let (col_offsets, row_indices, values) = CscMatrix::from(&coo).disassemble();
        (
            ClarabelMatrix::new(num_rows, num_variables, col_offsets, row_indices, values),
            b,
        )
    }

    fn cones(&self) -> Vec<SupportedConeT<f64>> {
        let mut cones = Vec::with_capacity(2);
        if !self.zero.is_empty() {
            cones.push(SupportedConeT::ZeroConeT(self.zero.len()));
        }
        if !self.nonnegative.is_empty() {
            cones.push(SupportedConeT::NonnegativeConeT(self.nonnegative.len()));
        }
        cones
    }
}

impl From<SolverStatus> for OptimizationStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => OptimizationStatus::Optimal,
            SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                OptimizationStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                OptimizationStatus::Unbounded
            }
            SolverStatus::MaxIterations
            | SolverStatus::MaxTime
            | SolverStatus::InsufficientProgress => OptimizationStatus::SolverHalted,
            SolverStatus::Unsolved => OptimizationStatus::Unoptimized,
            _ => OptimizationStatus::NumericalError,
        }
    }
}

impl Solver for ClarabelSolver {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let num_variables = problem.variables().len();
        let rows = ConicRows::from_problem(problem)?;
        let (a, b) = rows.assemble(num_variables);
        let cones = rows.cones();

        // Clarabel always minimizes, so a maximization flips the sign of q
        let sign = match problem.objective().sense() {
            ObjectiveSense::Minimize => 1.,
            ObjectiveSense::Maximize => -1.,
        };
        let mut q = vec![0.; num_variables];
        for term in problem.objective().terms() {
            let col = problem.variable_index(&term.variable).ok_or_else(|| {
                SolverError::Backend(format!("Unknown objective variable {}", term.variable))
            })?;
            q[col] += sign * term.coefficient;
        }
        let p = ClarabelMatrix::new(
            num_variables,
            num_variables,
            vec![0; num_variables + 1],
            Vec::new(),
            Vec::new(),
        );

        let settings = DefaultSettings {
            verbose: self.verbose,
            ..DefaultSettings::default()
        };
        debug!(
            "Solving with clarabel: {} variables, {} equality rows, {} inequality rows",
            num_variables,
            rows.zero.len(),
            rows.nonnegative.len()
        );
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = OptimizationStatus::from(solver.solution.status);
        if !status.has_solution() {
            return Ok(ProblemSolution::unsolved(status));
        }
        let x = &solver.solution.x;
        let variable_values: IndexMap<String, f64> = problem
            .variables()
            .iter()
            .map(|(id, var)| (id.clone(), x[var.index]))
            .collect();
        let objective_value: f64 = problem
            .objective()
            .terms()
            .iter()
            .map(|t| t.coefficient * variable_values[&t.variable])
            .sum();
        Ok(ProblemSolution {
            status,
            objective_value: Some(objective_value),
            variable_values: Some(variable_values),
        })
    }
}
