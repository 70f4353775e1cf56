//! Implements a solver interface for microlp, a pure rust simplex solver
use indexmap::IndexMap;
use log::debug;
use microlp::{ComparisonOp, LinearExpr, OptimizationDirection};

use crate::optimize::constraint::Constraint;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::solvers::{Solver, SolverError};
use crate::optimize::{OptimizationStatus, ProblemSolution};

#[derive(Clone, Debug, Default)]
pub struct MicrolpSolver {}

impl MicrolpSolver {
    fn expression(
        problem: &Problem,
        vars: &[microlp::Variable],
        constraint: &Constraint,
    ) -> Result<LinearExpr, SolverError> {
        let mut expr = LinearExpr::empty();
        for term in constraint.get_terms() {
            let col = problem.variable_index(&term.variable).ok_or_else(|| {
                SolverError::Backend(format!("Unknown variable {}", term.variable))
            })?;
            expr.add(vars[col], term.coefficient);
        }
        Ok(expr)
    }
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError> {
        let direction = match problem.objective().sense() {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut lp = microlp::Problem::new(direction);
        let vars: Vec<microlp::Variable> = problem
            .variables()
            .values()
            .map(|v| {
                lp.add_var(
                    problem.objective().coefficient_of(&v.id),
                    (v.lower_bound, v.upper_bound),
                )
            })
            .collect();
        for constraint in problem.constraints().values() {
            match constraint {
                Constraint::Equality { equals, .. } => {
                    let expr = Self::expression(problem, &vars, constraint)?;
                    lp.add_constraint(expr, ComparisonOp::Eq, *equals);
                }
                Constraint::Inequality {
                    lower_bound,
                    upper_bound,
                    ..
                } => {
                    if upper_bound.is_finite() {
                        let expr = Self::expression(problem, &vars, constraint)?;
                        lp.add_constraint(expr, ComparisonOp::Le, *upper_bound);
                    }
                    if lower_bound.is_finite() {
                        let expr = Self::expression(problem, &vars, constraint)?;
                        lp.add_constraint(expr, ComparisonOp::Ge, *lower_bound);
                    }
                }
            }
        }
        debug!(
            "Solving with microlp: {} variables, {} constraints",
            vars.len(),
            problem.constraints().len()
        );
        let solution = match lp.solve() {
            Ok(solution) => solution,
            Err(microlp::Error::Infeasible) => {
                return Ok(ProblemSolution::unsolved(OptimizationStatus::Infeasible))
            }
            Err(microlp::Error::Unbounded) => {
                return Ok(ProblemSolution::unsolved(OptimizationStatus::Unbounded))
            }
            #[allow(unreachable_patterns)]
            Err(err) => return Err(SolverError::Backend(err.to_string())),
        };
        let variable_values: IndexMap<String, f64> = problem
            .variables()
            .keys()
            .zip(&vars)
            .map(|(id, var)| (id.clone(), solution[*var]))
            .collect();
        Ok(ProblemSolution {
            status: OptimizationStatus::Optimal,
            objective_value: Some(solution.objective()),
            variable_values: Some(variable_values),
        })
    }
}
