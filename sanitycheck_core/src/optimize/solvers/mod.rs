//! Linear program solver backends
use std::fmt::Debug;

use cfg_if::cfg_if;
use thiserror::Error;

use crate::configuration::SolverKind;
use crate::optimize::problem::{Problem, ProblemError};
use crate::optimize::ProblemSolution;

pub mod clarabel;

cfg_if! {
    if #[cfg(feature = "microlp")] {
        pub mod microlp;
    }
}

/// A backend able to solve a linear [`Problem`]
///
/// Implementations translate the problem into their own representation on every call, so
/// a single solver can be reused for many problems.
pub trait Solver: Debug {
    /// Short name of the backend, used in log messages
    fn name(&self) -> &'static str;

    /// Solve the problem
    ///
    /// Infeasible or unbounded problems are not errors, they are reported through the
    /// status of the returned [`ProblemSolution`]. Errors are reserved for problems the
    /// backend could not even be set up for.
    fn solve(&self, problem: &Problem) -> Result<ProblemSolution, SolverError>;
}

/// Create a solver of the requested kind
///
/// # Errors
/// [`SolverError::Unavailable`] if the backend was not compiled in
pub fn new_solver(kind: SolverKind) -> Result<Box<dyn Solver>, SolverError> {
    match kind {
        SolverKind::Clarabel => Ok(Box::new(clarabel::ClarabelSolver::default())),
        SolverKind::Microlp => microlp_solver(),
    }
}

cfg_if! {
    if #[cfg(feature = "microlp")] {
        fn microlp_solver() -> Result<Box<dyn Solver>, SolverError> {
            Ok(Box::new(microlp::MicrolpSolver::default()))
        }
    } else {
        fn microlp_solver() -> Result<Box<dyn Solver>, SolverError> {
            Err(SolverError::Unavailable(SolverKind::Microlp))
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum SolverError {
    #[error("The {0} solver is not available, enable the matching cargo feature")]
    Unavailable(SolverKind),
    #[error("Invalid optimization problem: {0}")]
    InvalidProblem(#[from] ProblemError),
    #[error("Solver backend failed: {0}")]
    Backend(String),
}
