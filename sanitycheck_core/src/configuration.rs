//! Process wide defaults for reaction bounds, numerical tolerance and solver choice
use std::fmt::{Display, Formatter};
use std::sync::{LazyLock, RwLock};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    /// Default lower flux bound, also treated as "unbounded" uptake
    pub lower_bound: f64,
    /// Default upper flux bound, also treated as "unbounded" secretion
    pub upper_bound: f64,
    /// Any flux with an absolute value below this is reported as 0
    pub tolerance: f64,
    pub solver: SolverKind,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-06,
            solver: SolverKind::Clarabel,
        }
    }
}

/// Take a copy of the current global configuration
///
/// A poisoned lock still holds valid data (the configuration is plain values), so it is
/// read through rather than propagated.
pub fn current() -> Configuration {
    match CONFIGURATION.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Default lower bound used by the reaction builder
pub(crate) fn default_lower_bound() -> f64 {
    current().lower_bound
}

/// Default upper bound used by the reaction builder
pub(crate) fn default_upper_bound() -> f64 {
    current().upper_bound
}

/// Enum used to specify which linear program solver to use
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolverKind {
    /// Use the Clarabel interior point solver
    Clarabel,
    /// Use the microlp simplex solver, requires the microlp feature to be enabled
    Microlp,
}

impl Display for SolverKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverKind::Clarabel => write!(f, "clarabel"),
            SolverKind::Microlp => write!(f, "microlp"),
        }
    }
}

/// Which kind of organism a model describes
///
/// This decides which ATP synthase reaction is read when reporting results.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Organism {
    Human,
    NonHuman,
}

impl Organism {
    /// Id of the mitochondrial ATP synthase reaction for this organism
    pub fn atp_synthase(&self) -> &'static str {
        match self {
            Organism::Human => "ATPS4mi",
            Organism::NonHuman => "ATPS4m",
        }
    }
}
