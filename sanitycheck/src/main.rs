use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, ValueEnum};
use log::info;

use sanitycheck_core::checks::atp_yield::results::ResultsTable;
use sanitycheck_core::checks::atp_yield::AtpYield;
use sanitycheck_core::configuration::{Organism, SolverKind};
use sanitycheck_core::io::load_model;
use sanitycheck_core::optimize::solvers::new_solver;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SolverChoice {
    /// Clarabel interior point solver
    Clarabel,
    /// microlp simplex solver (needs the microlp feature)
    Microlp,
}

impl From<SolverChoice> for SolverKind {
    fn from(choice: SolverChoice) -> Self {
        match choice {
            SolverChoice::Clarabel => SolverKind::Clarabel,
            SolverChoice::Microlp => SolverKind::Microlp,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sanitycheck")]
#[command(about = "Compare the ATP yield of a metabolic model with theoretical yields")]
#[command(long_about = None)]
#[command(group(ArgGroup::new("organism").required(true).args(["human", "non_human"])))]
struct Cli {
    /// Model file (.json, .yml, .yaml or .mat)
    #[arg(short, long, value_parser = existing_file)]
    model: PathBuf,

    /// Linear program solver
    #[arg(short, long, value_enum)]
    solver: SolverChoice,

    /// The model describes a human, ATP synthase is ATPS4mi
    #[arg(short = 'H', long)]
    human: bool,

    /// The model describes a non human organism, ATP synthase is ATPS4m
    #[arg(short = 'N', long)]
    non_human: bool,

    /// Fluxes with a smaller absolute value are reported as 0
    #[arg(long, default_value_t = 1e-6)]
    tolerance: f64,
}

impl Cli {
    fn organism(&self) -> Organism {
        if self.human {
            Organism::Human
        } else {
            Organism::NonHuman
        }
    }
}

fn existing_file(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("{} does not exist", value))
    }
}

fn run(cli: &Cli) -> anyhow::Result<ResultsTable> {
    let solver = new_solver(cli.solver.into())?;
    let model = load_model(&cli.model)
        .with_context(|| format!("Failed to load model {}", cli.model.display()))?;
    let mut check = AtpYield::new(&model, cli.organism(), solver, cli.tolerance)
        .context("Failed to prepare the ATP yield check")?;
    check.run_panel().context("ATP yield experiment failed")?;
    Ok(check.into_results())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    info!("Checking {}", cli.model.display());
    let results = run(&cli)?;
    println!("{}", results);
    Ok(())
}
