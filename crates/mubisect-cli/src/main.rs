use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mubisect_model::{ParameterizedProblem, ProblemDocument};
use mubisect_solver::{
    flux_ranges_by_id, Bisection, BisectionStatus, PrecisionProfile, SolverAdapter,
};

#[derive(Parser)]
#[command(name = "mubisect")]
#[command(about = "Growth-rate bisection over growth-coupled LP models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a problem file for errors and print its dimensions
    Check {
        /// JSON problem file
        file: PathBuf,
    },
    /// Maximize the growth rate by bisection
    Solve {
        /// JSON problem file
        file: PathBuf,
        /// Lower end of the search interval
        #[arg(long, default_value_t = 0.0)]
        mu_min: f64,
        /// Upper end of the search interval
        #[arg(long, default_value_t = 2.0)]
        mu_max: f64,
        /// Interval width at which the search stops
        #[arg(long, default_value_t = 1e-6)]
        tolerance: f64,
        /// Iteration budget
        #[arg(long, default_value_t = 100)]
        max_iter: usize,
        /// Solver precision: double, quad, dq, or dqq
        #[arg(long, default_value = "quad")]
        precision: PrecisionProfile,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
        /// Print the iteration table
        #[arg(short, long)]
        verbose: bool,
    },
    /// Flux variability analysis at a fixed growth rate
    Fva {
        /// JSON problem file
        file: PathBuf,
        /// Comma-separated reaction ids to vary
        #[arg(long, value_delimiter = ',')]
        targets: Vec<String>,
        /// Growth rate; when omitted, the bisection optimum is used and
        /// its basis warm-starts the batch
        #[arg(long)]
        mu: Option<f64>,
        /// Solver precision for the bisection step
        #[arg(long, default_value = "quad")]
        precision: PrecisionProfile,
        /// Print the ranges as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_problem(file: &PathBuf) -> (ProblemDocument, ParameterizedProblem) {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    };
    let doc: ProblemDocument = match serde_json::from_str(&source) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error parsing {}: {}", file.display(), e);
            std::process::exit(1);
        }
    };
    let problem = match doc.to_problem() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error in {}: {}", file.display(), e);
            std::process::exit(1);
        }
    };
    (doc, problem)
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file } => {
            let (doc, problem) = load_problem(&file);
            if let Err(e) = problem.validate() {
                eprintln!("✗ {} has errors:", file.display());
                eprintln!("  {}", e);
                std::process::exit(1);
            }
            let symbolic = problem
                .entries
                .values()
                .filter(|c| !c.is_constant())
                .count();
            let growth_bounds = problem
                .lower
                .iter()
                .chain(problem.upper.iter())
                .filter(|c| !c.is_constant())
                .count();
            println!("✓ {} is valid", file.display());
            if !doc.name.is_empty() {
                println!("  name: {}", doc.name);
            }
            println!("  {} metabolites", problem.num_rows());
            println!("  {} reactions", problem.num_columns());
            println!("  {} coefficients ({} growth-dependent)", problem.entries.len(), symbolic);
            println!("  {} growth-dependent bounds", growth_bounds);
        }
        Commands::Solve {
            file,
            mu_min,
            mu_max,
            tolerance,
            max_iter,
            precision,
            json,
            verbose,
        } => {
            let (doc, problem) = load_problem(&file);
            let name = if doc.name.is_empty() { "me_lp".to_string() } else { doc.name };
            let adapter = SolverAdapter::new(name);
            let bisection = Bisection::new()
                .with_interval(mu_min, mu_max)
                .with_tolerance(tolerance)
                .with_max_iter(max_iter)
                .with_profile(precision);

            let outcome = match bisection.maximize_growth(&adapter, &problem) {
                Ok(o) => o,
                Err(e) => {
                    eprintln!("Solve error: {}", e);
                    std::process::exit(1);
                }
            };

            if json {
                match serde_json::to_string_pretty(&outcome) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Error encoding outcome: {}", e);
                        std::process::exit(1);
                    }
                }
                return;
            }

            if verbose {
                println!("Iteration\t Solution to check\tStatus");
                println!("---------\t------------------\t------");
                for step in &outcome.steps {
                    println!(
                        "{:>9}\t{:.16}\t{}",
                        step.iteration,
                        step.mu,
                        if step.feasible { "Feasible" } else { "Not feasible" }
                    );
                }
                println!();
            }

            match outcome.status {
                BisectionStatus::Converged => println!("Status: CONVERGED"),
                BisectionStatus::MaxIterExceeded => {
                    println!("Status: MAX ITERATIONS (best feasible reported)")
                }
            }
            println!("Growth rate: {:.10}", outcome.mu);
            match outcome.solution {
                Some(solution) => {
                    println!();
                    println!("Fluxes:");
                    for (j, id) in problem.columns.iter().enumerate() {
                        let flux = solution.x[j];
                        if flux.abs() > 1e-9 {
                            println!("  {:20} {:14.6}", id, flux);
                        }
                    }
                }
                None => {
                    println!("No feasible growth rate found in [{}, {}].", mu_min, mu_max);
                    std::process::exit(1);
                }
            }
        }
        Commands::Fva {
            file,
            targets,
            mu,
            precision,
            json,
        } => {
            let (doc, problem) = load_problem(&file);
            if targets.is_empty() {
                eprintln!("No targets given; pass --targets r1,r2,...");
                std::process::exit(1);
            }
            let name = if doc.name.is_empty() { "varyme".to_string() } else { doc.name };
            let adapter = SolverAdapter::new(name);

            let (mu_fixed, basis) = match mu {
                Some(mu) => (mu, None),
                None => {
                    let outcome = match Bisection::new()
                        .with_profile(precision)
                        .maximize_growth(&adapter, &problem)
                    {
                        Ok(o) => o,
                        Err(e) => {
                            eprintln!("Solve error: {}", e);
                            std::process::exit(1);
                        }
                    };
                    println!("Growth rate: {:.10}", outcome.mu);
                    (outcome.mu, outcome.basis)
                }
            };

            let ranges = match flux_ranges_by_id(
                &adapter,
                &problem,
                mu_fixed,
                &targets,
                basis.as_ref(),
            ) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Variability error: {}", e);
                    std::process::exit(1);
                }
            };

            if json {
                match serde_json::to_string_pretty(&ranges) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Error encoding ranges: {}", e);
                        std::process::exit(1);
                    }
                }
                return;
            }

            println!();
            println!("{:20} {:>14} {:>14}", "Reaction", "Minimum", "Maximum");
            for range in &ranges {
                let fmt = |side: Option<f64>, inform: i32| match side {
                    Some(v) => format!("{:14.6}", v),
                    None => format!("{:>14}", format!("inform {}", inform)),
                };
                println!(
                    "{:20} {} {}",
                    range.id,
                    fmt(range.minimum, range.minimum_inform),
                    fmt(range.maximum, range.maximum_inform)
                );
            }
        }
    }
}
