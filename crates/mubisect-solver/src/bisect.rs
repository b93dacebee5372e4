use log::{debug, warn};

use mubisect_model::{evaluate, ParameterizedProblem};

use crate::adapter::{PrecisionProfile, SolveError, SolveResult, SolverAdapter};
use crate::assemble::assemble;
use crate::basis::Basis;

/// How a bisection ended.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BisectionStatus {
    /// The interval shrank below tolerance around a feasible growth rate
    /// (or no positive growth rate is feasible at all)
    Converged,
    /// The iteration budget ran out first; the reported growth rate is
    /// still the best feasible one found
    MaxIterExceeded,
}

/// One probe of the search: iteration 0 is the upper-bound test, the
/// rest are midpoints.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BisectionStep {
    pub iteration: usize,
    pub mu: f64,
    pub feasible: bool,
}

/// The bisection's answer: the growth rate, the solve at that rate when
/// one succeeded, and the full probe trace.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct BisectionOutcome {
    /// Best feasible growth rate found; a lower bound on the true
    /// supremum, within tolerance of it only when `Converged`
    pub mu: f64,
    pub status: BisectionStatus,
    /// Solve at `mu`, absent when no probe was ever feasible
    pub solution: Option<SolveResult>,
    /// Basis of the last feasible solve, for warm-starting follow-up
    /// work at this growth rate
    pub basis: Option<Basis>,
    pub steps: Vec<BisectionStep>,
}

/// Maximizes the growth rate by a sequence of feasibility solves over a
/// shrinking interval, warm-starting each from the last feasible basis.
#[derive(Debug, Clone, PartialEq)]
pub struct Bisection {
    mu_min: f64,
    mu_max: f64,
    max_iter: usize,
    tolerance: f64,
    profile: PrecisionProfile,
}

impl Default for Bisection {
    fn default() -> Self {
        Self {
            mu_min: 0.0,
            mu_max: 2.0,
            max_iter: 100,
            tolerance: 1e-6,
            profile: PrecisionProfile::Quad,
        }
    }
}

impl Bisection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(mut self, mu_min: f64, mu_max: f64) -> Self {
        self.mu_min = mu_min;
        self.mu_max = mu_max;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_profile(mut self, profile: PrecisionProfile) -> Self {
        self.profile = profile;
        self
    }

    /// One feasibility probe at a fixed growth rate.
    fn probe(
        &self,
        adapter: &SolverAdapter,
        problem: &ParameterizedProblem,
        mu: f64,
        basis: Option<&Basis>,
    ) -> Result<SolveResult, SolveError> {
        let lp = evaluate(problem, mu)?;
        let arrays = assemble(&lp, &problem.rhs, &problem.senses, &problem.objective);
        Ok(adapter.solve(&arrays, basis, self.profile))
    }

    /// Find the maximal feasible growth rate in the configured interval.
    ///
    /// The upper bound is tested first; when it is feasible the search
    /// short-circuits and reports it directly. A growth rate at which the
    /// problem fails to evaluate counts as an infeasible probe, except at
    /// the upper-bound test where no feasible basis exists yet.
    pub fn maximize_growth(
        &self,
        adapter: &SolverAdapter,
        problem: &ParameterizedProblem,
    ) -> Result<BisectionOutcome, SolveError> {
        problem.validate()?;

        let mut mu_min = self.mu_min;
        let mut mu_max = self.mu_max;
        let mut steps = Vec::new();

        let result = self.probe(adapter, problem, mu_max, None)?;
        let feasible = result.is_optimal();
        debug!(
            "{}: iteration 0, mu = {mu_max:.16}, inform {}",
            adapter.name(),
            result.inform
        );
        steps.push(BisectionStep {
            iteration: 0,
            mu: mu_max,
            feasible,
        });
        if feasible {
            return Ok(BisectionOutcome {
                mu: mu_max,
                status: BisectionStatus::Converged,
                basis: Some(result.basis.clone()),
                solution: Some(result),
                steps,
            });
        }

        let mut best: Option<(f64, SolveResult)> = None;
        let mut basis: Option<Basis> = None;
        let mut converged = false;

        for iteration in 1..=self.max_iter {
            let mu = (mu_min + mu_max) / 2.0;
            let (feasible, result) = match self.probe(adapter, problem, mu, basis.as_ref()) {
                Ok(result) => (result.is_optimal(), Some(result)),
                Err(err) => {
                    // Symbolic entries can be ill-defined off the
                    // physical range; shrink away from the bad point
                    warn!(
                        "{}: evaluation failed at mu = {mu:.16} ({err}), treating as infeasible",
                        adapter.name()
                    );
                    (false, None)
                }
            };
            debug!(
                "{}: iteration {iteration}, mu = {mu:.16}, {}",
                adapter.name(),
                if feasible { "feasible" } else { "not feasible" }
            );
            steps.push(BisectionStep {
                iteration,
                mu,
                feasible,
            });

            if feasible {
                // probe returned Ok here, result is always present
                if let Some(result) = result {
                    basis = Some(result.basis.clone());
                    best = Some((mu, result));
                }
                mu_min = mu;
            } else {
                mu_max = mu;
            }

            if (mu_max - mu_min).abs() <= self.tolerance && feasible {
                converged = true;
                break;
            }
            if mu_max <= self.tolerance {
                // No positive growth rate is feasible
                converged = true;
                break;
            }
        }

        // Falling out of the loop with neither test satisfied means the
        // iteration budget ran out, even a budget of zero
        let (mu, solution) = match best {
            Some((mu, result)) => (mu, Some(result)),
            None => (mu_min, None),
        };
        Ok(BisectionOutcome {
            mu,
            status: if converged {
                BisectionStatus::Converged
            } else {
                BisectionStatus::MaxIterExceeded
            },
            solution,
            basis,
            steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mubisect_model::Coefficient;

    /// Linear chain a -> b -> c with a growth-limited intake:
    /// r1 brings in a under `10 - 5*mu`, r4 must drain at least 5 units
    /// of c, so the system is feasible exactly for mu <= 1.
    fn chain_problem() -> ParameterizedProblem {
        let mut problem = ParameterizedProblem::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec!["r1".into(), "r2".into(), "r3".into(), "r4".into()],
        );
        problem.set_coefficient(0, 0, 1.0);
        problem.set_coefficient(0, 1, -1.0);
        problem.set_coefficient(1, 1, 1.0);
        problem.set_coefficient(1, 2, -1.0);
        problem.set_coefficient(2, 2, 1.0);
        problem.set_coefficient(2, 3, -1.0);
        problem.set_bounds(0, 0.0, Coefficient::parse("10 - 5*mu").unwrap());
        problem.set_bounds(1, 0.0, 1000.0);
        problem.set_bounds(2, 0.0, 1000.0);
        problem.set_bounds(3, 5.0, 1000.0);
        problem.set_objective(vec![0.0, 0.0, 0.0, 1.0]);
        problem
    }

    #[test]
    fn test_converges_to_analytic_root() {
        let adapter = SolverAdapter::new("chain");
        let outcome = Bisection::new()
            .maximize_growth(&adapter, &chain_problem())
            .unwrap();
        assert_eq!(outcome.status, BisectionStatus::Converged);
        // 10 - 5*mu >= 5 first fails past mu = 1
        assert!((outcome.mu - 1.0).abs() <= 1e-6, "mu = {}", outcome.mu);
        assert!(outcome.mu <= 1.0 + 1e-12, "must be a feasible lower bound");
        let solution = outcome.solution.unwrap();
        assert!(solution.is_optimal());
        assert!((solution.x[3] - 5.0).abs() < 1e-6);
        assert!(outcome.basis.is_some());
    }

    #[test]
    fn test_interval_shrinks_monotonically() {
        let adapter = SolverAdapter::new("chain");
        let outcome = Bisection::new()
            .maximize_growth(&adapter, &chain_problem())
            .unwrap();
        let mut lo = 0.0;
        let mut hi = 2.0;
        for step in &outcome.steps[1..] {
            assert!((step.mu - (lo + hi) / 2.0).abs() < 1e-15);
            let (prev_lo, prev_hi) = (lo, hi);
            if step.feasible {
                lo = step.mu;
            } else {
                hi = step.mu;
            }
            assert!(lo >= prev_lo && hi <= prev_hi);
        }
    }

    #[test]
    fn test_feasible_upper_bound_short_circuits() {
        let adapter = SolverAdapter::new("chain");
        let outcome = Bisection::new()
            .with_interval(0.0, 0.5)
            .maximize_growth(&adapter, &chain_problem())
            .unwrap();
        assert_eq!(outcome.status, BisectionStatus::Converged);
        assert_eq!(outcome.mu, 0.5);
        assert_eq!(outcome.steps.len(), 1);
        assert!(outcome.solution.is_some());
    }

    #[test]
    fn test_degenerate_zero_interval() {
        let adapter = SolverAdapter::new("chain");
        let outcome = Bisection::new()
            .with_interval(0.0, 0.0)
            .maximize_growth(&adapter, &chain_problem())
            .unwrap();
        assert_eq!(outcome.status, BisectionStatus::Converged);
        assert_eq!(outcome.mu, 0.0);
        assert_eq!(outcome.steps.len(), 1);
    }

    #[test]
    fn test_max_iter_reports_best_feasible() {
        let adapter = SolverAdapter::new("chain");
        let outcome = Bisection::new()
            .with_max_iter(3)
            .with_tolerance(1e-12)
            .maximize_growth(&adapter, &chain_problem())
            .unwrap();
        assert_eq!(outcome.status, BisectionStatus::MaxIterExceeded);
        assert!(outcome.mu <= 1.0 + 1e-12);
        assert!(outcome.solution.is_some());
        assert_eq!(outcome.steps.len(), 4);
    }

    #[test]
    fn test_zero_iteration_budget_is_not_convergence() {
        let adapter = SolverAdapter::new("chain");
        let outcome = Bisection::new()
            .with_max_iter(0)
            .maximize_growth(&adapter, &chain_problem())
            .unwrap();
        // The upper-bound test at mu = 2 fails and no midpoint is ever
        // probed; an interval of width 2 has not converged
        assert_eq!(outcome.status, BisectionStatus::MaxIterExceeded);
        assert_eq!(outcome.mu, 0.0);
        assert!(outcome.solution.is_none());
        assert!(outcome.basis.is_none());
        assert_eq!(outcome.steps.len(), 1);
        assert!(!outcome.steps[0].feasible);
    }

    #[test]
    fn test_midpoint_evaluation_failure_shrinks_interval() {
        // An extra unused reaction whose bound blows up at exactly mu = 1
        // and goes negative past it; the first midpoint of [0, 2] hits
        // the pole
        let mut problem = chain_problem();
        problem.columns.push("r5".into());
        problem.lower.push(Coefficient::Constant(0.0));
        problem
            .upper
            .push(Coefficient::parse("1 / (1 - mu)").unwrap());
        problem.objective.push(0.0);

        let adapter = SolverAdapter::new("pole");
        let outcome = Bisection::new()
            .maximize_growth(&adapter, &problem)
            .unwrap();
        assert_eq!(outcome.status, BisectionStatus::Converged);
        assert!(!outcome.steps[1].feasible, "pole at the first midpoint");
        assert!((outcome.steps[1].mu - 1.0).abs() < 1e-15);
        assert!(outcome.mu < 1.0 && (outcome.mu - 1.0).abs() <= 1e-6);
    }

    #[test]
    fn test_evaluation_failure_at_upper_bound_is_fatal() {
        let mut problem = chain_problem();
        problem.set_bounds(1, 0.0, Coefficient::parse("1 / (2 - mu)").unwrap());
        let adapter = SolverAdapter::new("pole");
        let err = Bisection::new()
            .maximize_growth(&adapter, &problem)
            .unwrap_err();
        assert!(matches!(err, SolveError::Evaluation(_)));
    }

    #[test]
    fn test_dimension_error_before_any_solve() {
        let mut problem = chain_problem();
        problem.objective.pop();
        let adapter = SolverAdapter::new("chain");
        let err = Bisection::new()
            .maximize_growth(&adapter, &problem)
            .unwrap_err();
        assert!(matches!(err, SolveError::Dimension(_)));
    }
}
