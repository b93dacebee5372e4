use std::collections::BTreeMap;

use thiserror::Error;

use crate::problem::ParameterizedProblem;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("growth rate {mu} is not finite")]
    NonFiniteGrowthRate { mu: f64 },
    #[error("coefficient at ({row}, {col}) evaluates to {value} at mu = {mu}")]
    NonFiniteCoefficient {
        row: usize,
        col: usize,
        value: f64,
        mu: f64,
    },
    #[error("lower bound of column {col} evaluates to {value} at mu = {mu}")]
    NonFiniteLowerBound { col: usize, value: f64, mu: f64 },
    #[error("upper bound of column {col} evaluates to {value} at mu = {mu}")]
    NonFiniteUpperBound { col: usize, value: f64, mu: f64 },
}

/// A problem with every growth-dependent coefficient reduced to a number.
///
/// Right-hand sides, senses, and the objective are growth-independent and
/// stay on the [`ParameterizedProblem`].
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedLp {
    pub nrows: usize,
    pub ncols: usize,
    pub entries: BTreeMap<(usize, usize), f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Evaluate every matrix entry and bound at a concrete growth rate.
///
/// Pure: the problem is untouched and the output is freshly allocated, so
/// the same problem can be evaluated at many growth rates in any order.
/// Any entry or bound that lands on NaN or infinity fails the whole
/// parameterization; a bisection treats that as an infeasible probe.
pub fn evaluate(
    problem: &ParameterizedProblem,
    mu: f64,
) -> Result<EvaluatedLp, EvaluationError> {
    if !mu.is_finite() {
        return Err(EvaluationError::NonFiniteGrowthRate { mu });
    }

    let mut entries = BTreeMap::new();
    for (&(row, col), coeff) in &problem.entries {
        let value = coeff.value_at(mu);
        if !value.is_finite() {
            return Err(EvaluationError::NonFiniteCoefficient {
                row,
                col,
                value,
                mu,
            });
        }
        entries.insert((row, col), value);
    }

    let mut lower = Vec::with_capacity(problem.lower.len());
    for (col, coeff) in problem.lower.iter().enumerate() {
        let value = coeff.value_at(mu);
        if !value.is_finite() {
            return Err(EvaluationError::NonFiniteLowerBound { col, value, mu });
        }
        lower.push(value);
    }

    let mut upper = Vec::with_capacity(problem.upper.len());
    for (col, coeff) in problem.upper.iter().enumerate() {
        let value = coeff.value_at(mu);
        if !value.is_finite() {
            return Err(EvaluationError::NonFiniteUpperBound { col, value, mu });
        }
        upper.push(value);
    }

    Ok(EvaluatedLp {
        nrows: problem.num_rows(),
        ncols: problem.num_columns(),
        entries,
        lower,
        upper,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficient::Coefficient;

    fn growth_problem() -> ParameterizedProblem {
        let mut problem = ParameterizedProblem::new(
            vec!["a".into()],
            vec!["r1".into(), "r2".into()],
        );
        problem.set_coefficient(0, 0, 1.0);
        problem.set_coefficient(0, 1, Coefficient::parse("-mu/4").unwrap());
        problem.set_bounds(0, 0.0, Coefficient::parse("10 - 5*mu").unwrap());
        problem.set_bounds(1, Coefficient::parse("2.5*mu").unwrap(), 1000.0);
        problem
    }

    #[test]
    fn test_evaluate_substitutes_mu() {
        let lp = evaluate(&growth_problem(), 1.0).unwrap();
        assert!((lp.entries[&(0, 1)] + 0.25).abs() < 1e-12);
        assert!((lp.upper[0] - 5.0).abs() < 1e-12);
        assert!((lp.lower[1] - 2.5).abs() < 1e-12);
        assert_eq!(lp.nrows, 1);
        assert_eq!(lp.ncols, 2);
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let problem = growth_problem();
        let a = evaluate(&problem, 0.731).unwrap();
        let b = evaluate(&problem, 0.731).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_evaluate_compiled_matches_symbolic() {
        let problem = growth_problem();
        let compiled = problem.clone().compiled();
        let a = evaluate(&problem, 1.25).unwrap();
        let b = evaluate(&compiled, 1.25).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_evaluate_rejects_nonfinite_mu() {
        let problem = growth_problem();
        assert!(matches!(
            evaluate(&problem, f64::NAN),
            Err(EvaluationError::NonFiniteGrowthRate { .. })
        ));
        assert!(matches!(
            evaluate(&problem, f64::INFINITY),
            Err(EvaluationError::NonFiniteGrowthRate { .. })
        ));
    }

    #[test]
    fn test_evaluate_rejects_nonfinite_coefficient() {
        let mut problem = growth_problem();
        problem.set_coefficient(0, 0, Coefficient::parse("1/(2*mu - 1)").unwrap());
        let err = evaluate(&problem, 0.5).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::NonFiniteCoefficient { row: 0, col: 0, .. }
        ));
        assert!(evaluate(&problem, 1.0).is_ok());
    }

    #[test]
    fn test_evaluate_rejects_nonfinite_bound() {
        let mut problem = growth_problem();
        problem.set_bounds(1, 0.0, Coefficient::parse("1/(2*mu - 1)").unwrap());
        let err = evaluate(&problem, 0.5).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::NonFiniteUpperBound { col: 1, .. }
        ));
    }
}
