use log::debug;

use mubisect_model::{evaluate, ParameterizedProblem};

use crate::adapter::{SolveError, SolverAdapter};
use crate::assemble::assemble;
use crate::backend::{self, INFORM_OPTIMAL};
use crate::basis::Basis;

/// Attainable range of one flux at a fixed growth rate. A side whose
/// sub-solve did not come back optimal is `None`; the raw inform codes
/// of both sub-solves are kept for diagnostics.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FluxRange {
    pub id: String,
    pub column: usize,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub minimum_inform: i32,
    pub maximum_inform: i32,
}

/// Min and max of each target flux over the feasibility region at a
/// fixed growth rate, via one batched extended-precision call.
///
/// The problem is parameterized and assembled once with a nonzero
/// objective marker in every target column; the backend rewrites the
/// objective row per sub-solve and chains the basis through the batch,
/// maximizing first (even sub-solves) then minimizing (odd). Output
/// order matches `targets`. A warm-start basis, e.g. the feasible basis
/// a bisection found at the same growth rate, speeds the batch up
/// without changing the ranges.
pub fn flux_ranges(
    adapter: &SolverAdapter,
    problem: &ParameterizedProblem,
    mu: f64,
    targets: &[usize],
    warm_basis: Option<&Basis>,
) -> Result<Vec<FluxRange>, SolveError> {
    problem.validate()?;
    let lp = evaluate(problem, mu)?;

    // Any nonzero in a target column marks the objective-row slot the
    // batch will rewrite
    let mut marker = vec![0.0; problem.num_columns()];
    for &col in targets {
        marker[col] = 1.0;
    }
    let arrays = assemble(&lp, &problem.rhs, &problem.senses, &marker);

    let mut obj_inds = Vec::with_capacity(2 * targets.len());
    let mut obj_coeffs = Vec::with_capacity(2 * targets.len());
    for &col in targets {
        obj_inds.push(col + 1);
        obj_coeffs.push(1.0);
        obj_inds.push(col + 1);
        obj_coeffs.push(-1.0);
    }

    let warm = warm_basis.is_some();
    let mut hs = match warm_basis {
        Some(basis) => basis.clone(),
        None => Basis::cold(arrays.num_vars()),
    };
    debug!(
        "{}: variability at mu = {mu} over {} targets ({} sub-solves)",
        adapter.name(),
        targets.len(),
        obj_inds.len()
    );
    let vary = backend::qvary_lp(
        "varyme",
        &arrays,
        &mut hs,
        warm,
        &obj_inds,
        &obj_coeffs,
        &adapter.quad_options().pack(),
    );

    let ranges = targets
        .iter()
        .enumerate()
        .map(|(i, &col)| {
            let max_inform = vary.informs[2 * i];
            let min_inform = vary.informs[2 * i + 1];
            FluxRange {
                id: problem.columns[col].clone(),
                column: col,
                maximum: (max_inform == INFORM_OPTIMAL).then(|| vary.obj_vals[2 * i]),
                minimum: (min_inform == INFORM_OPTIMAL).then(|| vary.obj_vals[2 * i + 1]),
                maximum_inform: max_inform,
                minimum_inform: min_inform,
            }
        })
        .collect();
    Ok(ranges)
}

/// [`flux_ranges`] with targets named by column id.
pub fn flux_ranges_by_id<S: AsRef<str>>(
    adapter: &SolverAdapter,
    problem: &ParameterizedProblem,
    mu: f64,
    targets: &[S],
    warm_basis: Option<&Basis>,
) -> Result<Vec<FluxRange>, SolveError> {
    let columns = targets
        .iter()
        .map(|id| {
            problem
                .column_index(id.as_ref())
                .ok_or_else(|| SolveError::UnknownColumn(id.as_ref().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    flux_ranges(adapter, problem, mu, &columns, warm_basis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::PrecisionProfile;
    use crate::bisect::Bisection;
    use mubisect_model::Coefficient;

    /// a -> b with a growth-limited intake and a minimum drain:
    /// r1 in [0, 10 - 5*mu], r2 conversion, r3 drain in [5, 1000].
    fn toy_problem() -> ParameterizedProblem {
        let mut problem = ParameterizedProblem::new(
            vec!["a".into(), "b".into()],
            vec!["r1".into(), "r2".into(), "r3".into()],
        );
        problem.set_coefficient(0, 0, 1.0);
        problem.set_coefficient(0, 1, -1.0);
        problem.set_coefficient(1, 1, 1.0);
        problem.set_coefficient(1, 2, -1.0);
        problem.set_bounds(0, 0.0, Coefficient::parse("10 - 5*mu").unwrap());
        problem.set_bounds(1, 0.0, 1000.0);
        problem.set_bounds(2, 5.0, 1000.0);
        problem.set_objective(vec![0.0, 0.0, 1.0]);
        problem
    }

    #[test]
    fn test_ranges_match_hand_computation() {
        let adapter = SolverAdapter::new("toy");
        // At mu = 0.5 the intake cap is 7.5; the whole chain is forced
        // through [5, 7.5]
        let ranges =
            flux_ranges(&adapter, &toy_problem(), 0.5, &[0, 1, 2], None).unwrap();
        assert_eq!(ranges.len(), 3);
        for (range, id) in ranges.iter().zip(["r1", "r2", "r3"]) {
            assert_eq!(range.id, id);
            assert!((range.minimum.unwrap() - 5.0).abs() < 1e-9, "{id}");
            assert!((range.maximum.unwrap() - 7.5).abs() < 1e-9, "{id}");
            assert_eq!(range.minimum_inform, 0);
            assert_eq!(range.maximum_inform, 0);
        }
    }

    #[test]
    fn test_min_never_exceeds_max() {
        let adapter = SolverAdapter::new("toy");
        let problem = toy_problem();
        for mu in [0.0, 0.25, 0.75, 1.0] {
            for range in flux_ranges(&adapter, &problem, mu, &[0, 2], None).unwrap() {
                let (min, max) = (range.minimum.unwrap(), range.maximum.unwrap());
                assert!(min <= max + 1e-12, "mu = {mu}: {min} > {max}");
            }
        }
    }

    #[test]
    fn test_infeasible_growth_rate_yields_sentinels() {
        let adapter = SolverAdapter::new("toy");
        // Intake cap 10 - 5*1.5 = 2.5 < 5, nothing is attainable
        let ranges = flux_ranges(&adapter, &toy_problem(), 1.5, &[0, 2], None).unwrap();
        assert_eq!(ranges.len(), 2);
        for range in &ranges {
            assert_eq!(range.minimum, None);
            assert_eq!(range.maximum, None);
            assert_ne!(range.minimum_inform, 0);
            assert_ne!(range.maximum_inform, 0);
        }
    }

    #[test]
    fn test_warm_start_from_bisection_basis_changes_nothing() {
        let adapter = SolverAdapter::new("toy");
        let problem = toy_problem();
        let outcome = Bisection::new()
            .with_profile(PrecisionProfile::Quad)
            .maximize_growth(&adapter, &problem)
            .unwrap();
        let basis = outcome.basis.unwrap();

        let cold = flux_ranges(&adapter, &problem, outcome.mu, &[0, 1, 2], None).unwrap();
        let warm =
            flux_ranges(&adapter, &problem, outcome.mu, &[0, 1, 2], Some(&basis)).unwrap();
        for (a, b) in cold.iter().zip(&warm) {
            assert!((a.minimum.unwrap() - b.minimum.unwrap()).abs() < 1e-9);
            assert!((a.maximum.unwrap() - b.maximum.unwrap()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_targets_by_id() {
        let adapter = SolverAdapter::new("toy");
        let problem = toy_problem();
        let ranges =
            flux_ranges_by_id(&adapter, &problem, 0.5, &["r3", "r1"], None).unwrap();
        assert_eq!(ranges[0].id, "r3");
        assert_eq!(ranges[1].id, "r1");
        assert_eq!(ranges[0].column, 2);

        let err = flux_ranges_by_id(&adapter, &problem, 0.5, &["nope"], None).unwrap_err();
        assert!(matches!(err, SolveError::UnknownColumn(id) if id == "nope"));
    }
}
