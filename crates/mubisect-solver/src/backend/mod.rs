//! Bundled stand-in for the native optimizer, presenting its calling
//! convention: arrays from [`assemble`](crate::assemble), a basis-status
//! vector updated in place, a warm flag, and packed option rows.

mod simplex;

use log::debug;
use twofloat::TwoFloat;

use crate::assemble::LpArrays;
use crate::basis::Basis;
use crate::options::PackedOptions;

use simplex::solve_bounded;

pub const INFORM_OPTIMAL: i32 = 0;
pub const INFORM_INFEASIBLE: i32 = 1;
pub const INFORM_UNBOUNDED: i32 = 2;
pub const INFORM_ITERATION_LIMIT: i32 = 3;

/// What one backend call returns: primal values for every structural and
/// slack variable, duals per row, reduced costs, and the inform code.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSolution {
    pub x: Vec<f64>,
    pub pi: Vec<f64>,
    pub rc: Vec<f64>,
    pub inform: i32,
    pub iterations: usize,
}

/// Kernel knobs read off the packed option rows. Options the bundled
/// kernel has no machinery for (basis files, print and save frequencies,
/// LU update tolerances) are accepted and ignored.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub maximize: bool,
    pub scale_option: i32,
    pub iter_limit: usize,
    pub feas_tol: f64,
    pub opt_tol: f64,
    pub pivot_tol: f64,
}

impl Settings {
    fn from_packed(options: &PackedOptions) -> Self {
        let mut settings = Self {
            maximize: false,
            scale_option: 0,
            iter_limit: 10000,
            feas_tol: 1e-7,
            opt_tol: 1e-7,
            pivot_tol: 1e-12,
        };
        if options.stropts.iter().any(|row| row_name(row) == "Maximize") {
            settings.maximize = true;
        }
        for (row, &value) in options.intopts.iter().zip(&options.intvals) {
            match row_name(row) {
                "Scale option" => settings.scale_option = value,
                "Iteration limit" => settings.iter_limit = value.max(0) as usize,
                _ => {}
            }
        }
        for (row, &value) in options.realopts.iter().zip(&options.realvals) {
            match row_name(row) {
                "Feasibility tol" => settings.feas_tol = value,
                "Optimality tol" => settings.opt_tol = value,
                "LU singularity tol" => settings.pivot_tol = value,
                _ => {}
            }
        }
        settings
    }
}

fn row_name(row: &[u8]) -> &str {
    std::str::from_utf8(row).unwrap_or("").trim_end()
}

/// Standard-precision warm-startable LP solve.
pub fn warm_lp(
    probname: &str,
    arrays: &LpArrays,
    hs: &mut Basis,
    warm: bool,
    options: &PackedOptions,
) -> RawSolution {
    let settings = Settings::from_packed(options);
    debug!(
        "{probname}: double solve, {} rows x {} cols, {} nnz, warm = {warm}",
        arrays.nrows,
        arrays.ncols,
        arrays.nnz()
    );
    solve_bounded::<f64>(arrays, hs, warm, &settings)
}

/// Extended-precision warm-startable LP solve; double-double arithmetic
/// stands in for the native quad build.
pub fn qwarm_lp(
    probname: &str,
    arrays: &LpArrays,
    hs: &mut Basis,
    warm: bool,
    options: &PackedOptions,
) -> RawSolution {
    let settings = Settings::from_packed(options);
    debug!(
        "{probname}: quad solve, {} rows x {} cols, {} nnz, warm = {warm}",
        arrays.nrows,
        arrays.ncols,
        arrays.nnz()
    );
    solve_bounded::<TwoFloat>(arrays, hs, warm, &settings)
}

/// Per-sub-solve outcome of a batched variability call: the value each
/// target reached and the inform code of its solve.
#[derive(Debug, Clone, PartialEq)]
pub struct VarySolution {
    pub obj_vals: Vec<f64>,
    pub informs: Vec<i32>,
}

/// Extended-precision batched variability solve.
///
/// `obj_inds` holds 1-based target columns, each listed twice, with
/// `obj_coeffs` alternating `+1.0` (maximize) and `-1.0` (minimize). The
/// arrays must have been assembled with a nonzero objective marker in
/// every target column so the objective row has a slot to rewrite; the
/// basis is chained across sub-solves.
pub fn qvary_lp(
    probname: &str,
    arrays: &LpArrays,
    hs: &mut Basis,
    warm: bool,
    obj_inds: &[usize],
    obj_coeffs: &[f64],
    options: &PackedOptions,
) -> VarySolution {
    assert_eq!(obj_inds.len(), obj_coeffs.len());
    let settings = Settings::from_packed(options);
    debug!(
        "{probname}: quad variability, {} sub-solves over {} rows x {} cols",
        obj_inds.len(),
        arrays.nrows,
        arrays.ncols
    );

    let mut arrays = arrays.clone();
    let obj_row = arrays.nrows;
    let mut obj_slots = Vec::new();
    for j in 0..arrays.ncols {
        for k in arrays.col_range(j) {
            if arrays.row_idx[k] == obj_row {
                obj_slots.push(k);
            }
        }
    }

    let mut obj_vals = vec![0.0; obj_inds.len()];
    let mut informs = vec![0i32; obj_inds.len()];
    let mut warm = warm;

    for (k, (&col, &coeff)) in obj_inds.iter().zip(obj_coeffs).enumerate() {
        for &slot in &obj_slots {
            arrays.values[slot] = 0.0;
        }
        let target = arrays
            .col_range(col - 1)
            .find(|&slot| arrays.row_idx[slot] == obj_row);
        let Some(slot) = target else {
            log::warn!("{probname}: column {col} has no objective marker, skipping");
            informs[k] = INFORM_INFEASIBLE;
            continue;
        };
        arrays.values[slot] = coeff;

        let raw = solve_bounded::<TwoFloat>(&arrays, hs, warm, &settings);
        informs[k] = raw.inform;
        if raw.inform == INFORM_OPTIMAL {
            obj_vals[k] = raw.x[col - 1];
        }
        // Every later sub-solve restarts from the basis just reached
        warm = true;
    }

    VarySolution { obj_vals, informs }
}
