use log::warn;

use crate::assemble::LpArrays;
use crate::basis::{Basis, BasisStatus};
use crate::scalar::Scalar;

use super::{
    RawSolution, Settings, INFORM_INFEASIBLE, INFORM_ITERATION_LIMIT, INFORM_OPTIMAL,
    INFORM_UNBOUNDED,
};

/// Bounds at or beyond this magnitude are treated as absent.
pub(crate) const INF_BOUND: f64 = 1e20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarState {
    Basic(usize),
    AtLower,
    AtUpper,
    /// Nonbasic at value zero; free variables and clamped superbasics
    AtZero,
}

enum Blocker {
    /// The entering variable reaches its own opposite bound
    Own,
    /// A basic variable reaches a bound and leaves the basis
    Basic { pos: usize, to_upper: bool },
}

/// Primal bounded-variable simplex over `[J | -I] z = 0` with a dense
/// explicit basis inverse.
///
/// Feasibility is restored by a composite phase that prices the gradient
/// of the bound-violation sum; entering choice is Bland's rule and the
/// ratio test stops at the first breakpoint, so every step is monotone.
struct Kernel<'a, S: Scalar> {
    arrays: &'a LpArrays,
    settings: &'a Settings,
    m: usize,
    n: usize,
    nb: usize,
    obj_var: usize,
    row_scale: Vec<f64>,
    col_scale: Vec<f64>,
    /// Scaled sparse columns of `[J | -I]`, 0-based rows
    cols: Vec<Vec<(usize, S)>>,
    lower: Vec<S>,
    upper: Vec<S>,
    lower_finite: Vec<bool>,
    upper_finite: Vec<bool>,
    state: Vec<VarState>,
    basic: Vec<usize>,
    binv: Vec<Vec<S>>,
    iterations: usize,
}

pub(crate) fn solve_bounded<S: Scalar>(
    arrays: &LpArrays,
    basis: &mut Basis,
    warm: bool,
    settings: &Settings,
) -> RawSolution {
    let mut kernel = Kernel::<S>::new(arrays, settings);

    if let Some(j) = kernel.crossed_bounds() {
        warn!(
            "variable {} has crossed bounds [{}, {}], problem infeasible",
            j, arrays.bl[j], arrays.bu[j]
        );
        return kernel.extract(INFORM_INFEASIBLE, basis);
    }

    kernel.install_basis(basis, warm);
    let inform = kernel.run();
    kernel.extract(inform, basis)
}

impl<'a, S: Scalar> Kernel<'a, S> {
    fn new(arrays: &'a LpArrays, settings: &'a Settings) -> Self {
        let m = arrays.nrows;
        let n = arrays.ncols;
        let nb = n + m;

        let (row_scale, col_scale) = if settings.scale_option != 0 {
            geometric_scales(arrays)
        } else {
            (vec![1.0; m], vec![1.0; n])
        };

        let mut cols: Vec<Vec<(usize, S)>> = Vec::with_capacity(nb);
        for j in 0..n {
            let mut col = Vec::with_capacity(arrays.col_range(j).len());
            for k in arrays.col_range(j) {
                let i = arrays.row_idx[k] - 1;
                let a = arrays.values[k] * row_scale[i] * col_scale[j];
                if a != 0.0 {
                    col.push((i, S::from_f64(a)));
                }
            }
            cols.push(col);
        }
        // Slack columns stay -e_i: the row and slack scales cancel
        for i in 0..m {
            cols.push(vec![(i, S::from_f64(-1.0))]);
        }

        let mut lower = vec![S::zero(); nb];
        let mut upper = vec![S::zero(); nb];
        let mut lower_finite = vec![false; nb];
        let mut upper_finite = vec![false; nb];
        for j in 0..nb {
            // Structural z'_j = z_j / c_j, slack s'_i = s_i * r_i; the
            // scales are powers of two so these products are exact
            let factor = if j < n {
                1.0 / col_scale[j]
            } else {
                row_scale[j - n]
            };
            let raw_l = arrays.bl[j];
            if raw_l > -INF_BOUND {
                lower_finite[j] = true;
                lower[j] = S::from_f64(raw_l * factor);
            }
            let raw_u = arrays.bu[j];
            if raw_u < INF_BOUND {
                upper_finite[j] = true;
                upper[j] = S::from_f64(raw_u * factor);
            }
        }

        Self {
            arrays,
            settings,
            m,
            n,
            nb,
            obj_var: nb - 1,
            row_scale,
            col_scale,
            cols,
            lower,
            upper,
            lower_finite,
            upper_finite,
            state: vec![VarState::AtZero; nb],
            basic: Vec::new(),
            binv: Vec::new(),
            iterations: 0,
        }
    }

    fn crossed_bounds(&self) -> Option<usize> {
        let ftol = S::from_f64(self.settings.feas_tol);
        (0..self.nb).find(|&j| {
            self.lower_finite[j]
                && self.upper_finite[j]
                && self.lower[j] > self.upper[j] + ftol
        })
    }

    fn nearest_bound_state(&self, j: usize) -> VarState {
        match (self.lower_finite[j], self.upper_finite[j]) {
            (true, true) => {
                if self.lower[j].abs() > self.upper[j].abs() {
                    VarState::AtUpper
                } else {
                    VarState::AtLower
                }
            }
            (true, false) => VarState::AtLower,
            (false, true) => VarState::AtUpper,
            (false, false) => VarState::AtZero,
        }
    }

    /// All-slack starting basis; its inverse is -I by construction.
    fn cold_start(&mut self) {
        self.basic = (0..self.m).map(|i| self.n + i).collect();
        for j in 0..self.n {
            self.state[j] = self.nearest_bound_state(j);
        }
        for (p, i) in (0..self.m).enumerate() {
            self.state[self.n + i] = VarState::Basic(p);
        }
        self.binv = vec![vec![S::zero(); self.m]; self.m];
        for p in 0..self.m {
            self.binv[p][p] = -S::from_f64(1.0);
        }
    }

    fn install_basis(&mut self, basis: &Basis, warm: bool) {
        if !warm {
            self.cold_start();
            return;
        }
        if basis.len() != self.nb {
            warn!(
                "warm basis has {} statuses for {} variables, starting cold",
                basis.len(),
                self.nb
            );
            self.cold_start();
            return;
        }

        let mut basic = Vec::with_capacity(self.m);
        for (j, status) in basis.statuses.iter().enumerate() {
            self.state[j] = match status {
                BasisStatus::Basic => {
                    basic.push(j);
                    VarState::Basic(basic.len() - 1)
                }
                BasisStatus::LowerBound => {
                    if self.lower_finite[j] {
                        VarState::AtLower
                    } else {
                        VarState::AtZero
                    }
                }
                BasisStatus::UpperBound => {
                    if self.upper_finite[j] {
                        VarState::AtUpper
                    } else {
                        VarState::AtZero
                    }
                }
                BasisStatus::Superbasic => {
                    let below_ok = !self.lower_finite[j] || !(self.lower[j] > S::zero());
                    let above_ok = !self.upper_finite[j] || !(self.upper[j] < S::zero());
                    if below_ok && above_ok {
                        VarState::AtZero
                    } else {
                        self.nearest_bound_state(j)
                    }
                }
            };
        }

        if basic.len() != self.m {
            warn!(
                "warm basis has {} basic variables for {} rows, starting cold",
                basic.len(),
                self.m
            );
            self.cold_start();
            return;
        }

        match self.invert(&basic) {
            Some(binv) => {
                self.basic = basic;
                self.binv = binv;
            }
            None => {
                warn!("warm basis is singular, starting cold");
                self.cold_start();
            }
        }
    }

    /// Dense inverse of the basis matrix by Gauss-Jordan elimination with
    /// partial pivoting. `None` when a pivot falls under the singularity
    /// tolerance.
    fn invert(&self, basic: &[usize]) -> Option<Vec<Vec<S>>> {
        let m = self.m;
        let pivot_tol = S::from_f64(self.settings.pivot_tol);

        let mut mat = vec![vec![S::zero(); m]; m];
        for (p, &var) in basic.iter().enumerate() {
            for &(i, a) in &self.cols[var] {
                mat[i][p] = a;
            }
        }
        let mut inv = vec![vec![S::zero(); m]; m];
        for p in 0..m {
            inv[p][p] = S::from_f64(1.0);
        }

        for k in 0..m {
            let mut piv = k;
            for r in k + 1..m {
                if mat[r][k].abs() > mat[piv][k].abs() {
                    piv = r;
                }
            }
            if !(mat[piv][k].abs() > pivot_tol) {
                return None;
            }
            mat.swap(k, piv);
            inv.swap(k, piv);

            let diag = mat[k][k];
            for c in 0..m {
                mat[k][c] = mat[k][c] / diag;
                inv[k][c] = inv[k][c] / diag;
            }
            for r in 0..m {
                if r == k {
                    continue;
                }
                let f = mat[r][k];
                if !(f.abs() > S::zero()) {
                    continue;
                }
                for c in 0..m {
                    mat[r][c] = mat[r][c] - f * mat[k][c];
                    inv[r][c] = inv[r][c] - f * inv[k][c];
                }
            }
        }
        Some(inv)
    }

    fn nonbasic_value(&self, j: usize) -> S {
        match self.state[j] {
            VarState::AtLower => self.lower[j],
            VarState::AtUpper => self.upper[j],
            _ => S::zero(),
        }
    }

    /// Basic values implied by the nonbasic activities: xB = -Binv N xN.
    fn compute_beta(&self) -> Vec<S> {
        let mut acc = vec![S::zero(); self.m];
        for j in 0..self.nb {
            if matches!(self.state[j], VarState::Basic(_)) {
                continue;
            }
            let v = self.nonbasic_value(j);
            for &(i, a) in &self.cols[j] {
                acc[i] = acc[i] + a * v;
            }
        }
        (0..self.m)
            .map(|p| {
                let mut s = S::zero();
                for i in 0..self.m {
                    s = s + self.binv[p][i] * acc[i];
                }
                -s
            })
            .collect()
    }

    /// w = Binv a_j for a sparse column.
    fn fwd_transform(&self, j: usize) -> Vec<S> {
        let mut w = vec![S::zero(); self.m];
        for &(i, a) in &self.cols[j] {
            for p in 0..self.m {
                w[p] = w[p] + self.binv[p][i] * a;
            }
        }
        w
    }

    /// y = Binv^T g for a cost over basis positions.
    fn back_transform(&self, g: &[S]) -> Vec<S> {
        let mut y = vec![S::zero(); self.m];
        for (p, gp) in g.iter().enumerate() {
            if !(gp.abs() > S::zero()) {
                continue;
            }
            for i in 0..self.m {
                y[i] = y[i] + *gp * self.binv[p][i];
            }
        }
        y
    }

    fn price(&self, j: usize, y: &[S]) -> S {
        let mut acc = S::zero();
        for &(i, a) in &self.cols[j] {
            acc = acc + a * y[i];
        }
        -acc
    }

    fn run(&mut self) -> i32 {
        let ftol = S::from_f64(self.settings.feas_tol);
        let otol = S::from_f64(self.settings.opt_tol);
        let pivot_tol = S::from_f64(self.settings.pivot_tol);
        let one = S::from_f64(1.0);
        let obj_sign = if self.settings.maximize { one } else { -one };

        loop {
            if self.iterations >= self.settings.iter_limit {
                return INFORM_ITERATION_LIMIT;
            }

            let beta = self.compute_beta();

            let mut g = vec![S::zero(); self.m];
            let mut phase1 = false;
            for p in 0..self.m {
                let var = self.basic[p];
                if self.lower_finite[var] && beta[p] < self.lower[var] - ftol {
                    g[p] = -one;
                    phase1 = true;
                } else if self.upper_finite[var] && beta[p] > self.upper[var] + ftol {
                    g[p] = one;
                    phase1 = true;
                }
            }

            let y = if phase1 {
                self.back_transform(&g)
            } else {
                match self.state[self.obj_var] {
                    VarState::Basic(p) => {
                        let mut g = vec![S::zero(); self.m];
                        g[p] = obj_sign;
                        self.back_transform(&g)
                    }
                    _ => vec![S::zero(); self.m],
                }
            };

            // Bland: first improving variable by index
            let mut entering: Option<(usize, i8)> = None;
            for j in 0..self.nb {
                if matches!(self.state[j], VarState::Basic(_)) {
                    continue;
                }
                if self.lower_finite[j]
                    && self.upper_finite[j]
                    && !(self.lower[j] < self.upper[j])
                {
                    continue; // fixed
                }
                let cj = if !phase1 && j == self.obj_var {
                    obj_sign
                } else {
                    S::zero()
                };
                let d = cj + self.price(j, &y);
                let (can_inc, can_dec) = match self.state[j] {
                    VarState::AtLower => (true, false),
                    VarState::AtUpper => (false, true),
                    _ => (true, true),
                };
                // In phase 1, d is the rate of the violation sum; in
                // phase 2 it is the rate of the objective
                let sigma = if phase1 {
                    if can_inc && d < -otol {
                        1
                    } else if can_dec && d > otol {
                        -1
                    } else {
                        continue;
                    }
                } else if can_inc && d > otol {
                    1
                } else if can_dec && d < -otol {
                    -1
                } else {
                    continue;
                };
                entering = Some((j, sigma));
                break;
            }

            let Some((q, sigma)) = entering else {
                return if phase1 {
                    INFORM_INFEASIBLE
                } else {
                    INFORM_OPTIMAL
                };
            };

            let w = self.fwd_transform(q);
            let sig = if sigma > 0 { one } else { -one };

            let mut t_min: Option<S> = None;
            let mut blocker = Blocker::Own;
            let mut blocker_var = q;
            if sigma > 0 {
                if self.upper_finite[q] {
                    let mut t = self.upper[q] - self.nonbasic_value(q);
                    if t < S::zero() {
                        t = S::zero();
                    }
                    t_min = Some(t);
                }
            } else if self.lower_finite[q] {
                let mut t = self.nonbasic_value(q) - self.lower[q];
                if t < S::zero() {
                    t = S::zero();
                }
                t_min = Some(t);
            }

            for p in 0..self.m {
                if !(w[p].abs() > pivot_tol) {
                    continue;
                }
                let rate = -sig * w[p];
                let var = self.basic[p];
                let v = beta[p];
                // A violated basic blocks where it regains feasibility; a
                // feasible basic blocks at the bound ahead of it
                let (bound, to_upper) = if self.lower_finite[var] && v < self.lower[var] - ftol {
                    if rate > S::zero() {
                        (self.lower[var], false)
                    } else {
                        continue;
                    }
                } else if self.upper_finite[var] && v > self.upper[var] + ftol {
                    if rate < S::zero() {
                        (self.upper[var], true)
                    } else {
                        continue;
                    }
                } else if rate > S::zero() {
                    if self.upper_finite[var] {
                        (self.upper[var], true)
                    } else {
                        continue;
                    }
                } else if self.lower_finite[var] {
                    (self.lower[var], false)
                } else {
                    continue;
                };

                let mut t = (bound - v) / rate;
                if t < S::zero() {
                    t = S::zero();
                }
                let replace = match t_min {
                    None => true,
                    Some(best) => {
                        if t < best {
                            true
                        } else if best < t {
                            false
                        } else {
                            var < blocker_var
                        }
                    }
                };
                if replace {
                    t_min = Some(t);
                    blocker = Blocker::Basic { pos: p, to_upper };
                    blocker_var = var;
                }
            }

            if t_min.is_none() {
                if phase1 {
                    warn!("no breakpoint while infeasible, giving up");
                    return INFORM_INFEASIBLE;
                }
                return INFORM_UNBOUNDED;
            }

            match blocker {
                Blocker::Own => {
                    self.state[q] = if sigma > 0 {
                        VarState::AtUpper
                    } else {
                        VarState::AtLower
                    };
                }
                Blocker::Basic { pos, to_upper } => {
                    let leaving = self.basic[pos];
                    self.state[leaving] = if to_upper {
                        VarState::AtUpper
                    } else {
                        VarState::AtLower
                    };
                    self.state[q] = VarState::Basic(pos);
                    self.basic[pos] = q;
                    self.pivot_update(&w, pos);
                }
            }
            self.iterations += 1;
        }
    }

    /// Product-form update of the inverse after `basic[pos]` changed.
    fn pivot_update(&mut self, w: &[S], pos: usize) {
        let wp = w[pos];
        for i in 0..self.m {
            self.binv[pos][i] = self.binv[pos][i] / wp;
        }
        for r in 0..self.m {
            if r == pos {
                continue;
            }
            let f = w[r];
            if !(f.abs() > S::zero()) {
                continue;
            }
            for i in 0..self.m {
                self.binv[r][i] = self.binv[r][i] - f * self.binv[pos][i];
            }
        }
    }

    fn extract(&self, inform: i32, basis: &mut Basis) -> RawSolution {
        let one = S::from_f64(1.0);
        let obj_sign = if self.settings.maximize { one } else { -one };

        let mut x = vec![0.0; self.nb];
        let mut pi = vec![0.0; self.m];
        let mut rc = vec![0.0; self.nb];

        if !self.basic.is_empty() {
            let beta = self.compute_beta();
            for j in 0..self.nb {
                let value = match self.state[j] {
                    VarState::Basic(p) => beta[p],
                    _ => self.nonbasic_value(j),
                };
                // Undo the scaling; both factors are powers of two
                x[j] = if j < self.n {
                    (value * S::from_f64(self.col_scale[j])).to_f64()
                } else {
                    (value / S::from_f64(self.row_scale[j - self.n])).to_f64()
                };
            }

            let y = match self.state[self.obj_var] {
                VarState::Basic(p) => {
                    let mut g = vec![S::zero(); self.m];
                    g[p] = obj_sign;
                    self.back_transform(&g)
                }
                _ => vec![S::zero(); self.m],
            };
            let r_obj = self.row_scale[self.m - 1];
            for i in 0..self.m {
                pi[i] = (y[i] * S::from_f64(self.row_scale[i] / r_obj)).to_f64();
            }

            for j in 0..self.n {
                let mut acc = 0.0;
                for k in self.arrays.col_range(j) {
                    acc += self.arrays.values[k] * pi[self.arrays.row_idx[k] - 1];
                }
                rc[j] = -acc;
            }
            rc[self.n..self.nb].copy_from_slice(&pi);
            rc[self.obj_var] += if self.settings.maximize { 1.0 } else { -1.0 };
        }

        basis.statuses.resize(self.nb, BasisStatus::LowerBound);
        for j in 0..self.nb {
            basis.statuses[j] = match self.state[j] {
                VarState::Basic(_) => BasisStatus::Basic,
                VarState::AtUpper => BasisStatus::UpperBound,
                _ => BasisStatus::LowerBound,
            };
        }

        RawSolution {
            x,
            pi,
            rc,
            inform,
            iterations: self.iterations,
        }
    }
}

/// Two passes of geometric-mean equilibration, rounded to powers of two
/// so applying and undoing the scales is exact.
fn geometric_scales(arrays: &LpArrays) -> (Vec<f64>, Vec<f64>) {
    let m = arrays.nrows;
    let n = arrays.ncols;
    let mut row_scale = vec![1.0f64; m];
    let mut col_scale = vec![1.0f64; n];

    for _ in 0..2 {
        for (j, cs) in col_scale.iter_mut().enumerate() {
            let mut lo = f64::INFINITY;
            let mut hi = 0.0f64;
            for k in arrays.col_range(j) {
                let i = arrays.row_idx[k] - 1;
                let a = (arrays.values[k] * row_scale[i] * *cs).abs();
                if a > 0.0 {
                    lo = lo.min(a);
                    hi = hi.max(a);
                }
            }
            if hi > 0.0 {
                *cs *= pow2_round(1.0 / (lo * hi).sqrt());
            }
        }

        let mut row_lo = vec![f64::INFINITY; m];
        let mut row_hi = vec![0.0f64; m];
        for j in 0..n {
            for k in arrays.col_range(j) {
                let i = arrays.row_idx[k] - 1;
                let a = (arrays.values[k] * row_scale[i] * col_scale[j]).abs();
                if a > 0.0 {
                    row_lo[i] = row_lo[i].min(a);
                    row_hi[i] = row_hi[i].max(a);
                }
            }
        }
        for i in 0..m {
            if row_hi[i] > 0.0 {
                row_scale[i] *= pow2_round(1.0 / (row_lo[i] * row_hi[i]).sqrt());
            }
        }
    }

    (row_scale, col_scale)
}

/// Nearest power of two, clamped to 2^±60.
fn pow2_round(x: f64) -> f64 {
    if !x.is_finite() || x <= 0.0 {
        return 1.0;
    }
    let e = x.log2().round().clamp(-60.0, 60.0) as i32;
    2.0f64.powi(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow2_round() {
        assert_eq!(pow2_round(1.0), 1.0);
        assert_eq!(pow2_round(3.0), 4.0);
        assert_eq!(pow2_round(0.3), 0.25);
        assert_eq!(pow2_round(0.0), 1.0);
        assert_eq!(pow2_round(f64::NAN), 1.0);
    }

    #[test]
    fn test_scales_balance_a_skewed_matrix() {
        // One huge and one tiny entry in the same column
        let arrays = LpArrays {
            nrows: 2,
            ncols: 1,
            col_ptr: vec![1, 3],
            row_idx: vec![1, 2],
            values: vec![1e6, 1e-6],
            bl: vec![0.0, 0.0, 0.0],
            bu: vec![1.0, 1.0, 1.0],
        };
        let (row_scale, col_scale) = geometric_scales(&arrays);
        let a0 = (1e6 * row_scale[0] * col_scale[0]).abs();
        let a1 = (1e-6 * row_scale[1] * col_scale[0]).abs();
        let spread = (a0.max(a1)) / (a0.min(a1));
        assert!(spread < 16.0, "spread {spread} not reduced");
        for s in row_scale.iter().chain(col_scale.iter()) {
            assert_eq!(s.log2().fract(), 0.0, "scale {s} is not a power of two");
        }
    }
}
