use std::ops::Range;

use mubisect_model::{EvaluatedLp, RowSense, UNBOUNDED};
use sprs::TriMat;

/// An LP in the native array layout: the constraint matrix stacked over
/// the objective row, compressed by column with 1-based indices, and one
/// bound pair per structural variable followed by one per row slack.
///
/// The formulation is `[J | -I] z = 0` with the right-hand side encoded
/// in the slack bounds, and the objective read off the free last row's
/// slack.
#[derive(Debug, Clone, PartialEq)]
pub struct LpArrays {
    /// Constraint rows plus the objective row
    pub nrows: usize,
    /// Structural columns
    pub ncols: usize,
    /// Column pointers, 1-based, length `ncols + 1`
    pub col_ptr: Vec<usize>,
    /// Row index per stored entry, 1-based, ascending within a column
    pub row_idx: Vec<usize>,
    /// Entry values, column-major
    pub values: Vec<f64>,
    /// Lower bounds: structural then slack
    pub bl: Vec<f64>,
    /// Upper bounds: structural then slack
    pub bu: Vec<f64>,
}

impl LpArrays {
    /// Total variables, structural plus slack.
    pub fn num_vars(&self) -> usize {
        self.ncols + self.nrows
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// 0-based storage range of column `j`.
    pub(crate) fn col_range(&self, j: usize) -> Range<usize> {
        self.col_ptr[j] - 1..self.col_ptr[j + 1] - 1
    }
}

/// Stack the evaluated matrix over the objective row and encode the
/// right-hand side into slack bounds.
///
/// Zero objective coefficients are not stored. Equality rows pin the
/// slack to the rhs; `Le`/`Ge` rows free one side; the objective row is
/// free in both directions.
pub fn assemble(
    lp: &EvaluatedLp,
    rhs: &[f64],
    senses: &[RowSense],
    objective: &[f64],
) -> LpArrays {
    let m = lp.nrows;
    let n = lp.ncols;
    let nrows = m + 1;

    let mut triplets = TriMat::new((nrows, n));
    for (&(row, col), &value) in &lp.entries {
        triplets.add_triplet(row, col, value);
    }
    for (col, &weight) in objective.iter().enumerate() {
        if weight != 0.0 {
            triplets.add_triplet(m, col, weight);
        }
    }

    let csc: sprs::CsMat<f64> = triplets.to_csc();
    let (col_ptr, row_idx, values) = csc.into_raw_storage();
    let col_ptr: Vec<usize> = col_ptr.iter().map(|&p| p + 1).collect();
    let row_idx: Vec<usize> = row_idx.iter().map(|&r| r + 1).collect();

    let mut bl = Vec::with_capacity(n + nrows);
    let mut bu = Vec::with_capacity(n + nrows);
    bl.extend_from_slice(&lp.lower);
    bu.extend_from_slice(&lp.upper);
    for (i, &b) in rhs.iter().enumerate() {
        let (sl, su) = match senses[i] {
            RowSense::Eq => (b, b),
            RowSense::Le => (-UNBOUNDED, b),
            RowSense::Ge => (b, UNBOUNDED),
        };
        bl.push(sl);
        bu.push(su);
    }
    // Objective row slack is free
    bl.push(-UNBOUNDED);
    bu.push(UNBOUNDED);

    LpArrays {
        nrows,
        ncols: n,
        col_ptr,
        row_idx,
        values,
        bl,
        bu,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn toy_lp() -> EvaluatedLp {
        let mut entries = BTreeMap::new();
        entries.insert((0, 0), 2.0);
        entries.insert((0, 1), -1.0);
        EvaluatedLp {
            nrows: 1,
            ncols: 2,
            entries,
            lower: vec![0.0, 0.0],
            upper: vec![5.0, 5.0],
        }
    }

    #[test]
    fn test_layout() {
        let arrays = assemble(&toy_lp(), &[3.0], &[RowSense::Eq], &[0.0, 1.0]);
        assert_eq!(arrays.nrows, 2);
        assert_eq!(arrays.ncols, 2);
        // Column 0 holds the matrix entry only; its zero objective weight
        // is not stored. Column 1 holds the entry plus the objective.
        assert_eq!(arrays.col_ptr, vec![1, 2, 4]);
        assert_eq!(arrays.row_idx, vec![1, 1, 2]);
        assert_eq!(arrays.values, vec![2.0, -1.0, 1.0]);
        assert_eq!(arrays.num_vars(), 4);
        assert_eq!(arrays.col_range(1), 1..3);
    }

    #[test]
    fn test_equality_slack_bounds() {
        let arrays = assemble(&toy_lp(), &[3.0], &[RowSense::Eq], &[0.0, 1.0]);
        assert_eq!(arrays.bl, vec![0.0, 0.0, 3.0, -UNBOUNDED]);
        assert_eq!(arrays.bu, vec![5.0, 5.0, 3.0, UNBOUNDED]);
    }

    #[test]
    fn test_inequality_slack_bounds() {
        let le = assemble(&toy_lp(), &[3.0], &[RowSense::Le], &[0.0, 0.0]);
        assert_eq!(le.bl[2], -UNBOUNDED);
        assert_eq!(le.bu[2], 3.0);

        let ge = assemble(&toy_lp(), &[3.0], &[RowSense::Ge], &[0.0, 0.0]);
        assert_eq!(ge.bl[2], 3.0);
        assert_eq!(ge.bu[2], UNBOUNDED);
    }

    #[test]
    fn test_deterministic() {
        let lp = toy_lp();
        let a = assemble(&lp, &[3.0], &[RowSense::Eq], &[0.0, 1.0]);
        let b = assemble(&lp, &[3.0], &[RowSense::Eq], &[0.0, 1.0]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_column_has_empty_range() {
        let mut entries = BTreeMap::new();
        entries.insert((0, 0), 1.0);
        let lp = EvaluatedLp {
            nrows: 1,
            ncols: 2,
            entries,
            lower: vec![0.0, 0.0],
            upper: vec![1.0, 1.0],
        };
        let arrays = assemble(&lp, &[0.0], &[RowSense::Eq], &[0.0, 0.0]);
        assert_eq!(arrays.col_range(1).len(), 0);
        assert_eq!(arrays.nnz(), 1);
    }
}
