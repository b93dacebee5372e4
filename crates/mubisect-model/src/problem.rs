use std::collections::BTreeMap;

use thiserror::Error;

use crate::coefficient::Coefficient;

/// Practical infinity for variable bounds. The solver layer treats bounds
/// at or beyond this magnitude as unconstrained.
pub const UNBOUNDED: f64 = 1e40;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DimensionError {
    #[error("rhs has {found} entries for {expected} rows")]
    Rhs { expected: usize, found: usize },
    #[error("senses has {found} entries for {expected} rows")]
    Senses { expected: usize, found: usize },
    #[error("objective has {found} entries for {expected} columns")]
    Objective { expected: usize, found: usize },
    #[error("lower bounds have {found} entries for {expected} columns")]
    LowerBounds { expected: usize, found: usize },
    #[error("upper bounds have {found} entries for {expected} columns")]
    UpperBounds { expected: usize, found: usize },
    #[error("matrix entry ({row}, {col}) is outside the {nrows} x {ncols} problem")]
    EntryOutOfRange {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },
}

/// Row sense of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSense {
    /// Equal (=), the mass-balance default
    Eq,
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
}

/// A linear program whose matrix entries and variable bounds are functions
/// of the growth rate.
///
/// Entries live in a `BTreeMap` keyed by `(row, col)`, so iteration order
/// (and therefore assembly) is deterministic, and writing to an occupied
/// key replaces the previous coefficient. Layered model builders rely on
/// the replace semantics: later coupling passes override earlier
/// stoichiometry for the same position.
#[derive(Debug, Clone)]
pub struct ParameterizedProblem {
    /// Constraint (metabolite) ids
    pub rows: Vec<String>,
    /// Variable (reaction) ids
    pub columns: Vec<String>,
    /// Sparse matrix entries keyed by (row, col)
    pub entries: BTreeMap<(usize, usize), Coefficient>,
    /// Right-hand side per row
    pub rhs: Vec<f64>,
    /// Sense per row
    pub senses: Vec<RowSense>,
    /// Objective coefficients per column
    pub objective: Vec<f64>,
    /// Lower bound per column
    pub lower: Vec<Coefficient>,
    /// Upper bound per column
    pub upper: Vec<Coefficient>,
}

impl ParameterizedProblem {
    pub fn new(rows: Vec<String>, columns: Vec<String>) -> Self {
        let m = rows.len();
        let n = columns.len();
        Self {
            rows,
            columns,
            entries: BTreeMap::new(),
            rhs: vec![0.0; m],
            senses: vec![RowSense::Eq; m],
            objective: vec![0.0; n],
            lower: vec![Coefficient::Constant(0.0); n],
            upper: vec![Coefficient::Constant(UNBOUNDED); n],
        }
    }

    /// Set (or override) one matrix entry.
    pub fn set_coefficient(&mut self, row: usize, col: usize, value: impl Into<Coefficient>) {
        self.entries.insert((row, col), value.into());
    }

    pub fn coefficient(&self, row: usize, col: usize) -> Option<&Coefficient> {
        self.entries.get(&(row, col))
    }

    pub fn set_rhs(&mut self, row: usize, value: f64) {
        self.rhs[row] = value;
    }

    pub fn set_sense(&mut self, row: usize, sense: RowSense) {
        self.senses[row] = sense;
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>) {
        self.objective = coefficients;
    }

    pub fn set_bounds(
        &mut self,
        col: usize,
        lower: impl Into<Coefficient>,
        upper: impl Into<Coefficient>,
    ) {
        self.lower[col] = lower.into();
        self.upper[col] = upper.into();
    }

    pub fn row_index(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r == id)
    }

    pub fn column_index(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == id)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Check that every vector matches the row/column counts and every
    /// entry is in range. Engines call this before touching the solver.
    pub fn validate(&self) -> Result<(), DimensionError> {
        let m = self.num_rows();
        let n = self.num_columns();
        if self.rhs.len() != m {
            return Err(DimensionError::Rhs {
                expected: m,
                found: self.rhs.len(),
            });
        }
        if self.senses.len() != m {
            return Err(DimensionError::Senses {
                expected: m,
                found: self.senses.len(),
            });
        }
        if self.objective.len() != n {
            return Err(DimensionError::Objective {
                expected: n,
                found: self.objective.len(),
            });
        }
        if self.lower.len() != n {
            return Err(DimensionError::LowerBounds {
                expected: n,
                found: self.lower.len(),
            });
        }
        if self.upper.len() != n {
            return Err(DimensionError::UpperBounds {
                expected: n,
                found: self.upper.len(),
            });
        }
        for &(row, col) in self.entries.keys() {
            if row >= m || col >= n {
                return Err(DimensionError::EntryOutOfRange {
                    row,
                    col,
                    nrows: m,
                    ncols: n,
                });
            }
        }
        Ok(())
    }

    /// Lower every symbolic entry and bound to its compiled form.
    pub fn compiled(mut self) -> Self {
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .map(|(key, coeff)| (key, coeff.compiled()))
            .collect();
        self.lower = self.lower.into_iter().map(Coefficient::compiled).collect();
        self.upper = self.upper.into_iter().map(Coefficient::compiled).collect();
        self
    }
}
