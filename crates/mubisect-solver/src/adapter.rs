use log::debug;
use thiserror::Error;

use mubisect_model::{DimensionError, EvaluationError};

use crate::assemble::LpArrays;
use crate::backend::{self, RawSolution, INFORM_INFEASIBLE, INFORM_OPTIMAL};
use crate::basis::Basis;
use crate::options::SolverOptions;

#[derive(Error, Debug)]
pub enum SolveError {
    #[error(transparent)]
    Dimension(#[from] DimensionError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("solver returned inform {inform}")]
    Status { inform: i32 },
    #[error("unknown column id `{0}`")]
    UnknownColumn(String),
}

/// Which precision each backend call runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Double,
    Quad,
}

/// A named solve chain. The staged profiles feed each stage's basis to
/// the next as a warm start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecisionProfile {
    Double,
    #[default]
    Quad,
    /// Double, then quad warm-started from the double basis
    DoubleQuad,
    /// `DoubleQuad` plus a final quad pass with scaling off
    DoubleQuadQuad,
}

/// One step of a profile: a precision and an optional override of the
/// `Scale option` for just that solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stage {
    precision: Precision,
    scale_option: Option<i32>,
}

impl PrecisionProfile {
    fn stages(self) -> &'static [Stage] {
        const D: Stage = Stage {
            precision: Precision::Double,
            scale_option: None,
        };
        const Q: Stage = Stage {
            precision: Precision::Quad,
            scale_option: None,
        };
        const Q_SCALED: Stage = Stage {
            precision: Precision::Quad,
            scale_option: Some(2),
        };
        const Q_UNSCALED: Stage = Stage {
            precision: Precision::Quad,
            scale_option: Some(0),
        };
        match self {
            PrecisionProfile::Double => &[D],
            PrecisionProfile::Quad => &[Q],
            PrecisionProfile::DoubleQuad => &[D, Q_SCALED],
            PrecisionProfile::DoubleQuadQuad => &[D, Q_SCALED, Q_UNSCALED],
        }
    }
}

impl std::str::FromStr for PrecisionProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "double" => Ok(PrecisionProfile::Double),
            "quad" => Ok(PrecisionProfile::Quad),
            "dq" => Ok(PrecisionProfile::DoubleQuad),
            "dqq" => Ok(PrecisionProfile::DoubleQuadQuad),
            other => Err(format!(
                "unknown precision `{other}`; expected double, quad, dq, or dqq"
            )),
        }
    }
}

/// What one adapter call returns. The raw `inform` is kept verbatim next
/// to the normalized feasibility view; callers that care whether the
/// solver broke rather than proved infeasibility use [`status_error`].
///
/// [`status_error`]: SolveResult::status_error
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    /// Primal values, structural then slack
    pub x: Vec<f64>,
    /// Duals per row
    pub pi: Vec<f64>,
    /// Reduced costs, structural then slack
    pub rc: Vec<f64>,
    /// Basis after the solve
    pub basis: Basis,
    /// Raw backend status
    pub inform: i32,
    pub warm_started: bool,
}

impl SolveResult {
    /// The normalized collapse: zero is optimal, anything else counts as
    /// infeasible for the engines' feasibility-only usage.
    pub fn is_optimal(&self) -> bool {
        self.inform == INFORM_OPTIMAL
    }

    /// Objective value, read off the free objective row's slack.
    pub fn objective(&self) -> f64 {
        self.x.last().copied().unwrap_or(0.0)
    }

    /// A typed error for codes that are neither optimal nor the backend's
    /// infeasible, e.g. an iteration limit or unbounded ray.
    pub fn status_error(&self) -> Option<SolveError> {
        match self.inform {
            INFORM_OPTIMAL | INFORM_INFEASIBLE => None,
            inform => Some(SolveError::Status { inform }),
        }
    }
}

/// Uniform calling convention over the two backend precisions and their
/// staged refinement chains.
///
/// The option sets are owned and mutable, so a caller can tune
/// tolerances before solving; each stage clones its set, applies the
/// stage's scaling override to the clone, and leaves the owned sets
/// untouched.
#[derive(Debug, Clone)]
pub struct SolverAdapter {
    name: String,
    quad_options: SolverOptions,
    double_options: SolverOptions,
}

impl Default for SolverAdapter {
    fn default() -> Self {
        Self::new("me_lp")
    }
}

impl SolverAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quad_options: SolverOptions::quad(),
            double_options: SolverOptions::double(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quad_options_mut(&mut self) -> &mut SolverOptions {
        &mut self.quad_options
    }

    pub fn double_options_mut(&mut self) -> &mut SolverOptions {
        &mut self.double_options
    }

    pub(crate) fn quad_options(&self) -> &SolverOptions {
        &self.quad_options
    }

    fn stage_options(&self, stage: Stage) -> SolverOptions {
        let mut options = match stage.precision {
            Precision::Double => self.double_options.clone(),
            Precision::Quad => self.quad_options.clone(),
        };
        if let Some(scale) = stage.scale_option {
            options.set_int("Scale option", scale);
        }
        options
    }

    /// Solve the assembled arrays under a profile. `warm_basis` seeds the
    /// first stage; later stages always warm start from the stage before.
    pub fn solve(
        &self,
        arrays: &LpArrays,
        warm_basis: Option<&Basis>,
        profile: PrecisionProfile,
    ) -> SolveResult {
        let warm_started = warm_basis.is_some();
        let mut hs = match warm_basis {
            Some(basis) => basis.clone(),
            None => Basis::cold(arrays.num_vars()),
        };
        let mut warm = warm_started;

        let mut raw: Option<RawSolution> = None;
        for (index, &stage) in profile.stages().iter().enumerate() {
            let options = self.stage_options(stage).pack();
            let out = match stage.precision {
                Precision::Double => backend::warm_lp(&self.name, arrays, &mut hs, warm, &options),
                Precision::Quad => backend::qwarm_lp(&self.name, arrays, &mut hs, warm, &options),
            };
            debug!(
                "{}: stage {index} ({:?}) inform {} after {} iterations",
                self.name, stage.precision, out.inform, out.iterations
            );
            raw = Some(out);
            warm = true;
        }
        // Profiles always have at least one stage
        let raw = raw.unwrap_or(RawSolution {
            x: Vec::new(),
            pi: Vec::new(),
            rc: Vec::new(),
            inform: INFORM_INFEASIBLE,
            iterations: 0,
        });

        SolveResult {
            x: raw.x,
            pi: raw.pi,
            rc: raw.rc,
            basis: hs,
            inform: raw.inform,
            warm_started,
        }
    }
}
