pub mod adapter;
pub mod assemble;
pub mod backend;
pub mod basis;
pub mod bisect;
pub mod options;
pub mod scalar;
pub mod variability;

pub use adapter::{PrecisionProfile, SolveError, SolveResult, SolverAdapter};
pub use assemble::{assemble, LpArrays};
pub use basis::{Basis, BasisStatus};
pub use bisect::{Bisection, BisectionOutcome, BisectionStatus, BisectionStep};
pub use options::{PackedOptions, SolverOptions};
pub use variability::{flux_ranges, flux_ranges_by_id, FluxRange};
