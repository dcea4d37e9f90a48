pub mod decomposition;
pub mod solver;

use serde::{Deserialize, Serialize};

use crate::error::{HksError, HksResult};
use crate::operators::VertexArea;

pub use decomposition::{assert_spectral_gap, EigenDecomposition, SpectrumReport};
pub use solver::{ShiftInvertSolver, SolverOutcome, SolverParams, SolverStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    /// Requested eigenpairs `k`; clamped to the vertex count.
    pub eigenpairs: usize,
    pub area: VertexArea,
    pub shift: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub seed: u64,
    /// Panic when the two smallest nonzero eigenvalues are not separated.
    pub enforce_spectral_gap: bool,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            eigenpairs: 100,
            area: VertexArea::default(),
            shift: 0.0,
            max_iterations: 1000,
            tolerance: 1e-10,
            seed: 42,
            enforce_spectral_gap: true,
        }
    }
}

impl SpectralConfig {
    pub fn with_eigenpairs(mut self, eigenpairs: usize) -> Self {
        self.eigenpairs = eigenpairs;
        self
    }

    pub fn validate(&self) -> HksResult<()> {
        if self.eigenpairs == 0 {
            return Err(HksError::InvalidArgument(
                "number of eigenpairs must be positive".to_string(),
            ));
        }
        if !self.shift.is_finite() {
            return Err(HksError::InvalidArgument(format!(
                "shift {} is not finite",
                self.shift
            )));
        }
        if !(self.tolerance > 0.0) || self.max_iterations == 0 {
            return Err(HksError::InvalidArgument(format!(
                "tolerance {} and iteration cap {} must be positive",
                self.tolerance, self.max_iterations
            )));
        }
        Ok(())
    }

    /// Solver parameters for `nev` pairs on an operator of order `size`.
    pub fn solver_params(&self, nev: usize, size: usize) -> SolverParams {
        SolverParams {
            nev,
            ncv: (2 * nev + 1).min(size),
            shift: self.shift,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            seed: self.seed,
        }
    }
}
