use std::time::Instant;

use log::{info, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::eigen::solver::{ShiftInvertSolver, SolverStatus};
use crate::eigen::SpectralConfig;
use crate::error::{HksError, HksResult};
use crate::mesh::SurfaceMesh;
use crate::operators::LaplaceBeltrami;

/// Eigenpairs of `L x = λ M x`: ascending eigenvalues and one eigenfunction column per eigenvalue,
/// one row per vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenDecomposition {
    eigenvalues: DVector<f64>,
    eigenfunctions: DMatrix<f64>,
}

/// A freshly computed spectrum together with what happened while computing it.
#[derive(Debug, Clone)]
pub struct SpectrumReport {
    pub spectrum: EigenDecomposition,
    pub diagnostics: Diagnostics,
    pub status: SolverStatus,
    pub iterations: usize,
    /// Eigenpairs asked for after clamping to the vertex count.
    pub requested: usize,
}

impl EigenDecomposition {
    /// Assemble the operators of `mesh` and decompose them.
    pub fn compute<M: SurfaceMesh>(mesh: &M, config: &SpectralConfig) -> HksResult<SpectrumReport> {
        config.validate()?;
        let operators = LaplaceBeltrami::build(mesh, config.area)?;
        Self::from_operators(&operators, config)
    }

    /// Smallest-magnitude eigenpairs of the mass-normalized operator, back-transformed to the
    /// generalized problem.
    ///
    /// # Panics
    ///
    /// With `enforce_spectral_gap`, panics when the second eigenvalue is not strictly positive or
    /// the third is not strictly greater than the second.
    pub fn from_operators(
        operators: &LaplaceBeltrami,
        config: &SpectralConfig,
    ) -> HksResult<SpectrumReport> {
        config.validate()?;
        let n = operators.size();
        if n == 0 {
            return Err(HksError::InvalidArgument(
                "cannot decompose an empty operator".to_string(),
            ));
        }

        let mut diagnostics = operators.diagnostics;
        let mut requested = config.eigenpairs;
        if requested > n {
            warn!(
                "requested {} eigenpairs but the mesh has only {} vertices; clamping",
                requested, n
            );
            diagnostics.clamped_eigenpairs += requested - n;
            requested = n;
        }

        let start = Instant::now();
        let solver = ShiftInvertSolver::new(config.solver_params(requested, n))?;
        let outcome = solver.compute(&operators.symmetrized.matrix)?;
        if outcome.status == SolverStatus::NumericalIssue {
            return Err(HksError::SolverFailure(format!(
                "numerical breakdown after {} iterations",
                outcome.iterations
            )));
        }
        if outcome.converged() == 0 {
            return Err(HksError::SolverFailure(format!(
                "no eigenpair converged within {} iterations",
                outcome.iterations
            )));
        }
        if outcome.converged() < requested {
            warn!(
                "only {} of {} eigenpairs converged; continuing with the converged subset",
                outcome.converged(),
                requested
            );
            diagnostics.unconverged_eigenpairs += requested - outcome.converged();
        }

        if config.enforce_spectral_gap {
            assert_spectral_gap(outcome.eigenvalues.as_slice());
        }

        let eigenfunctions = operators.symmetrized.back_transform(&outcome.eigenvectors);
        info!(
            "eigen-decomposition: {}/{} pairs in {} iterations ({:.2?})",
            outcome.converged(),
            requested,
            outcome.iterations,
            start.elapsed()
        );

        Ok(SpectrumReport {
            spectrum: Self {
                eigenvalues: outcome.eigenvalues,
                eigenfunctions,
            },
            diagnostics,
            status: outcome.status,
            iterations: outcome.iterations,
            requested,
        })
    }

    /// Wrap a pre-computed spectrum, checked against the vertex count of the mesh it belongs to.
    pub fn from_parts(
        eigenvalues: DVector<f64>,
        eigenfunctions: DMatrix<f64>,
        vertex_count: usize,
    ) -> HksResult<Self> {
        if eigenfunctions.nrows() != vertex_count {
            return Err(HksError::DimensionMismatch(format!(
                "eigenfunctions have {} rows but the mesh has {} vertices",
                eigenfunctions.nrows(),
                vertex_count
            )));
        }
        if eigenfunctions.ncols() != eigenvalues.len() {
            return Err(HksError::DimensionMismatch(format!(
                "{} eigenvalues but {} eigenfunctions",
                eigenvalues.len(),
                eigenfunctions.ncols()
            )));
        }
        if eigenvalues.is_empty() {
            return Err(HksError::InvalidArgument(
                "a spectrum needs at least one eigenpair".to_string(),
            ));
        }
        if eigenvalues.iter().chain(eigenfunctions.iter()).any(|v| !v.is_finite()) {
            return Err(HksError::InvalidArgument(
                "spectrum contains non-finite values".to_string(),
            ));
        }
        if eigenvalues.as_slice().windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(HksError::InvalidArgument(
                "eigenvalues must be in ascending order".to_string(),
            ));
        }
        Ok(Self {
            eigenvalues,
            eigenfunctions,
        })
    }

    pub fn into_parts(self) -> (DVector<f64>, DMatrix<f64>) {
        (self.eigenvalues, self.eigenfunctions)
    }

    pub fn eigenvalues(&self) -> &DVector<f64> {
        &self.eigenvalues
    }

    pub fn eigenfunctions(&self) -> &DMatrix<f64> {
        &self.eigenfunctions
    }

    pub fn len(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eigenvalues.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.eigenfunctions.nrows()
    }

    /// The first `k` eigenpairs; `k` beyond the stored count keeps everything.
    pub fn truncated(&self, k: usize) -> HksResult<Self> {
        if k == 0 {
            return Err(HksError::InvalidArgument(
                "cannot truncate a spectrum to zero eigenpairs".to_string(),
            ));
        }
        let k = k.min(self.len());
        Ok(Self {
            eigenvalues: self.eigenvalues.rows(0, k).into_owned(),
            eigenfunctions: self.eigenfunctions.columns(0, k).into_owned(),
        })
    }
}

/// Differences below this fraction of the largest eigenvalue magnitude count as rounding noise.
const GAP_NOISE_FLOOR: f64 = 1e-10;

/// Second eigenvalue strictly positive and third strictly above the second, for whichever of
/// those indices exist. Both comparisons are made against a noise floor scaled by the largest
/// magnitude in `eigenvalues`.
pub fn assert_spectral_gap(eigenvalues: &[f64]) {
    let scale = eigenvalues.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    let floor = GAP_NOISE_FLOOR * scale;
    if let Some(&second) = eigenvalues.get(1) {
        assert!(
            second > floor,
            "second eigenvalue {second:e} is not strictly positive (noise floor {floor:e})"
        );
        if let Some(&third) = eigenvalues.get(2) {
            assert!(
                third - second > floor,
                "third eigenvalue {third:e} does not exceed the second {second:e}"
            );
        }
    }
}
