pub mod serialization;

use std::f64::consts::LN_10;
use std::sync::Arc;

use log::{debug, warn};
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::eigen::{EigenDecomposition, SpectralConfig};
use crate::error::{HksError, HksResult};
use crate::mesh::SurfaceMesh;

pub use serialization::{DescriptorWriter, RawDescriptor};

/// Heat decay factor `c = 4 ln 10` of the automatic time range `[c / λ_max, c / λ_1]`.
pub const HEAT_DECAY: f64 = 4.0 * LN_10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DescriptorConfig {
    pub tscales: usize,
    /// Explicit range bounds; the range is derived from the spectrum unless both are positive.
    pub tmin: f64,
    pub tmax: f64,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            tscales: 100,
            tmin: 0.0,
            tmax: 0.0,
        }
    }
}

impl DescriptorConfig {
    pub fn new(tscales: usize, tmin: f64, tmax: f64) -> Self {
        Self { tscales, tmin, tmax }
    }

    pub fn validate(&self) -> HksResult<()> {
        if self.tscales == 0 {
            return Err(HksError::InvalidArgument(
                "at least one time scale is required".to_string(),
            ));
        }
        if !self.tmin.is_finite() || !self.tmax.is_finite() {
            return Err(HksError::InvalidArgument(format!(
                "time bounds [{}, {}] must be finite",
                self.tmin, self.tmax
            )));
        }
        if let Some((tmin, tmax)) = self.explicit_range() {
            if tmin >= tmax {
                return Err(HksError::InvalidArgument(format!(
                    "tmin {tmin} must be smaller than tmax {tmax}"
                )));
            }
        }
        Ok(())
    }

    pub fn explicit_range(&self) -> Option<(f64, f64)> {
        (self.tmin > 0.0 && self.tmax > 0.0).then_some((self.tmin, self.tmax))
    }

    /// Explicit bounds when given, otherwise `[c / λ_last, c / λ_1]`.
    pub fn resolve_range(&self, eigenvalues: &[f64]) -> HksResult<(f64, f64)> {
        self.validate()?;
        if let Some(range) = self.explicit_range() {
            return Ok(range);
        }
        let (Some(&first_nonzero), Some(&last)) = (eigenvalues.get(1), eigenvalues.last()) else {
            return Err(HksError::InvalidArgument(format!(
                "deriving the time range needs at least two eigenvalues, got {}",
                eigenvalues.len()
            )));
        };
        if !(first_nonzero > 0.0) {
            return Err(HksError::InvalidArgument(format!(
                "deriving the time range needs a positive second eigenvalue, got {first_nonzero:e}"
            )));
        }
        Ok((HEAT_DECAY / last, HEAT_DECAY / first_nonzero))
    }
}

/// `t_i = exp(log tmin + i (log tmax - log tmin) / tscales)` for `i` in `0..tscales`.
///
/// The last sample stays one logarithmic step below `tmax`.
pub fn time_samples(tmin: f64, tmax: f64, tscales: usize) -> Vec<f64> {
    let start = tmin.ln();
    let step = (tmax.ln() - start) / tscales as f64;
    (0..tscales)
        .map(|i| (start + i as f64 * step).exp())
        .collect()
}

/// Synthesizes heat kernel signatures from one shared spectrum.
#[derive(Debug, Clone)]
pub struct HeatKernelSignature {
    spectrum: Arc<EigenDecomposition>,
}

impl HeatKernelSignature {
    pub fn new(spectrum: impl Into<Arc<EigenDecomposition>>) -> Self {
        Self {
            spectrum: spectrum.into(),
        }
    }

    /// Decompose `mesh` and keep the spectrum for later synthesis calls.
    pub fn from_mesh<M: SurfaceMesh>(
        mesh: &M,
        config: &SpectralConfig,
    ) -> HksResult<(Self, Diagnostics)> {
        let report = EigenDecomposition::compute(mesh, config)?;
        Ok((Self::new(report.spectrum), report.diagnostics))
    }

    pub fn spectrum(&self) -> &EigenDecomposition {
        &self.spectrum
    }

    pub fn spectrum_arc(&self) -> Arc<EigenDecomposition> {
        Arc::clone(&self.spectrum)
    }

    /// `tscales x n` descriptor with `hks[i][v] = Σ_j exp(-λ_j t_i) φ_j(v)²`, each row normalized
    /// to sum to one.
    pub fn compute(&self, config: &DescriptorConfig) -> HksResult<HksDescriptor> {
        let eigenvalues = self.spectrum.eigenvalues().as_slice();
        let (tmin, tmax) = config.resolve_range(eigenvalues)?;
        let times = time_samples(tmin, tmax, config.tscales);
        debug!(
            "synthesizing {} time scales over [{:e}, {:e}] from {} eigenpairs",
            config.tscales,
            tmin,
            tmax,
            eigenvalues.len()
        );

        let n = self.spectrum.vertex_count();
        let squared: Vec<f64> = self
            .spectrum
            .eigenfunctions()
            .iter()
            .map(|value| value * value)
            .collect();

        let mut data = vec![0.0; config.tscales * n];
        data.par_chunks_mut(n.max(1))
            .zip(times.par_iter())
            .for_each(|(row, &t)| {
                for (j, lambda) in eigenvalues.iter().enumerate() {
                    let decay = (-lambda * t).exp();
                    let column = &squared[j * n..(j + 1) * n];
                    for (entry, phi) in row.iter_mut().zip(column) {
                        *entry += decay * phi;
                    }
                }
                let total: f64 = row.iter().sum();
                if total > 0.0 && total.is_finite() {
                    for entry in row.iter_mut() {
                        *entry /= total;
                    }
                } else {
                    warn!("heat kernel row at t = {t:e} has non-normalizable total {total:e}");
                }
            });

        let values = Array2::from_shape_vec((config.tscales, n), data)
            .map_err(|err| HksError::DimensionMismatch(err.to_string()))?;
        Ok(HksDescriptor { values, times })
    }
}

/// Heat kernel signatures of every vertex: one row per time sample, one column per vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HksDescriptor {
    values: Array2<f64>,
    times: Vec<f64>,
}

impl HksDescriptor {
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn time_samples(&self) -> &[f64] {
        &self.times
    }

    pub fn tscales(&self) -> usize {
        self.values.nrows()
    }

    pub fn vertex_count(&self) -> usize {
        self.values.ncols()
    }

    /// The multiscale signature of one vertex across all time samples.
    pub fn vertex_signature(&self, vertex: usize) -> Option<ArrayView1<'_, f64>> {
        (vertex < self.vertex_count()).then(|| self.values.column(vertex))
    }
}
