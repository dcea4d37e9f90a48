//! Symmetric shift-invert eigensolver.
//!
//! Finds the `nev` eigenvalues of a symmetric `A` closest to a shift `σ` by iterating on
//! `(A - σI)^{-1}`, whose largest-magnitude eigenvalues `θ` map back to `λ = σ + 1/θ`. The inner
//! iteration keeps an `ncv`-column orthonormal block and extracts Ritz pairs by Rayleigh-Ritz
//! projection after every application of the inverse, so repeated eigenvalues are resolved.
//! The inverse is applied through a sparse `LDLᵀ` factorization of the shifted operator.

use std::cmp::Ordering;

use log::{debug, warn};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use sprs_ldl::{Ldl, LdlNumeric};

use crate::error::{HksError, HksResult};
use crate::operators::SparseOperator;

/// The factorized shift is `σ - δ` with `δ = SHIFT_REGULARIZATION * mean|diag(A)|`, keeping the
/// factorization away from an exactly singular operator.
const SHIFT_REGULARIZATION: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverParams {
    /// Number of eigenpairs requested.
    pub nev: usize,
    /// Subspace (block) size, `nev <= ncv <= n`.
    pub ncv: usize,
    pub shift: f64,
    pub max_iterations: usize,
    /// Relative residual tolerance on the transformed problem.
    pub tolerance: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Successful,
    NotConverging,
    NumericalIssue,
}

#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub status: SolverStatus,
    pub iterations: usize,
    /// Converged eigenvalues, ascending.
    pub eigenvalues: DVector<f64>,
    /// Unit eigenvectors, one column per converged eigenvalue.
    pub eigenvectors: DMatrix<f64>,
}

impl SolverOutcome {
    pub fn converged(&self) -> usize {
        self.eigenvalues.len()
    }

    fn failed(size: usize, iterations: usize) -> Self {
        Self {
            status: SolverStatus::NumericalIssue,
            iterations,
            eigenvalues: DVector::zeros(0),
            eigenvectors: DMatrix::zeros(size, 0),
        }
    }
}

pub struct ShiftInvertSolver {
    params: SolverParams,
}

impl ShiftInvertSolver {
    pub fn new(params: SolverParams) -> HksResult<Self> {
        if params.nev == 0 {
            return Err(HksError::InvalidArgument(
                "at least one eigenpair must be requested".to_string(),
            ));
        }
        if params.ncv < params.nev {
            return Err(HksError::InvalidArgument(format!(
                "subspace size {} is smaller than the requested {} eigenpairs",
                params.ncv, params.nev
            )));
        }
        if !(params.tolerance > 0.0) || params.max_iterations == 0 {
            return Err(HksError::InvalidArgument(format!(
                "tolerance {} and iteration cap {} must be positive",
                params.tolerance, params.max_iterations
            )));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    pub fn compute(&self, operator: &SparseOperator) -> HksResult<SolverOutcome> {
        let n = operator.size();
        let SolverParams {
            nev,
            ncv,
            shift,
            max_iterations,
            tolerance,
            seed,
        } = self.params;
        if ncv > n {
            return Err(HksError::InvalidArgument(format!(
                "subspace size {ncv} exceeds operator order {n}"
            )));
        }
        if operator.triplets().any(|(_, _, v)| !v.is_finite()) {
            warn!("operator has non-finite entries");
            return Ok(SolverOutcome::failed(n, 0));
        }
        if ncv == n {
            return Ok(Self::full_space(operator.to_dense(), nev, shift));
        }

        let diagonal = operator.diagonal();
        let mean_diag = diagonal.iter().map(|d| d.abs()).sum::<f64>() / n.max(1) as f64;
        let sigma = shift - SHIFT_REGULARIZATION * mean_diag;

        let Some(factorization) = ShiftedFactorization::new(operator, sigma) else {
            warn!("shifted operator (sigma = {sigma:e}) is singular");
            return Ok(SolverOutcome::failed(n, 0));
        };

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let start = DMatrix::from_fn(n, ncv, |_, _| rng.gen_range(-1.0f64..1.0f64));
        let mut basis = start.qr().q();

        let mut last = RitzPairs::empty(n);
        for iteration in 1..=max_iterations {
            let Some(image) = factorization.solve(&basis) else {
                return Ok(SolverOutcome::failed(n, iteration));
            };

            let projected = basis.transpose() * &image;
            let projected = (&projected + projected.transpose()) * 0.5;
            let eigen = SymmetricEigen::new(projected);
            if eigen.eigenvalues.iter().any(|t| !t.is_finite()) {
                return Ok(SolverOutcome::failed(n, iteration));
            }

            let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
            order.sort_by(|&a, &b| {
                eigen.eigenvalues[b]
                    .abs()
                    .partial_cmp(&eigen.eigenvalues[a].abs())
                    .unwrap_or(Ordering::Equal)
            });

            let ritz_vectors = &basis * &eigen.eigenvectors;
            let images = &image * &eigen.eigenvectors;
            let mut pairs = RitzPairs::empty(n);
            for &idx in order.iter().take(nev) {
                let theta = eigen.eigenvalues[idx];
                let residual = (images.column(idx) - ritz_vectors.column(idx) * theta).norm();
                if theta != 0.0 && residual <= tolerance * theta.abs() {
                    pairs.push(sigma + 1.0 / theta, ritz_vectors.column(idx).into_owned());
                }
            }

            if pairs.len() >= nev {
                debug!("shift-invert iteration converged after {iteration} steps");
                return Ok(pairs.into_outcome(SolverStatus::Successful, iteration));
            }
            last = pairs;
            basis = image.qr().q();
        }

        debug!(
            "shift-invert iteration stopped after {max_iterations} steps with {}/{nev} pairs",
            last.len()
        );
        Ok(last.into_outcome(SolverStatus::NotConverging, max_iterations))
    }

    /// A subspace spanning the whole space makes the iteration exact, so the dense problem is
    /// solved directly and the `nev` eigenvalues nearest the shift are kept.
    fn full_space(dense: DMatrix<f64>, nev: usize, shift: f64) -> SolverOutcome {
        let n = dense.nrows();
        let eigen = SymmetricEigen::new(dense);
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            (eigen.eigenvalues[a] - shift)
                .abs()
                .partial_cmp(&(eigen.eigenvalues[b] - shift).abs())
                .unwrap_or(Ordering::Equal)
        });
        let mut pairs = RitzPairs::empty(n);
        for &idx in order.iter().take(nev) {
            pairs.push(eigen.eigenvalues[idx], eigen.eigenvectors.column(idx).into_owned());
        }
        debug!("subspace spans all {n} dimensions; solved the dense problem directly");
        pairs.into_outcome(SolverStatus::Successful, 1)
    }
}

/// Sparse `LDLᵀ` factors of `A - σI`, reordered by reverse Cuthill-McKee.
struct ShiftedFactorization {
    size: usize,
    factors: LdlNumeric<f64, usize>,
}

impl ShiftedFactorization {
    fn new(operator: &SparseOperator, sigma: f64) -> Option<Self> {
        let shifted = operator.shifted(sigma);
        match Ldl::new().numeric(shifted.as_csr().view()) {
            Ok(factors) => Some(Self {
                size: shifted.size(),
                factors,
            }),
            Err(err) => {
                debug!("LDL factorization of the shifted operator failed: {err:?}");
                None
            }
        }
    }

    fn solve(&self, rhs: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        let columns: Vec<Vec<f64>> = (0..rhs.ncols())
            .into_par_iter()
            .map(|j| {
                let column: Vec<f64> = rhs.column(j).iter().copied().collect();
                self.factors.solve(&column)
            })
            .collect();
        let solution = DMatrix::from_fn(self.size, columns.len(), |i, j| columns[j][i]);
        solution.iter().all(|v| v.is_finite()).then_some(solution)
    }
}

struct RitzPairs {
    size: usize,
    values: Vec<f64>,
    vectors: Vec<DVector<f64>>,
}

impl RitzPairs {
    fn empty(size: usize) -> Self {
        Self {
            size,
            values: Vec::new(),
            vectors: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn push(&mut self, value: f64, vector: DVector<f64>) {
        self.values.push(value);
        self.vectors.push(vector);
    }

    fn into_outcome(self, status: SolverStatus, iterations: usize) -> SolverOutcome {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| {
            self.values[a]
                .partial_cmp(&self.values[b])
                .unwrap_or(Ordering::Equal)
        });
        let eigenvalues =
            DVector::from_iterator(order.len(), order.iter().map(|&i| self.values[i]));
        let mut eigenvectors = DMatrix::zeros(self.size, order.len());
        for (column, &i) in order.iter().enumerate() {
            eigenvectors.set_column(column, &self.vectors[i]);
        }
        SolverOutcome {
            status,
            iterations,
            eigenvalues,
            eigenvectors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn path_laplacian(n: usize) -> SparseOperator {
        let mut triplets = Vec::new();
        for i in 0..n {
            let mut degree = 0.0;
            if i > 0 {
                triplets.push((i, i - 1, -1.0));
                degree += 1.0;
            }
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
                degree += 1.0;
            }
            triplets.push((i, i, degree));
        }
        SparseOperator::from_triplets(n, triplets)
    }

    fn params(nev: usize, n: usize) -> SolverParams {
        SolverParams {
            nev,
            ncv: (2 * nev + 1).min(n),
            shift: 0.0,
            max_iterations: 1000,
            tolerance: 1e-10,
            seed: 42,
        }
    }

    #[test]
    fn path_graph_spectrum_matches_closed_form() {
        let n = 30;
        let solver = ShiftInvertSolver::new(params(5, n)).expect("solver");
        let outcome = solver.compute(&path_laplacian(n)).expect("outcome");
        assert_eq!(outcome.status, SolverStatus::Successful);
        assert_eq!(outcome.converged(), 5);
        for (k, value) in outcome.eigenvalues.iter().enumerate() {
            let expected = 2.0 - 2.0 * (std::f64::consts::PI * k as f64 / n as f64).cos();
            assert_relative_eq!(*value, expected, epsilon = 1e-8);
        }
    }

    #[test]
    fn long_path_graph_is_solved_through_sparse_factors() {
        let n = 4000;
        let op = path_laplacian(n);
        let outcome = ShiftInvertSolver::new(params(3, n))
            .expect("solver")
            .compute(&op)
            .expect("outcome");
        assert_eq!(outcome.status, SolverStatus::Successful);
        assert_eq!(outcome.eigenvectors.shape(), (n, 3));
        for (k, value) in outcome.eigenvalues.iter().enumerate() {
            let expected = 2.0 - 2.0 * (std::f64::consts::PI * k as f64 / n as f64).cos();
            assert_relative_eq!(*value, expected, epsilon = 1e-12, max_relative = 1e-6);
            let v = outcome.eigenvectors.column(k);
            let column: Vec<f64> = v.iter().copied().collect();
            let image = DVector::from_vec(op.mul_vec(&column));
            assert!((image - v * *value).norm() < 1e-8);
        }
    }

    #[test]
    fn eigenvectors_are_orthonormal_and_satisfy_the_operator() {
        let n = 20;
        let op = path_laplacian(n);
        let outcome = ShiftInvertSolver::new(params(4, n))
            .expect("solver")
            .compute(&op)
            .expect("outcome");
        let gram = outcome.eigenvectors.transpose() * &outcome.eigenvectors;
        assert_relative_eq!(gram, DMatrix::identity(4, 4), epsilon = 1e-9);
        let dense = op.to_dense();
        for (k, value) in outcome.eigenvalues.iter().enumerate() {
            let v = outcome.eigenvectors.column(k);
            let residual = (&dense * v - v * *value).norm();
            assert!(residual < 1e-7, "residual {residual}");
        }
    }

    #[test]
    fn full_subspace_resolves_every_eigenvalue() {
        let n = 6;
        let outcome = ShiftInvertSolver::new(SolverParams {
            ncv: n,
            ..params(n, n)
        })
        .expect("solver")
        .compute(&path_laplacian(n))
        .expect("outcome");
        assert_eq!(outcome.converged(), n);
        for pair in outcome.eigenvalues.as_slice().windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(ShiftInvertSolver::new(SolverParams { nev: 0, ..params(1, 4) }).is_err());
        assert!(ShiftInvertSolver::new(SolverParams { ncv: 1, ..params(3, 10) }).is_err());
        let solver = ShiftInvertSolver::new(params(3, 10)).expect("solver");
        assert!(matches!(
            solver.compute(&path_laplacian(4)),
            Err(HksError::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_operator_reports_numerical_issue() {
        let op = SparseOperator::from_triplets(5, Vec::new());
        let outcome = ShiftInvertSolver::new(params(1, 5))
            .expect("solver")
            .compute(&op)
            .expect("outcome");
        assert_eq!(outcome.status, SolverStatus::NumericalIssue);
        assert_eq!(outcome.converged(), 0);
    }
}
