use nalgebra::DMatrix;
use rayon::prelude::*;
use sprs::{CsMat, TriMat};

/// Square sparse matrix in CSR form, assembled from `(row, col, value)` triplets.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseOperator {
    matrix: CsMat<f64>,
}

impl SparseOperator {
    /// Duplicate `(row, col)` triplets are summed.
    pub fn from_triplets<I>(size: usize, triplets: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut tri = TriMat::new((size, size));
        for (row, col, value) in triplets {
            tri.add_triplet(row, col, value);
        }
        Self {
            matrix: tri.to_csr(),
        }
    }

    pub fn diagonal_from(values: &[f64]) -> Self {
        Self::from_triplets(
            values.len(),
            values.iter().enumerate().map(|(i, &v)| (i, i, v)),
        )
    }

    pub fn size(&self) -> usize {
        self.matrix.rows()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix.get(row, col).copied().unwrap_or(0.0)
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.size()).map(|i| self.get(i, i)).collect()
    }

    pub fn row_sums(&self) -> Vec<f64> {
        self.matrix
            .outer_iterator()
            .map(|row| row.iter().map(|(_, v)| *v).sum())
            .collect()
    }

    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.matrix
            .outer_iterator()
            .enumerate()
            .flat_map(|(row, entries)| {
                entries
                    .iter()
                    .map(|(col, &v)| (row, col, v))
                    .collect::<Vec<_>>()
            })
    }

    /// Bitwise symmetry, not symmetry up to rounding.
    pub fn is_symmetric(&self) -> bool {
        self.triplets()
            .all(|(row, col, value)| self.get(col, row).to_bits() == value.to_bits())
    }

    pub fn is_diagonal(&self) -> bool {
        self.triplets()
            .all(|(row, col, value)| row == col || value == 0.0)
    }

    /// `D A D` for the diagonal `D = diag(scale)`, each entry computed as `a_ij * (d_i * d_j)` so
    /// a bitwise-symmetric input stays bitwise symmetric.
    pub fn congruent_scaled(&self, scale: &[f64]) -> Self {
        debug_assert_eq!(scale.len(), self.size());
        Self::from_triplets(
            self.size(),
            self.triplets()
                .map(|(row, col, value)| (row, col, value * (scale[row] * scale[col]))),
        )
    }

    /// `A - σI`; the diagonal is stored explicitly even where `A` has no entry.
    pub fn shifted(&self, sigma: f64) -> Self {
        let n = self.size();
        Self::from_triplets(
            n,
            self.triplets().chain((0..n).map(|i| (i, i, -sigma))),
        )
    }

    pub fn mul_vec(&self, vector: &[f64]) -> Vec<f64> {
        (0..self.size())
            .into_par_iter()
            .map(|row| {
                self.matrix
                    .outer_view(row)
                    .map(|entries| entries.iter().map(|(col, v)| v * vector[col]).sum())
                    .unwrap_or(0.0)
            })
            .collect()
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.size();
        let mut dense = DMatrix::zeros(n, n);
        for (row, col, value) in self.triplets() {
            dense[(row, col)] += value;
        }
        dense
    }

    pub fn as_csr(&self) -> &CsMat<f64> {
        &self.matrix
    }
}
