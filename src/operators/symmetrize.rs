use nalgebra::DMatrix;

use crate::error::{HksError, HksResult};
use crate::operators::sparse::SparseOperator;

/// `L_sym = S L S` with `S = M^{-1/2}`, together with `S` for the back-transform `x = S y`.
#[derive(Debug, Clone)]
pub struct SymmetrizedOperator {
    pub matrix: SparseOperator,
    pub inv_sqrt_mass: Vec<f64>,
}

impl SymmetrizedOperator {
    /// Turn the generalized problem `L x = λ M x` into the standard problem `L_sym y = λ y`.
    ///
    /// A zero mass entry maps to a zero scale, removing that vertex from the normalized operator.
    pub fn new(stiffness: &SparseOperator, mass: &SparseOperator) -> HksResult<Self> {
        if stiffness.size() != mass.size() {
            return Err(HksError::DimensionMismatch(format!(
                "stiffness is {0}x{0} but mass is {1}x{1}",
                stiffness.size(),
                mass.size()
            )));
        }
        let inv_sqrt_mass: Vec<f64> = mass
            .diagonal()
            .into_iter()
            .map(|m| if m > 0.0 { 1.0 / m.sqrt() } else { 0.0 })
            .collect();
        Ok(Self {
            matrix: stiffness.congruent_scaled(&inv_sqrt_mass),
            inv_sqrt_mass,
        })
    }

    pub fn size(&self) -> usize {
        self.matrix.size()
    }

    /// Map eigenvectors `y` of `L_sym` (columns) to eigenfunctions `x = S y` of the generalized
    /// problem.
    pub fn back_transform(&self, vectors: &DMatrix<f64>) -> DMatrix<f64> {
        let mut functions = vectors.clone();
        for (mut row, scale) in functions.row_iter_mut().zip(&self.inv_sqrt_mass) {
            row *= *scale;
        }
        functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Primitives;
    use crate::operators::{cotangent_matrix, mass_matrix, VertexArea};

    #[test]
    fn symmetrized_operator_stays_bitwise_symmetric() {
        let mesh = Primitives::ellipsoid(1, [1.0, 1.4, 0.7]);
        let stiffness = cotangent_matrix(&mesh).matrix;
        let mass = mass_matrix(&mesh, VertexArea::MixedVoronoi).matrix;
        let sym = SymmetrizedOperator::new(&stiffness, &mass).expect("symmetrize");
        assert!(sym.matrix.is_symmetric());
        assert_eq!(sym.matrix.nnz(), stiffness.nnz());
    }

    #[test]
    fn zero_mass_maps_to_zero_scale() {
        let stiffness = SparseOperator::from_triplets(
            2,
            vec![(0, 0, 1.0), (0, 1, -1.0), (1, 0, -1.0), (1, 1, 1.0)],
        );
        let mass = SparseOperator::diagonal_from(&[4.0, 0.0]);
        let sym = SymmetrizedOperator::new(&stiffness, &mass).expect("symmetrize");
        assert_eq!(sym.inv_sqrt_mass, vec![0.5, 0.0]);
        assert_eq!(sym.matrix.get(0, 0), 0.25);
        assert_eq!(sym.matrix.get(0, 1), 0.0);
        assert_eq!(sym.matrix.get(1, 1), 0.0);
        let back = sym.back_transform(&DMatrix::from_element(2, 1, 2.0));
        assert_eq!(back[(0, 0)], 1.0);
        assert_eq!(back[(1, 0)], 0.0);
    }

    #[test]
    fn mismatched_sizes_are_rejected() {
        let stiffness = SparseOperator::diagonal_from(&[1.0, 1.0]);
        let mass = SparseOperator::diagonal_from(&[1.0]);
        assert!(matches!(
            SymmetrizedOperator::new(&stiffness, &mass),
            Err(HksError::DimensionMismatch(_))
        ));
    }
}
