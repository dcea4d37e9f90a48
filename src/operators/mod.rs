pub mod mass;
pub mod sparse;
pub mod stiffness;
pub mod symmetrize;

use log::info;

use crate::diagnostics::Diagnostics;
use crate::error::HksResult;
use crate::mesh::SurfaceMesh;

pub use mass::{mass_matrix, vertex_area, MassMatrix, VertexArea};
pub use sparse::SparseOperator;
pub use stiffness::{cotangent_matrix, StiffnessMatrix};
pub use symmetrize::SymmetrizedOperator;

/// Stiffness, mass and mass-normalized operators of one mesh.
#[derive(Debug, Clone)]
pub struct LaplaceBeltrami {
    pub stiffness: SparseOperator,
    pub mass: SparseOperator,
    pub symmetrized: SymmetrizedOperator,
    pub diagnostics: Diagnostics,
}

impl LaplaceBeltrami {
    pub fn build<M: SurfaceMesh>(mesh: &M, area: VertexArea) -> HksResult<Self> {
        let stiffness = cotangent_matrix(mesh);
        let mass = mass_matrix(mesh, area);
        let symmetrized = SymmetrizedOperator::new(&stiffness.matrix, &mass.matrix)?;
        let diagnostics = stiffness.diagnostics.combine(mass.diagnostics);
        info!(
            "operators assembled: {} vertices, {} stiffness entries, {} area weighting",
            mesh.vertex_count(),
            stiffness.matrix.nnz(),
            area.as_str()
        );
        Ok(Self {
            stiffness: stiffness.matrix,
            mass: mass.matrix,
            symmetrized,
            diagnostics,
        })
    }

    pub fn size(&self) -> usize {
        self.stiffness.size()
    }
}
