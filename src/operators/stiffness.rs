use indexmap::IndexMap;
use log::{debug, warn};
use rayon::prelude::*;

use crate::diagnostics::Diagnostics;
use crate::geometry::cotangent;
use crate::mesh::{HalfEdgeId, SurfaceMesh, VertexId};
use crate::operators::sparse::SparseOperator;

/// Undirected edge key with the smaller vertex first.
pub(crate) fn edge_key(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone)]
pub struct StiffnessMatrix {
    pub matrix: SparseOperator,
    pub diagnostics: Diagnostics,
}

/// Assemble the cotangent stiffness matrix `L` (positive semidefinite, zero row sums).
///
/// Each undirected edge weight `w_ij = (cot a + cot b) / 2` is computed once and shared by both
/// endpoint rows, so `L[i][j]` and `L[j][i]` are the same `f64`. Boundary half-edges carry no face
/// and contribute no cotangent term.
pub fn cotangent_matrix<M: SurfaceMesh>(mesh: &M) -> StiffnessMatrix {
    let n = mesh.vertex_count();

    let mut representatives: IndexMap<(VertexId, VertexId), HalfEdgeId> = IndexMap::new();
    for vertex in 0..n {
        for halfedge in mesh.halfedges_into(vertex) {
            representatives
                .entry(edge_key(mesh.source(halfedge), vertex))
                .or_insert(halfedge);
        }
    }
    let representatives: Vec<_> = representatives.into_iter().collect();

    let evaluated: Vec<((VertexId, VertexId), f64, usize)> = representatives
        .par_iter()
        .map(|&(key, halfedge)| {
            let (weight, degenerate) = edge_weight(mesh, halfedge);
            (key, weight, degenerate)
        })
        .collect();

    let degenerate: usize = evaluated.iter().map(|(_, _, d)| d).sum();
    if degenerate > 0 {
        warn!(
            "{} cotangent terms from degenerate triangles were set to zero",
            degenerate
        );
    }
    let weights: IndexMap<(VertexId, VertexId), f64> = evaluated
        .into_iter()
        .map(|(key, weight, _)| (key, weight))
        .collect();

    let rows: Vec<Vec<(usize, usize, f64)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let mut entries = Vec::new();
            let mut row_sum = 0.0;
            for halfedge in mesh.halfedges_into(i) {
                let j = mesh.source(halfedge);
                let weight = weights[&edge_key(i, j)];
                entries.push((i, j, -weight));
                row_sum += weight;
            }
            entries.push((i, i, row_sum));
            entries
        })
        .collect();

    debug!("stiffness matrix: {} vertices, {} edges", n, weights.len());
    StiffnessMatrix {
        matrix: SparseOperator::from_triplets(n, rows.into_iter().flatten()),
        diagnostics: Diagnostics {
            degenerate_contributions: degenerate,
            ..Diagnostics::default()
        },
    }
}

fn edge_weight<M: SurfaceMesh>(mesh: &M, halfedge: HalfEdgeId) -> (f64, usize) {
    let i = mesh.target(halfedge);
    let j = mesh.source(halfedge);
    let pi = mesh.position(i);
    let pj = mesh.position(j);

    let mut cot_sum = 0.0;
    let mut degenerate = 0;
    for side in [halfedge, mesh.opposite(halfedge)] {
        if mesh.is_boundary(side) {
            continue;
        }
        let apex = mesh.target(mesh.next(side));
        match cotangent(&pi, &mesh.position(apex), &pj) {
            Some(cot) => cot_sum += cot,
            None => {
                debug!("degenerate triangle ({}, {}, {}): cotangent set to zero", i, apex, j);
                degenerate += 1;
            }
        }
    }
    (0.5 * cot_sum, degenerate)
}
