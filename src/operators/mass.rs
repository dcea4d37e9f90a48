use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::geometry::{circumcenter, is_obtuse_at, midpoint, triangle_area};
use crate::mesh::{SurfaceMesh, VertexId};
use crate::operators::sparse::SparseOperator;

/// How a triangle's area is split among its corners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexArea {
    Barycentric,
    Voronoi,
    #[default]
    MixedVoronoi,
}

impl VertexArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            VertexArea::Barycentric => "barycentric",
            VertexArea::Voronoi => "voronoi",
            VertexArea::MixedVoronoi => "mixed_voronoi",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MassMatrix {
    pub matrix: SparseOperator,
    pub areas: Vec<f64>,
    pub diagnostics: Diagnostics,
}

/// Diagonal mass matrix `M[i][i] = area(i)`.
///
/// The plain Voronoi split is signed on obtuse triangles; a vertex whose total comes out negative
/// is clamped to zero and reported together with zero-area vertices.
pub fn mass_matrix<M: SurfaceMesh>(mesh: &M, method: VertexArea) -> MassMatrix {
    let evaluated: Vec<(f64, usize)> = (0..mesh.vertex_count())
        .into_par_iter()
        .map(|v| vertex_area(mesh, v, method))
        .collect();

    let degenerate: usize = evaluated.iter().map(|(_, d)| d).sum();
    if degenerate > 0 {
        warn!(
            "{} {} area terms from degenerate triangles were set to zero",
            degenerate,
            method.as_str()
        );
    }

    let mut zero_area = 0;
    let areas: Vec<f64> = evaluated
        .into_iter()
        .enumerate()
        .map(|(v, (area, _))| {
            if area > 0.0 {
                return area;
            }
            debug!("vertex {} has non-positive {} area {}", v, method.as_str(), area);
            zero_area += 1;
            0.0
        })
        .collect();
    if zero_area > 0 {
        warn!("{} vertices have zero {} area", zero_area, method.as_str());
    }

    MassMatrix {
        matrix: SparseOperator::diagonal_from(&areas),
        areas,
        diagnostics: Diagnostics {
            degenerate_contributions: degenerate,
            zero_area_vertices: zero_area,
            ..Diagnostics::default()
        },
    }
}

/// Area attributed to `vertex`, plus the number of incident triangles skipped as degenerate.
///
/// Each incident face is visited through its half-edge `p1 -> p2` into the vertex (`p2`), with
/// `p3` the face's remaining corner.
pub fn vertex_area<M: SurfaceMesh>(
    mesh: &M,
    vertex: VertexId,
    method: VertexArea,
) -> (f64, usize) {
    let p2 = mesh.position(vertex);
    let mut area = 0.0;
    let mut degenerate = 0;

    for halfedge in mesh.halfedges_into(vertex) {
        if mesh.is_boundary(halfedge) {
            continue;
        }
        let p1 = mesh.position(mesh.source(halfedge));
        let p3 = mesh.position(mesh.target(mesh.next(halfedge)));

        match method {
            VertexArea::Barycentric => area += triangle_area(&p1, &p2, &p3),
            VertexArea::Voronoi => {
                let Some(center) = circumcenter(&p1, &p2, &p3) else {
                    degenerate += 1;
                    continue;
                };
                let near = triangle_area(&midpoint(&p2, &p1), &p2, &center);
                let far = triangle_area(&midpoint(&p2, &p3), &center, &p2);
                area += if is_obtuse_at(&p2, &p1, &p3) {
                    near - far
                } else if is_obtuse_at(&p2, &p3, &p1) {
                    far - near
                } else {
                    near + far
                };
            }
            VertexArea::MixedVoronoi => {
                if is_obtuse_at(&p1, &p2, &p3) {
                    area += 0.5 * triangle_area(&p1, &p2, &p3);
                } else if is_obtuse_at(&p2, &p1, &p3) || is_obtuse_at(&p1, &p3, &p2) {
                    area += 0.25 * triangle_area(&p1, &p2, &p3);
                } else {
                    let Some(center) = circumcenter(&p1, &p2, &p3) else {
                        degenerate += 1;
                        continue;
                    };
                    area += triangle_area(&midpoint(&p2, &p1), &p2, &center)
                        + triangle_area(&midpoint(&p2, &p3), &center, &p2);
                }
            }
        }
    }

    if method == VertexArea::Barycentric {
        area /= 3.0;
    }
    (area, degenerate)
}
