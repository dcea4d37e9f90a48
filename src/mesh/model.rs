use nalgebra::Point3;
use serde::{Deserialize, Serialize};

pub type VertexId = usize;
pub type HalfEdgeId = usize;
pub type FaceId = usize;

/// Traversal primitives the operator builder needs from a triangulated surface.
///
/// Vertex ids are dense and zero-based; they double as matrix row/column indices. Incoming and
/// outgoing enumeration must visit every incident half-edge exactly once, boundary half-edges
/// included.
pub trait SurfaceMesh: Sync {
    fn vertex_count(&self) -> usize;
    fn face_count(&self) -> usize;
    fn position(&self, vertex: VertexId) -> Point3<f64>;
    fn halfedges_into(&self, vertex: VertexId) -> impl Iterator<Item = HalfEdgeId> + '_;
    fn halfedges_out_of(&self, vertex: VertexId) -> impl Iterator<Item = HalfEdgeId> + '_;
    fn source(&self, halfedge: HalfEdgeId) -> VertexId;
    fn target(&self, halfedge: HalfEdgeId) -> VertexId;
    fn next(&self, halfedge: HalfEdgeId) -> HalfEdgeId;
    fn opposite(&self, halfedge: HalfEdgeId) -> HalfEdgeId;
    fn is_boundary(&self, halfedge: HalfEdgeId) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge {
    pub source: VertexId,
    pub target: VertexId,
    pub next: HalfEdgeId,
    pub opposite: HalfEdgeId,
    /// `None` marks a boundary half-edge.
    pub face: Option<FaceId>,
}

/// Index-based half-edge mesh. Built by [`crate::mesh::MeshLoader`].
#[derive(Debug, Clone)]
pub struct HalfEdgeMesh {
    pub(crate) positions: Vec<Point3<f64>>,
    pub(crate) faces: Vec<[VertexId; 3]>,
    pub(crate) halfedges: Vec<HalfEdge>,
    pub(crate) incoming: Vec<Vec<HalfEdgeId>>,
    pub(crate) outgoing: Vec<Vec<HalfEdgeId>>,
}

impl HalfEdgeMesh {
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn faces(&self) -> &[[VertexId; 3]] {
        &self.faces
    }

    pub fn halfedge(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.halfedges[id]
    }

    pub fn halfedge_count(&self) -> usize {
        self.halfedges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.halfedges.len() / 2
    }

    pub fn is_closed(&self) -> bool {
        self.halfedges.iter().all(|h| h.face.is_some())
    }

    pub fn surface_area(&self) -> f64 {
        self.faces
            .iter()
            .map(|&[a, b, c]| {
                crate::geometry::triangle_area(
                    &self.positions[a],
                    &self.positions[b],
                    &self.positions[c],
                )
            })
            .sum()
    }

    /// Uniformly rescale every vertex position about the origin.
    pub fn scaled(&self, factor: f64) -> Self {
        let mut mesh = self.clone();
        for p in &mut mesh.positions {
            *p = Point3::from(p.coords * factor);
        }
        mesh
    }

    pub fn to_raw(&self) -> RawMesh {
        RawMesh {
            vertices: self.positions.iter().map(|p| [p.x, p.y, p.z]).collect(),
            faces: self.faces.clone(),
        }
    }
}

impl SurfaceMesh for HalfEdgeMesh {
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn position(&self, vertex: VertexId) -> Point3<f64> {
        self.positions[vertex]
    }

    fn halfedges_into(&self, vertex: VertexId) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.incoming[vertex].iter().copied()
    }

    fn halfedges_out_of(&self, vertex: VertexId) -> impl Iterator<Item = HalfEdgeId> + '_ {
        self.outgoing[vertex].iter().copied()
    }

    fn source(&self, halfedge: HalfEdgeId) -> VertexId {
        self.halfedges[halfedge].source
    }

    fn target(&self, halfedge: HalfEdgeId) -> VertexId {
        self.halfedges[halfedge].target
    }

    fn next(&self, halfedge: HalfEdgeId) -> HalfEdgeId {
        self.halfedges[halfedge].next
    }

    fn opposite(&self, halfedge: HalfEdgeId) -> HalfEdgeId {
        self.halfedges[halfedge].opposite
    }

    fn is_boundary(&self, halfedge: HalfEdgeId) -> bool {
        self.halfedges[halfedge].face.is_none()
    }
}

/// Serde mirror of a face-vertex triangle list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMesh {
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<[usize; 3]>,
}
