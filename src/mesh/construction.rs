use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use nalgebra::Point3;

use crate::error::{HksError, HksResult};
use crate::mesh::model::{HalfEdge, HalfEdgeId, HalfEdgeMesh, RawMesh, VertexId};

const UNLINKED: HalfEdgeId = usize::MAX;

/// Turns face-vertex triangle lists into [`HalfEdgeMesh`] instances.
#[derive(Debug, Default)]
pub struct MeshLoader;

impl MeshLoader {
    /// Parse the JSON mirror `{"vertices": [[x, y, z], ..], "faces": [[a, b, c], ..]}`.
    pub fn from_json_str(json: &str) -> Result<HalfEdgeMesh> {
        let raw: RawMesh = serde_json::from_str(json).context("deserialize raw mesh json")?;
        Ok(Self::from_raw(&raw)?)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<HalfEdgeMesh> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_json_str(&buf)
    }

    pub fn from_path(path: &Path) -> Result<HalfEdgeMesh> {
        let json = fs::read_to_string(path).with_context(|| format!("read mesh file {:?}", path))?;
        Self::from_json_str(&json).with_context(|| format!("build mesh from {:?}", path))
    }

    pub fn from_raw(raw: &RawMesh) -> HksResult<HalfEdgeMesh> {
        let positions = raw
            .vertices
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect();
        Self::from_triangles(positions, raw.faces.clone())
    }

    /// Link the half-edge structure of a consistently oriented manifold triangle list.
    ///
    /// Every interior half-edge gets its opposite; edges used by a single face get a boundary
    /// half-edge (no face) whose `next` follows the boundary loop.
    pub fn from_triangles(
        positions: Vec<Point3<f64>>,
        faces: Vec<[VertexId; 3]>,
    ) -> HksResult<HalfEdgeMesh> {
        let vertex_count = positions.len();
        if let Some(p) = positions.iter().find(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return Err(HksError::InvalidMesh(format!("non-finite vertex position {p}")));
        }

        let mut halfedges: Vec<HalfEdge> = Vec::with_capacity(faces.len() * 3);
        let mut directed: IndexMap<(VertexId, VertexId), HalfEdgeId> =
            IndexMap::with_capacity(faces.len() * 3);

        for (face, corners) in faces.iter().enumerate() {
            if let Some(&bad) = corners.iter().find(|&&v| v >= vertex_count) {
                return Err(HksError::InvalidMesh(format!(
                    "face {face} references vertex {bad} but the mesh has {vertex_count} vertices"
                )));
            }
            if corners[0] == corners[1] || corners[1] == corners[2] || corners[0] == corners[2] {
                return Err(HksError::InvalidMesh(format!(
                    "face {face} repeats a vertex: {corners:?}"
                )));
            }

            let base = halfedges.len();
            for corner in 0..3 {
                let source = corners[corner];
                let target = corners[(corner + 1) % 3];
                if directed.insert((source, target), base + corner).is_some() {
                    return Err(HksError::InvalidMesh(format!(
                        "directed edge {source}->{target} is used twice; faces are non-manifold or inconsistently oriented"
                    )));
                }
                halfedges.push(HalfEdge {
                    source,
                    target,
                    next: base + (corner + 1) % 3,
                    opposite: UNLINKED,
                    face: Some(face),
                });
            }
        }

        let interior = halfedges.len();
        let mut boundary_from: IndexMap<VertexId, HalfEdgeId> = IndexMap::new();
        for h in 0..interior {
            let HalfEdge { source, target, .. } = halfedges[h];
            if let Some(&twin) = directed.get(&(target, source)) {
                halfedges[h].opposite = twin;
                continue;
            }
            let boundary = halfedges.len();
            halfedges.push(HalfEdge {
                source: target,
                target: source,
                next: UNLINKED,
                opposite: h,
                face: None,
            });
            halfedges[h].opposite = boundary;
            if boundary_from.insert(target, boundary).is_some() {
                return Err(HksError::InvalidMesh(format!(
                    "vertex {target} starts more than one boundary edge (non-manifold vertex)"
                )));
            }
        }

        for b in interior..halfedges.len() {
            let end = halfedges[b].target;
            let next = *boundary_from.get(&end).ok_or_else(|| {
                HksError::InvalidMesh(format!("boundary loop is open at vertex {end}"))
            })?;
            halfedges[b].next = next;
        }

        let mut incoming = vec![Vec::new(); vertex_count];
        let mut outgoing = vec![Vec::new(); vertex_count];
        for (id, h) in halfedges.iter().enumerate() {
            incoming[h.target].push(id);
            outgoing[h.source].push(id);
        }

        Ok(HalfEdgeMesh {
            positions,
            faces,
            halfedges,
            incoming,
            outgoing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::model::SurfaceMesh;

    fn square_json() -> String {
        r#"{
            "vertices": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            "faces": [[0, 1, 2], [0, 2, 3]]
        }"#
        .to_string()
    }

    #[test]
    fn load_json_mesh_counts_match() {
        let mesh = MeshLoader::from_json_str(&square_json()).expect("load mesh");
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.edge_count(), 5, "four boundary edges plus the diagonal");
        assert!(!mesh.is_closed());
    }

    #[test]
    fn opposite_and_next_are_consistent() {
        let mesh = MeshLoader::from_json_str(&square_json()).expect("load mesh");
        for h in 0..mesh.halfedge_count() {
            let o = mesh.opposite(h);
            assert_eq!(mesh.opposite(o), h);
            assert_eq!(mesh.source(o), mesh.target(h));
            assert_eq!(mesh.source(mesh.next(h)), mesh.target(h));
        }
        let boundary = (0..mesh.halfedge_count())
            .filter(|&h| mesh.is_boundary(h))
            .count();
        assert_eq!(boundary, 4);
    }

    #[test]
    fn incident_halfedges_cover_every_neighbor() {
        let mesh = MeshLoader::from_json_str(&square_json()).expect("load mesh");
        let mut sources: Vec<_> = mesh.halfedges_into(0).map(|h| mesh.source(h)).collect();
        sources.sort_unstable();
        assert_eq!(sources, vec![1, 2, 3]);
        let mut targets: Vec<_> = mesh.halfedges_out_of(0).map(|h| mesh.target(h)).collect();
        targets.sort_unstable();
        assert_eq!(targets, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_out_of_range_and_flipped_faces() {
        let out_of_range = RawMesh {
            vertices: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![[0, 1, 3]],
        };
        assert!(matches!(
            MeshLoader::from_raw(&out_of_range),
            Err(HksError::InvalidMesh(_))
        ));

        let flipped = RawMesh {
            vertices: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
            faces: vec![[0, 1, 2], [0, 1, 3]],
        };
        assert!(MeshLoader::from_raw(&flipped).is_err());
    }

    #[test]
    fn raw_round_trip_preserves_geometry() {
        let mesh = MeshLoader::from_json_str(&square_json()).expect("load mesh");
        let rebuilt = MeshLoader::from_raw(&mesh.to_raw()).expect("rebuild");
        assert_eq!(rebuilt.positions(), mesh.positions());
        assert_eq!(rebuilt.faces(), mesh.faces());
    }
}
