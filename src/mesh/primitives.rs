use indexmap::IndexMap;
use nalgebra::{Point3, Vector3};

use crate::mesh::construction::MeshLoader;
use crate::mesh::model::{HalfEdgeMesh, VertexId};

const GOLDEN: f64 = 1.618_033_988_749_895;

/// Procedural closed and open meshes, all consistently oriented with outward normals.
pub struct Primitives;

impl Primitives {
    pub fn tetrahedron() -> HalfEdgeMesh {
        let positions = vec![
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(1.0, -1.0, -1.0),
            Point3::new(-1.0, 1.0, -1.0),
            Point3::new(-1.0, -1.0, 1.0),
        ];
        let faces = vec![[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]];
        build(positions, faces)
    }

    pub fn octahedron() -> HalfEdgeMesh {
        let positions = vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, -1.0),
        ];
        let faces = vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ];
        build(positions, faces)
    }

    /// Regular icosahedron with edge length 2.
    pub fn icosahedron() -> HalfEdgeMesh {
        let (positions, faces) = icosahedron_parts();
        build(positions, faces)
    }

    /// Unit sphere from a recursively subdivided icosahedron (`12 + 10 * (4^s - 1)` vertices).
    pub fn icosphere(subdivisions: usize) -> HalfEdgeMesh {
        let (positions, faces) = icosphere_parts(subdivisions);
        build(positions, faces)
    }

    /// Icosphere stretched along the coordinate axes. Distinct radii break the rotational
    /// symmetry, so the low end of the spectrum has no repeated eigenvalues.
    pub fn ellipsoid(subdivisions: usize, radii: [f64; 3]) -> HalfEdgeMesh {
        let (positions, faces) = icosphere_parts(subdivisions);
        let radii = Vector3::from(radii);
        let positions = positions
            .into_iter()
            .map(|p| Point3::from(p.coords.component_mul(&radii)))
            .collect();
        build(positions, faces)
    }

    /// Open unit square in the `z = 0` plane split into `2 * nx * ny` triangles.
    pub fn grid(nx: usize, ny: usize) -> HalfEdgeMesh {
        let nx = nx.max(1);
        let ny = ny.max(1);
        let stride = nx + 1;
        let mut positions = Vec::with_capacity(stride * (ny + 1));
        for j in 0..=ny {
            for i in 0..=nx {
                positions.push(Point3::new(i as f64 / nx as f64, j as f64 / ny as f64, 0.0));
            }
        }
        let mut faces = Vec::with_capacity(2 * nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let v00 = j * stride + i;
                let v10 = v00 + 1;
                let v01 = v00 + stride;
                let v11 = v01 + 1;
                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }
        build(positions, faces)
    }

    /// Equilateral triangle with side length `side`.
    pub fn single_triangle(side: f64) -> HalfEdgeMesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(side, 0.0, 0.0),
            Point3::new(0.5 * side, 0.5 * 3f64.sqrt() * side, 0.0),
        ];
        build(positions, vec![[0, 1, 2]])
    }

    /// Place `right` next to `left` without connecting them.
    pub fn disjoint_union(left: &HalfEdgeMesh, right: &HalfEdgeMesh) -> HalfEdgeMesh {
        let offset = left.positions().len();
        let shift = Vector3::new(10.0, 0.0, 0.0);
        let positions = left
            .positions()
            .iter()
            .copied()
            .chain(right.positions().iter().map(|p| p + shift))
            .collect();
        let faces = left
            .faces()
            .iter()
            .copied()
            .chain(
                right
                    .faces()
                    .iter()
                    .map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]),
            )
            .collect();
        build(positions, faces)
    }
}

fn build(positions: Vec<Point3<f64>>, faces: Vec<[VertexId; 3]>) -> HalfEdgeMesh {
    match MeshLoader::from_triangles(positions, faces) {
        Ok(mesh) => mesh,
        Err(err) => unreachable!("procedural primitive is malformed: {err}"),
    }
}

fn icosahedron_parts() -> (Vec<Point3<f64>>, Vec<[VertexId; 3]>) {
    let t = GOLDEN;
    let positions = vec![
        Point3::new(-1.0, t, 0.0),
        Point3::new(1.0, t, 0.0),
        Point3::new(-1.0, -t, 0.0),
        Point3::new(1.0, -t, 0.0),
        Point3::new(0.0, -1.0, t),
        Point3::new(0.0, 1.0, t),
        Point3::new(0.0, -1.0, -t),
        Point3::new(0.0, 1.0, -t),
        Point3::new(t, 0.0, -1.0),
        Point3::new(t, 0.0, 1.0),
        Point3::new(-t, 0.0, -1.0),
        Point3::new(-t, 0.0, 1.0),
    ];
    let faces = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];
    (positions, faces)
}

fn icosphere_parts(subdivisions: usize) -> (Vec<Point3<f64>>, Vec<[VertexId; 3]>) {
    let (positions, mut faces) = icosahedron_parts();
    let mut positions: Vec<Point3<f64>> = positions
        .into_iter()
        .map(|p| Point3::from(p.coords.normalize()))
        .collect();

    for _ in 0..subdivisions {
        let mut midpoints: IndexMap<(VertexId, VertexId), VertexId> = IndexMap::new();
        let mut midpoint = |a: VertexId, b: VertexId, positions: &mut Vec<Point3<f64>>| {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let mid = (positions[a].coords + positions[b].coords).normalize();
                positions.push(Point3::from(mid));
                positions.len() - 1
            })
        };

        let mut refined = Vec::with_capacity(faces.len() * 4);
        for &[a, b, c] in &faces {
            let ab = midpoint(a, b, &mut positions);
            let bc = midpoint(b, c, &mut positions);
            let ca = midpoint(c, a, &mut positions);
            refined.push([a, ab, ca]);
            refined.push([b, bc, ab]);
            refined.push([c, ca, bc]);
            refined.push([ab, bc, ca]);
        }
        faces = refined;
    }
    (positions, faces)
}
