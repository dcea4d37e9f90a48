use approx::assert_relative_eq;
use hks::operators::{cotangent_matrix, mass_matrix};
use hks::{
    LaplaceBeltrami, MeshLoader, OperatorVerifier, Primitives, RawMesh, SurfaceMesh, VertexArea,
};

const METHODS: [VertexArea; 3] = [
    VertexArea::Barycentric,
    VertexArea::Voronoi,
    VertexArea::MixedVoronoi,
];

#[test]
fn closed_primitives_have_symmetric_zero_row_sum_stiffness() {
    for mesh in [
        Primitives::tetrahedron(),
        Primitives::octahedron(),
        Primitives::icosphere(2),
        Primitives::ellipsoid(2, [0.6, 1.0, 1.7]),
    ] {
        let stiffness = cotangent_matrix(&mesh);
        assert!(stiffness.matrix.is_symmetric());
        let scale = stiffness
            .matrix
            .diagonal()
            .iter()
            .fold(0.0f64, |acc, d| acc.max(d.abs()));
        for sum in stiffness.matrix.row_sums() {
            assert!(sum.abs() <= 1e-12 * scale, "row sum {sum}");
        }
        assert!(stiffness.diagnostics.is_clean());
    }
}

#[test]
fn regular_icosahedron_operators_are_uniform() {
    let mesh = Primitives::icosahedron();
    let stiffness = cotangent_matrix(&mesh).matrix;
    let diagonal = stiffness.diagonal();
    for d in &diagonal {
        assert_relative_eq!(*d, diagonal[0], max_relative = 1e-12);
    }
    let magnitude = stiffness
        .triplets()
        .find(|(r, c, _)| r != c)
        .map(|(_, _, v)| v.abs())
        .expect("off-diagonal entry");
    for (row, col, value) in stiffness.triplets() {
        if row != col {
            assert_relative_eq!(value.abs(), magnitude, max_relative = 1e-12);
        }
    }
    for method in METHODS {
        let mass = mass_matrix(&mesh, method);
        for area in &mass.areas {
            assert_relative_eq!(*area, mass.areas[0], max_relative = 1e-12);
        }
    }
}

#[test]
fn equilateral_areas_scale_with_square_of_side() {
    let unit = mass_matrix(&Primitives::single_triangle(1.0), VertexArea::Barycentric);
    for scale in [0.25, 3.0, 11.0] {
        let mesh = Primitives::single_triangle(scale);
        let bary = mass_matrix(&mesh, VertexArea::Barycentric);
        let voronoi = mass_matrix(&mesh, VertexArea::Voronoi);
        for v in 0..3 {
            assert_relative_eq!(bary.areas[v], voronoi.areas[v], max_relative = 1e-12);
            assert_relative_eq!(
                bary.areas[v],
                scale * scale * unit.areas[v],
                max_relative = 1e-12
            );
        }
    }
}

#[test]
fn open_grid_gets_one_cotangent_term_per_boundary_edge() {
    let mesh = Primitives::grid(3, 3);
    assert!(!mesh.is_closed());
    let operators = LaplaceBeltrami::build(&mesh, VertexArea::MixedVoronoi).expect("operators");
    let report = OperatorVerifier::verify(&operators, Some(mesh.surface_area()), 1e-10);
    assert!(report.is_valid, "{}", report.explanation);

    // Bottom-left corner 0 -> 1 is a boundary edge seen by a single right-angled face whose
    // opposite angle is 45 degrees.
    assert_relative_eq!(operators.stiffness.get(0, 1), -0.5, max_relative = 1e-12);
    assert_eq!(operators.stiffness.get(0, 1), operators.stiffness.get(1, 0));
}

#[test]
fn barycentric_mass_totals_surface_area() {
    for mesh in [Primitives::icosphere(1), Primitives::grid(4, 2)] {
        let mass = mass_matrix(&mesh, VertexArea::Barycentric);
        assert!(mass.matrix.is_diagonal());
        assert!(mass.areas.iter().all(|a| *a >= 0.0));
        let total: f64 = mass.areas.iter().sum();
        assert_relative_eq!(total, mesh.surface_area(), max_relative = 1e-12);
    }
}

#[test]
fn degenerate_triangle_is_reported_not_fatal() {
    let raw = RawMesh {
        vertices: vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
        ],
        faces: vec![[0, 1, 2], [0, 3, 1]],
    };
    let mesh = MeshLoader::from_raw(&raw).expect("mesh");
    assert_eq!(mesh.face_count(), 2);
    let operators = LaplaceBeltrami::build(&mesh, VertexArea::MixedVoronoi).expect("operators");
    assert!(operators.diagnostics.degenerate_contributions > 0);
    assert!(operators.stiffness.is_symmetric());
    assert!(operators
        .stiffness
        .triplets()
        .all(|(_, _, value)| value.is_finite()));
}
