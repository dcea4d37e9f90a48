use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use hks::{
    DescriptorConfig, EigenDecomposition, HalfEdgeMesh, HeatKernelSignature, LaplaceBeltrami,
    MeshLoader, Primitives, SpectralConfig, VertexArea,
};

/// Icosphere with every vertex pushed radially by up to `amplitude`.
fn bumpy_sphere(subdivisions: usize, amplitude: f64, seed: u64) -> HalfEdgeMesh {
    let mut raw = Primitives::icosphere(subdivisions).to_raw();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    for vertex in raw.vertices.iter_mut() {
        let factor = 1.0 + amplitude * rng.gen_range(-1.0..1.0);
        for coordinate in vertex.iter_mut() {
            *coordinate *= factor;
        }
    }
    MeshLoader::from_raw(&raw).expect("mesh")
}

fn bench_hks_pipeline(c: &mut Criterion) {
    let small = bumpy_sphere(2, 0.05, 42);
    let medium = bumpy_sphere(3, 0.05, 7);
    let config = SpectralConfig::default().with_eigenpairs(30);

    let mut group = c.benchmark_group("hks_pipeline");

    group.bench_function("operators_642", |b| {
        b.iter(|| {
            let operators =
                LaplaceBeltrami::build(&medium, VertexArea::MixedVoronoi).expect("operators");
            black_box(operators);
        });
    });

    group.bench_function("decompose_162", |b| {
        let operators =
            LaplaceBeltrami::build(&small, VertexArea::MixedVoronoi).expect("operators");
        b.iter(|| {
            let report = EigenDecomposition::from_operators(&operators, &config).expect("spectrum");
            black_box(report.spectrum);
        });
    });

    group.bench_function("synthesize_642", |b| {
        let report = EigenDecomposition::compute(&medium, &config).expect("spectrum");
        let signature = HeatKernelSignature::new(report.spectrum);
        let descriptor = DescriptorConfig::default();
        b.iter(|| {
            let hks = signature.compute(&descriptor).expect("descriptor");
            black_box(hks);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_hks_pipeline);
criterion_main!(benches);
