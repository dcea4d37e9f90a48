use approx::assert_relative_eq;
use hks::pipeline::SpectrumSource;
use hks::{MeshPreprocessor, Primitives, SpectralConfig, SpectrumCache};

const RADII: [f64; 3] = [1.0, 1.4, 0.7];

fn config(k: usize) -> SpectralConfig {
    SpectralConfig::default().with_eigenpairs(k)
}

#[test]
fn second_preprocess_reuses_cached_spectrum() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = SpectrumCache::new(dir.path());
    let preprocessor = MeshPreprocessor::new(config(6)).with_cache(cache.clone());

    let first = preprocessor
        .prepare(Primitives::ellipsoid(1, RADII))
        .expect("preprocess");
    let computed = first.spectrum().expect("spectrum");
    assert!(matches!(computed.source, SpectrumSource::Computed { .. }));
    assert!(cache
        .load(first.mesh(), first.config())
        .expect("load")
        .is_some());

    let second = preprocessor
        .prepare(Primitives::ellipsoid(1, RADII))
        .expect("preprocess");
    assert!(!second.is_spectrum_ready());
    let cached = second.spectrum().expect("spectrum");
    assert_eq!(cached.source, SpectrumSource::Cached);
    assert_eq!(cached.requested, 6);
    assert_eq!(cached.diagnostics, computed.diagnostics);
    assert_eq!(cached.spectrum.len(), computed.spectrum.len());
    for (a, b) in cached
        .spectrum
        .eigenfunctions()
        .iter()
        .zip(computed.spectrum.eigenfunctions().iter())
    {
        assert_relative_eq!(*a, *b, epsilon = 1e-14);
    }
}

#[test]
fn cache_key_depends_on_geometry_and_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = SpectrumCache::new(dir.path());
    let mesh = Primitives::ellipsoid(1, RADII);
    let preprocessed = MeshPreprocessor::new(config(4))
        .with_cache(cache.clone())
        .prepare(mesh.clone())
        .expect("preprocess");
    preprocessed.spectrum().expect("spectrum");

    assert!(cache.load(&mesh, &config(4)).expect("load").is_some());
    assert!(cache.load(&mesh, &config(5)).expect("load").is_none());
    assert!(cache
        .load(&mesh.scaled(2.0), &config(4))
        .expect("load")
        .is_none());

    cache.clear().expect("clear");
    assert!(cache.load(&mesh, &config(4)).expect("load").is_none());
}

#[test]
#[should_panic(expected = "not strictly positive")]
fn cached_spectrum_is_held_to_the_spectral_gap_contract() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = SpectrumCache::new(dir.path());
    let part = Primitives::ellipsoid(1, RADII);
    let mesh = Primitives::disjoint_union(&part, &part);

    let unchecked = SpectralConfig {
        enforce_spectral_gap: false,
        ..config(6)
    };
    let stored = MeshPreprocessor::new(unchecked)
        .with_cache(cache.clone())
        .prepare(mesh.clone())
        .expect("preprocess");
    stored.spectrum().expect("spectrum");
    assert!(cache.load(&mesh, &config(6)).expect("load").is_some());

    let checked = MeshPreprocessor::new(config(6))
        .with_cache(cache)
        .prepare(mesh)
        .expect("preprocess");
    let _ = checked.spectrum();
}
