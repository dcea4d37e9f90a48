use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use once_cell::sync::OnceCell;

use crate::cache::{CachedSpectrumEntry, SpectrumCache};
use crate::diagnostics::Diagnostics;
use crate::eigen::{assert_spectral_gap, EigenDecomposition, SpectralConfig};
use crate::mesh::{HalfEdgeMesh, MeshLoader, SurfaceMesh};
use crate::operators::LaplaceBeltrami;

/// Where a prepared spectrum came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumSource {
    Computed { iterations: usize },
    Cached,
    Injected,
}

#[derive(Debug, Clone)]
pub struct PreparedSpectrum {
    pub spectrum: Arc<EigenDecomposition>,
    pub diagnostics: Diagnostics,
    pub source: SpectrumSource,
    /// Eigenpairs requested after clamping to the vertex count.
    pub requested: usize,
}

/// A mesh with its operators and spectrum, each evaluated on first access and memoized.
#[derive(Debug, Clone)]
pub struct PreprocessedMesh {
    pub mesh: Arc<HalfEdgeMesh>,
    config: SpectralConfig,
    operators: LazyValue<LaplaceBeltrami>,
    spectrum: LazyValue<PreparedSpectrum>,
}

impl PreprocessedMesh {
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn mesh(&self) -> &HalfEdgeMesh {
        &self.mesh
    }

    pub fn mesh_arc(&self) -> Arc<HalfEdgeMesh> {
        Arc::clone(&self.mesh)
    }

    pub fn config(&self) -> &SpectralConfig {
        &self.config
    }

    pub fn operators(&self) -> Result<Arc<LaplaceBeltrami>> {
        self.operators.get()
    }

    pub fn spectrum(&self) -> Result<Arc<PreparedSpectrum>> {
        self.spectrum.get()
    }

    pub fn is_spectrum_ready(&self) -> bool {
        self.spectrum.is_ready()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MeshPreprocessor {
    config: SpectralConfig,
    cache: Option<SpectrumCache>,
}

impl MeshPreprocessor {
    pub fn new(config: SpectralConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: SpectrumCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn prepare_path(&self, path: &Path) -> Result<PreprocessedMesh> {
        let mesh =
            MeshLoader::from_path(path).with_context(|| format!("open mesh file {:?}", path))?;
        info!(
            "mesh {:?}: {} vertices, {} faces",
            path,
            mesh.vertex_count(),
            mesh.face_count()
        );
        self.prepare(mesh)
    }

    pub fn prepare(&self, mesh: HalfEdgeMesh) -> Result<PreprocessedMesh> {
        self.config
            .validate()
            .context("validate spectral configuration")?;
        if let Some(cache) = &self.cache {
            if let Some(entry) = cache.load(&mesh, &self.config)? {
                info!("reusing cached spectrum from {:?}", cache.root());
                return Ok(self.prepare_cached(mesh, cache.clone(), entry));
            }
        }

        let mesh = Arc::new(mesh);
        let operators = self.deferred_operators(&mesh);
        let config = self.config.clone();
        let cache = self.cache.clone();
        let loader_mesh = Arc::clone(&mesh);
        let loader_operators = operators.clone();
        let spectrum = LazyValue::deferred(move || {
            let operators = loader_operators.get()?;
            let report = EigenDecomposition::from_operators(&operators, &config)
                .context("decompose mesh operators")?;
            if let Some(cache) = &cache {
                if let Err(err) =
                    cache.store(&loader_mesh, &config, &report.spectrum, &report.diagnostics)
                {
                    warn!("failed to cache spectrum: {err:#}");
                }
            }
            Ok(PreparedSpectrum {
                spectrum: Arc::new(report.spectrum),
                diagnostics: report.diagnostics,
                source: SpectrumSource::Computed {
                    iterations: report.iterations,
                },
                requested: report.requested,
            })
        });

        Ok(self.assemble(mesh, operators, spectrum))
    }

    /// Attach a pre-computed spectrum, validated against the mesh's vertex count.
    pub fn prepare_with_spectrum(
        &self,
        mesh: HalfEdgeMesh,
        spectrum: EigenDecomposition,
    ) -> Result<PreprocessedMesh> {
        let (eigenvalues, eigenfunctions) = spectrum.into_parts();
        let spectrum =
            EigenDecomposition::from_parts(eigenvalues, eigenfunctions, mesh.vertex_count())
                .context("validate injected spectrum")?;
        let mesh = Arc::new(mesh);
        let operators = self.deferred_operators(&mesh);
        let prepared = PreparedSpectrum {
            requested: spectrum.len(),
            spectrum: Arc::new(spectrum),
            diagnostics: Diagnostics::default(),
            source: SpectrumSource::Injected,
        };
        Ok(self.assemble(mesh, operators, LazyValue::ready(prepared)))
    }

    fn prepare_cached(
        &self,
        mesh: HalfEdgeMesh,
        cache: SpectrumCache,
        entry: CachedSpectrumEntry,
    ) -> PreprocessedMesh {
        let mesh = Arc::new(mesh);
        let operators = self.deferred_operators(&mesh);
        let requested = self.config.eigenpairs.min(mesh.vertex_count());
        let enforce_spectral_gap = self.config.enforce_spectral_gap;
        let spectrum = LazyValue::deferred(move || {
            let spectrum = cache
                .load_spectrum(&entry)
                .context("load cached spectrum")?;
            if enforce_spectral_gap {
                assert_spectral_gap(spectrum.eigenvalues().as_slice());
            }
            Ok(PreparedSpectrum {
                spectrum: Arc::new(spectrum),
                diagnostics: entry.diagnostics(),
                source: SpectrumSource::Cached,
                requested,
            })
        });
        self.assemble(mesh, operators, spectrum)
    }

    fn deferred_operators(&self, mesh: &Arc<HalfEdgeMesh>) -> LazyValue<LaplaceBeltrami> {
        let mesh = Arc::clone(mesh);
        let area = self.config.area;
        LazyValue::deferred(move || {
            LaplaceBeltrami::build(mesh.as_ref(), area).context("assemble mesh operators")
        })
    }

    fn assemble(
        &self,
        mesh: Arc<HalfEdgeMesh>,
        operators: LazyValue<LaplaceBeltrami>,
        spectrum: LazyValue<PreparedSpectrum>,
    ) -> PreprocessedMesh {
        PreprocessedMesh {
            mesh,
            config: self.config.clone(),
            operators,
            spectrum,
        }
    }
}

#[derive(Clone)]
struct LazyValue<T> {
    cell: Arc<OnceCell<Arc<T>>>,
    loader: Arc<LazyLoader<T>>,
}

enum LazyLoader<T> {
    Ready(Arc<T>),
    Deferred(Arc<dyn Fn() -> Result<T> + Send + Sync>),
}

impl<T> LazyValue<T>
where
    T: Send + Sync + 'static,
{
    fn ready(value: T) -> Self {
        let arc = Arc::new(value);
        let cell = Arc::new(OnceCell::new());
        let _ = cell.set(Arc::clone(&arc));
        Self {
            cell,
            loader: Arc::new(LazyLoader::Ready(arc)),
        }
    }

    fn deferred<F>(loader: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self {
            cell: Arc::new(OnceCell::new()),
            loader: Arc::new(LazyLoader::Deferred(Arc::new(loader))),
        }
    }

    fn get(&self) -> Result<Arc<T>> {
        match self.loader.as_ref() {
            LazyLoader::Ready(value) => Ok(Arc::clone(value)),
            LazyLoader::Deferred(loader) => {
                let loader = Arc::clone(loader);
                self.cell
                    .get_or_try_init(|| loader().map(Arc::new))
                    .map(Arc::clone)
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> fmt::Debug for LazyValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("initialized", &self.cell.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HksError;
    use crate::mesh::Primitives;
    use nalgebra::{DMatrix, DVector};

    fn config() -> SpectralConfig {
        SpectralConfig::default().with_eigenpairs(6)
    }

    #[test]
    fn spectrum_is_computed_once_on_demand() {
        let preprocessed = MeshPreprocessor::new(config())
            .prepare(Primitives::ellipsoid(1, [1.0, 1.4, 0.7]))
            .expect("preprocess");
        assert!(!preprocessed.is_spectrum_ready());
        let first = preprocessed.spectrum().expect("spectrum");
        assert!(preprocessed.is_spectrum_ready());
        let second = preprocessed.spectrum().expect("spectrum");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(matches!(first.source, SpectrumSource::Computed { .. }));
        assert_eq!(first.spectrum.len(), 6);
    }

    #[test]
    fn invalid_configuration_fails_before_any_matrix_work() {
        let err = MeshPreprocessor::new(config().with_eigenpairs(0))
            .prepare(Primitives::tetrahedron())
            .expect_err("zero eigenpairs");
        assert!(matches!(
            err.downcast_ref::<HksError>(),
            Some(HksError::InvalidArgument(_))
        ));
    }

    #[test]
    fn injected_spectrum_must_match_vertex_count() {
        let mesh = Primitives::tetrahedron();
        let spectrum = EigenDecomposition::from_parts(
            DVector::from_vec(vec![0.0, 1.0]),
            DMatrix::from_element(5, 2, 0.1),
            5,
        )
        .expect("spectrum");
        let err = MeshPreprocessor::default()
            .prepare_with_spectrum(mesh.clone(), spectrum)
            .expect_err("mismatch");
        assert!(matches!(
            err.downcast_ref::<HksError>(),
            Some(HksError::DimensionMismatch(_))
        ));

        let spectrum = EigenDecomposition::from_parts(
            DVector::from_vec(vec![0.0, 1.0]),
            DMatrix::from_element(4, 2, 0.1),
            4,
        )
        .expect("spectrum");
        let preprocessed = MeshPreprocessor::default()
            .prepare_with_spectrum(mesh, spectrum)
            .expect("inject");
        assert!(preprocessed.is_spectrum_ready());
        let prepared = preprocessed.spectrum().expect("spectrum");
        assert_eq!(prepared.source, SpectrumSource::Injected);
    }
}
