use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::eigen::{EigenDecomposition, SpectralConfig};
use crate::mesh::HalfEdgeMesh;
use crate::operators::VertexArea;

const CACHE_DIR: &str = "cache";
const SPECTRA_SUBDIR: &str = "spectra";
const METADATA_FILE: &str = "meta.json";
const SPECTRUM_FILE: &str = "spectrum.json";
const CACHE_VERSION: u32 = 1;

/// What a cached spectrum was computed from, compared on load next to the content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub vertex_count: usize,
    pub face_count: usize,
    pub eigenpairs: usize,
    pub area: VertexArea,
}

impl CacheMetadata {
    pub fn new(mesh: &HalfEdgeMesh, config: &SpectralConfig) -> Self {
        Self {
            vertex_count: mesh.positions().len(),
            face_count: mesh.faces().len(),
            eigenpairs: config.eigenpairs,
            area: config.area,
        }
    }
}

/// Spectra persisted as JSON under `<root>/spectra/<blake3 of geometry and config>/`.
#[derive(Debug, Clone)]
pub struct SpectrumCache {
    root: PathBuf,
}

impl Default for SpectrumCache {
    fn default() -> Self {
        Self::new(CACHE_DIR)
    }
}

impl SpectrumCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load(
        &self,
        mesh: &HalfEdgeMesh,
        config: &SpectralConfig,
    ) -> Result<Option<CachedSpectrumEntry>> {
        let dir = self.cache_dir(mesh, config);
        let meta_path = dir.join(METADATA_FILE);
        if !meta_path.exists() {
            return Ok(None);
        }

        let meta: CachedMeta = read_json(&meta_path)
            .with_context(|| format!("deserialize spectrum metadata from {:?}", meta_path))?;
        if meta.version != CACHE_VERSION || meta.metadata != CacheMetadata::new(mesh, config) {
            return Ok(None);
        }
        if !dir.join(SPECTRUM_FILE).exists() {
            return Ok(None);
        }

        Ok(Some(CachedSpectrumEntry {
            dir,
            vertex_count: meta.metadata.vertex_count,
            diagnostics: meta.diagnostics,
        }))
    }

    pub fn store(
        &self,
        mesh: &HalfEdgeMesh,
        config: &SpectralConfig,
        spectrum: &EigenDecomposition,
        diagnostics: &Diagnostics,
    ) -> Result<()> {
        let dir = self.cache_dir(mesh, config);
        fs::create_dir_all(&dir).with_context(|| format!("create cache directory {:?}", dir))?;

        let meta = CachedMeta {
            version: CACHE_VERSION,
            metadata: CacheMetadata::new(mesh, config),
            diagnostics: *diagnostics,
        };

        write_json(&dir.join(SPECTRUM_FILE), spectrum)
            .with_context(|| format!("write cached spectrum to {:?}", dir))?;
        write_json(&dir.join(METADATA_FILE), &meta)
            .with_context(|| format!("write spectrum metadata to {:?}", dir))?;

        Ok(())
    }

    /// Read a cached spectrum back through the validated pre-computed construction path.
    pub fn load_spectrum(&self, entry: &CachedSpectrumEntry) -> Result<EigenDecomposition> {
        let path = entry.spectrum_path();
        let stored: EigenDecomposition = read_json(&path)
            .with_context(|| format!("read cached spectrum from {:?}", path))?;
        let (eigenvalues, eigenfunctions) = stored.into_parts();
        EigenDecomposition::from_parts(eigenvalues, eigenfunctions, entry.vertex_count)
            .with_context(|| format!("validate cached spectrum from {:?}", path))
    }

    pub fn clear(&self) -> Result<()> {
        let dir = self.root.join(SPECTRA_SUBDIR);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("remove spectrum cache directory {:?}", dir))?;
        }
        Ok(())
    }

    fn cache_dir(&self, mesh: &HalfEdgeMesh, config: &SpectralConfig) -> PathBuf {
        let mut hasher = blake3::Hasher::new();
        for position in mesh.positions() {
            for coordinate in position.coords.iter() {
                hasher.update(&coordinate.to_bits().to_le_bytes());
            }
        }
        for face in mesh.faces() {
            for corner in face {
                hasher.update(&(*corner as u64).to_le_bytes());
            }
        }
        hasher.update(&(config.eigenpairs as u64).to_le_bytes());
        hasher.update(config.area.as_str().as_bytes());
        hasher.update(&config.shift.to_bits().to_le_bytes());
        hasher.update(&(config.max_iterations as u64).to_le_bytes());
        hasher.update(&config.tolerance.to_bits().to_le_bytes());
        hasher.update(&config.seed.to_le_bytes());
        let dirname = hasher.finalize().to_hex().to_string();
        self.root.join(SPECTRA_SUBDIR).join(dirname)
    }
}

#[derive(Debug, Clone)]
pub struct CachedSpectrumEntry {
    dir: PathBuf,
    vertex_count: usize,
    diagnostics: Diagnostics,
}

impl CachedSpectrumEntry {
    /// Diagnostics recorded when the spectrum was first computed.
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    fn spectrum_path(&self) -> PathBuf {
        self.dir.join(SPECTRUM_FILE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedMeta {
    version: u32,
    metadata: CacheMetadata,
    diagnostics: Diagnostics,
}

fn read_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let file = File::open(path).with_context(|| format!("open cached json file {:?}", path))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("deserialize cached json file {:?}", path))
}

fn write_json<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create cache parent directory {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("create cache json file {:?}", path))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer(writer, value)
        .with_context(|| format!("serialize cache json file {:?}", path))
}
