use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cache::SpectrumCache;
use crate::diagnostics::Diagnostics;
use crate::eigen::SpectralConfig;
use crate::error::HksResult;
use crate::mesh::SurfaceMesh;
use crate::pipeline::preprocess::{MeshPreprocessor, PreprocessedMesh, SpectrumSource};
use crate::signature::{DescriptorConfig, HeatKernelSignature, HksDescriptor};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub spectral: SpectralConfig,
    pub descriptor: DescriptorConfig,
    /// Spectra are cached under this directory when set.
    pub cache_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("deserialize pipeline configuration")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("read pipeline configuration {:?}", path))?;
        Self::from_json_str(&json).with_context(|| format!("parse {:?}", path))
    }

    pub fn validate(&self) -> HksResult<()> {
        self.spectral.validate()?;
        self.descriptor.validate()
    }

    pub fn cache(&self) -> Option<SpectrumCache> {
        self.cache_dir.as_ref().map(|dir| SpectrumCache::new(dir.clone()))
    }

    pub fn preprocessor(&self) -> MeshPreprocessor {
        let preprocessor = MeshPreprocessor::new(self.spectral.clone());
        match self.cache() {
            Some(cache) => preprocessor.with_cache(cache),
            None => preprocessor,
        }
    }
}

/// Runs the synthesis stage against one preprocessed mesh.
pub struct HksWorkflow {
    descriptor: DescriptorConfig,
    mesh: Arc<PreprocessedMesh>,
}

impl HksWorkflow {
    pub fn new(descriptor: DescriptorConfig, mesh: impl Into<Arc<PreprocessedMesh>>) -> Self {
        Self {
            descriptor,
            mesh: mesh.into(),
        }
    }

    /// Validates the time parameters before the spectrum is touched, so a bad request never
    /// triggers a decomposition.
    pub fn execute(&self) -> Result<SignatureSummary> {
        let total_start = Instant::now();
        self.descriptor
            .validate()
            .context("validate descriptor configuration")?;

        let spectral_start = Instant::now();
        let prepared = self.mesh.spectrum()?;
        let spectral_duration = spectral_start.elapsed();

        let synthesis_start = Instant::now();
        let descriptor = HeatKernelSignature::new(Arc::clone(&prepared.spectrum))
            .compute(&self.descriptor)
            .context("synthesize heat kernel signature")?;
        let synthesis_duration = synthesis_start.elapsed();

        let times = descriptor.time_samples();
        let stats = WorkflowStats {
            vertex_count: self.mesh.vertex_count(),
            face_count: self.mesh.mesh().face_count(),
            requested_eigenpairs: prepared.requested,
            eigenpairs: prepared.spectrum.len(),
            tscales: descriptor.tscales(),
            tmin: times.first().copied().unwrap_or_default(),
            tmax: times.last().copied().unwrap_or_default(),
            source: prepared.source,
            diagnostics: prepared.diagnostics,
        };

        Ok(SignatureSummary {
            descriptor,
            stats,
            total_duration: total_start.elapsed(),
            spectral_duration,
            synthesis_duration,
        })
    }

    /// Run every mesh in parallel; results keep the input order.
    pub fn execute_all(
        descriptor: DescriptorConfig,
        meshes: &[Arc<PreprocessedMesh>],
    ) -> (Vec<Result<SignatureSummary>>, BatchStats) {
        let results: Vec<Result<SignatureSummary>> = meshes
            .par_iter()
            .map(|mesh| Self::new(descriptor, Arc::clone(mesh)).execute())
            .collect();
        let stats = results
            .par_iter()
            .fold(BatchStats::default, |mut acc, result| {
                acc.consume(result.as_ref().ok());
                acc
            })
            .reduce(BatchStats::default, BatchStats::combine);
        info!(
            "batch finished: {} meshes, {} failed, {} cached spectra",
            stats.meshes, stats.failures, stats.cached_spectra
        );
        (results, stats)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStats {
    pub vertex_count: usize,
    pub face_count: usize,
    pub requested_eigenpairs: usize,
    /// Eigenpairs that actually entered the synthesis.
    pub eigenpairs: usize,
    pub tscales: usize,
    /// First and last resolved time samples.
    pub tmin: f64,
    pub tmax: f64,
    pub source: SpectrumSource,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct SignatureSummary {
    pub descriptor: HksDescriptor,
    pub stats: WorkflowStats,
    pub total_duration: Duration,
    pub spectral_duration: Duration,
    pub synthesis_duration: Duration,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchStats {
    pub meshes: usize,
    pub failures: usize,
    pub cached_spectra: usize,
    pub diagnostics: Diagnostics,
    pub spectral_duration: Duration,
    pub synthesis_duration: Duration,
}

impl BatchStats {
    fn consume(&mut self, summary: Option<&SignatureSummary>) {
        self.meshes += 1;
        let Some(summary) = summary else {
            self.failures += 1;
            return;
        };
        if summary.stats.source == SpectrumSource::Cached {
            self.cached_spectra += 1;
        }
        self.diagnostics = self.diagnostics.combine(summary.stats.diagnostics);
        self.spectral_duration += summary.spectral_duration;
        self.synthesis_duration += summary.synthesis_duration;
    }

    fn combine(mut self, other: Self) -> Self {
        self.meshes += other.meshes;
        self.failures += other.failures;
        self.cached_spectra += other.cached_spectra;
        self.diagnostics = self.diagnostics.combine(other.diagnostics);
        self.spectral_duration += other.spectral_duration;
        self.synthesis_duration += other.synthesis_duration;
        self
    }
}
