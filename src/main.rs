use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};

use hks::{
    DescriptorWriter, HksWorkflow, OperatorVerifier, PipelineConfig, PreprocessedMesh,
    SpectrumVerifier, SurfaceMesh,
};

const MESH_DIR: &str = "meshes";
const OUTPUT_SUFFIX: &str = ".hks.json";
const VERIFY_TOLERANCE: f64 = 1e-8;

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

struct Args {
    meshes: Vec<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mesh = args.next();
    let config = args.next().map(PathBuf::from);
    if let Some(extra) = args.next() {
        anyhow::bail!("Unexpected extra argument: {extra}");
    }

    let meshes = match mesh {
        Some(mesh) => vec![PathBuf::from(mesh)],
        None => {
            let meshes = collect_mesh_files(Path::new(MESH_DIR))
                .with_context(|| format!("list {MESH_DIR} directory"))?;
            if meshes.is_empty() {
                anyhow::bail!("No meshes available under {MESH_DIR}");
            }
            meshes
        }
    };
    Ok(Args { meshes, config })
}

fn main() -> Result<()> {
    init_logging();
    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    config.validate().context("validate pipeline configuration")?;
    let preprocessor = config.preprocessor();

    info!("Preparing {} meshes", args.meshes.len());
    let mut prepared = Vec::with_capacity(args.meshes.len());
    for path in &args.meshes {
        let mesh = preprocessor
            .prepare_path(path)
            .with_context(|| format!("preprocess mesh at {:?}", path))?;
        prepared.push(Arc::new(mesh));
    }

    let start = Instant::now();
    let (results, stats) = HksWorkflow::execute_all(config.descriptor, &prepared);
    for ((path, mesh), result) in args.meshes.iter().zip(&prepared).zip(results) {
        let name = path.file_name().unwrap_or_else(|| OsStr::new("<unknown>"));
        let summary = match result {
            Ok(summary) => summary,
            Err(err) => {
                warn!("Mesh {:?}: failed: {err:#}", name);
                continue;
            }
        };
        info!(
            "Mesh {:?}: {} vertices, {}/{} eigenpairs, {} time scales over [{:.4e}, {:.4e}]",
            name,
            summary.stats.vertex_count,
            summary.stats.eigenpairs,
            summary.stats.requested_eigenpairs,
            summary.stats.tscales,
            summary.stats.tmin,
            summary.stats.tmax
        );
        info!(
            "Mesh {:?}: spectrum {:?} ({:?}), synthesis {:?}",
            name,
            summary.spectral_duration,
            summary.stats.source,
            summary.synthesis_duration
        );
        if !summary.stats.diagnostics.is_clean() {
            warn!("Mesh {:?}: {:?}", name, summary.stats.diagnostics);
        }
        report_checks(name, mesh)?;

        let output = output_path(path);
        DescriptorWriter::write_to_path(&summary.descriptor, &output)
            .with_context(|| format!("write descriptor to {:?}", output))?;
        info!("Mesh {:?}: descriptor written to {:?}", name, output);
    }

    info!(
        "Processed {} meshes ({} failed, {} cached spectra) in {:?}",
        stats.meshes,
        stats.failures,
        stats.cached_spectra,
        start.elapsed()
    );
    if stats.failures > 0 {
        anyhow::bail!("{} of {} meshes failed", stats.failures, stats.meshes);
    }
    Ok(())
}

fn report_checks(name: &OsStr, mesh: &PreprocessedMesh) -> Result<()> {
    let operators = mesh.operators()?;
    let area = mesh.mesh().is_closed().then(|| mesh.mesh().surface_area());
    let operator_report = OperatorVerifier::verify(&operators, area, VERIFY_TOLERANCE);
    let spectrum = mesh.spectrum()?;
    let spectrum_report = SpectrumVerifier::verify(&spectrum.spectrum, VERIFY_TOLERANCE);
    for (label, report) in [("operators", operator_report), ("spectrum", spectrum_report)] {
        if report.is_valid {
            info!("Mesh {:?}: {label} checks pass", name);
        } else {
            warn!("Mesh {:?}: {label} checks failed\n{}", name, report.explanation);
        }
    }
    info!(
        "Mesh {:?}: {} faces, {} edges",
        name,
        mesh.mesh().face_count(),
        mesh.mesh().edge_count()
    );
    Ok(())
}

fn output_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string());
    path.with_file_name(format!("{stem}{OUTPUT_SUFFIX}"))
}

fn collect_mesh_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(OsStr::to_str)
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
                && !path.to_string_lossy().ends_with(OUTPUT_SUFFIX)
        })
        .collect();
    paths.sort();
    Ok(paths)
}
