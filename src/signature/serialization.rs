use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::signature::HksDescriptor;

/// Vertex-major JSON mirror of an [`HksDescriptor`]: `signatures[v][i]` is vertex `v` at
/// `times[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDescriptor {
    pub times: Vec<f64>,
    pub signatures: Vec<Vec<f64>>,
}

/// Helper for exporting descriptors to JSON files.
pub struct DescriptorWriter;

impl DescriptorWriter {
    pub fn to_raw(descriptor: &HksDescriptor) -> RawDescriptor {
        let signatures = descriptor
            .values()
            .columns()
            .into_iter()
            .map(|column| column.to_vec())
            .collect();
        RawDescriptor {
            times: descriptor.time_samples().to_vec(),
            signatures,
        }
    }

    pub fn to_json_string(descriptor: &HksDescriptor) -> Result<String> {
        let raw = Self::to_raw(descriptor);
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    pub fn write_to_path(descriptor: &HksDescriptor, path: &Path) -> Result<()> {
        let raw = Self::to_raw(descriptor);
        let file =
            File::create(path).with_context(|| format!("create descriptor file {:?}", path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &raw)
            .with_context(|| format!("serialize descriptor to {:?}", path))?;
        writer
            .flush()
            .with_context(|| format!("flush descriptor file {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eigen::EigenDecomposition;
    use crate::signature::{DescriptorConfig, HeatKernelSignature};
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, DVector};

    fn descriptor() -> HksDescriptor {
        let spectrum = EigenDecomposition::from_parts(
            DVector::from_vec(vec![0.0, 2.0]),
            DMatrix::from_row_slice(3, 2, &[0.6, 0.1, 0.5, 0.4, 0.6, -0.5]),
            3,
        )
        .expect("spectrum");
        HeatKernelSignature::new(spectrum)
            .compute(&DescriptorConfig::new(4, 0.0, 0.0))
            .expect("descriptor")
    }

    #[test]
    fn raw_descriptor_is_vertex_major() {
        let descriptor = descriptor();
        let raw = DescriptorWriter::to_raw(&descriptor);
        assert_eq!(raw.times.len(), 4);
        assert_eq!(raw.signatures.len(), 3);
        for (v, signature) in raw.signatures.iter().enumerate() {
            assert_eq!(signature.len(), 4);
            assert_eq!(signature[1], descriptor.values()[(1, v)]);
        }
    }

    #[test]
    fn written_file_parses_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("toy.hks.json");
        let descriptor = descriptor();
        DescriptorWriter::write_to_path(&descriptor, &path).expect("write");
        let text = std::fs::read_to_string(&path).expect("read");
        let raw: RawDescriptor = serde_json::from_str(&text).expect("parse");
        let expected = DescriptorWriter::to_raw(&descriptor);
        assert_eq!(raw.signatures.len(), expected.signatures.len());
        for (parsed, original) in raw.signatures.iter().zip(&expected.signatures) {
            for (a, b) in parsed.iter().zip(original) {
                assert_relative_eq!(*a, *b, max_relative = 1e-14);
            }
        }
    }
}
